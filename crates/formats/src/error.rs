/// Errors raised while decoding one binary file.
///
/// Decoders convert these into an uninitialized result at the file boundary;
/// they never escape a catalog scan or a window update.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("malformed header: expected tag family {expected:?}, found {found:?}")]
    MalformedHeader {
        expected: &'static str,
        found: String,
    },
    #[error("unexpected end of data at offset {offset}: wanted {wanted} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        available: usize,
    },
    #[error("section offset {offset} lies outside the {len}-byte buffer")]
    UnresolvedSectionOffset { offset: usize, len: usize },
    #[error("unknown variant tag {tag:#010x} at offset {offset}")]
    UnknownVariantTag { tag: u32, offset: usize },
}
