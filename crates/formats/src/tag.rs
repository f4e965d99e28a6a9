use serde::Serialize;

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::FormatError;

/// Length of the ASCII tag at the start of every file.
pub const TAG_LEN: usize = 12;

/// File families: the first eight tag bytes identify the family, the last
/// four the revision.
pub const TERRAIN_FAMILY: &str = "JMXVMAPM";
pub const OBJECT_FAMILY: &str = "JMXVMAPO";
pub const BUNDLE_FAMILY: &str = "JMXVRES ";

/// The 12-byte format tag, kept verbatim so files re-encode byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatTag([u8; TAG_LEN]);

impl FormatTag {
    pub const TERRAIN: FormatTag = FormatTag(*b"JMXVMAPM1000");
    pub const OBJECTS: FormatTag = FormatTag(*b"JMXVMAPO1001");
    pub const BUNDLE: FormatTag = FormatTag(*b"JMXVRES 0109");

    pub fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Read a tag and require it to belong to `family`.
    pub fn read(reader: &mut ByteReader<'_>, family: &'static str) -> Result<Self, FormatError> {
        let raw: [u8; TAG_LEN] = reader.read_array()?;
        let tag = Self(raw);
        if !raw.starts_with(family.as_bytes()) {
            return Err(FormatError::MalformedHeader {
                expected: family,
                found: tag.to_string(),
            });
        }
        Ok(tag)
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.0);
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// The four revision characters, e.g. `"1000"`.
    pub fn version(&self) -> String {
        String::from_utf8_lossy(&self.0[8..]).into_owned()
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for FormatTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_family() {
        let mut r = ByteReader::new(b"JMXVMAPM1000rest");
        let tag = FormatTag::read(&mut r, TERRAIN_FAMILY).unwrap();
        assert_eq!(tag, FormatTag::TERRAIN);
        assert_eq!(tag.version(), "1000");
        assert_eq!(r.position(), TAG_LEN);
    }

    #[test]
    fn rejects_other_family() {
        let mut r = ByteReader::new(b"JMXVMAPO1001");
        let err = FormatTag::read(&mut r, TERRAIN_FAMILY).unwrap_err();
        assert!(matches!(err, FormatError::MalformedHeader { expected, .. } if expected == TERRAIN_FAMILY));
    }

    #[test]
    fn short_tag_is_eof() {
        let mut r = ByteReader::new(b"JMXV");
        assert!(matches!(
            FormatTag::read(&mut r, BUNDLE_FAMILY),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
