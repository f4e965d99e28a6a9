//! Binary formats: terrain regions, object regions, resource bundles.
//!
//! # Invariants
//! - Decoding never panics on malformed input; every failure is a
//!   [`FormatError`], and the infallible `decode` constructors turn it into an
//!   uninitialized value.
//! - Unknown scalar fields are kept verbatim so decoded files re-encode
//!   byte for byte.
//!
//! All formats are little-endian and start with a 12-byte [`FormatTag`].

pub mod bundle;
mod cursor;
mod error;
pub mod objects;
mod tag;
pub mod terrain;

pub use bundle::ResourceBundle;
pub use cursor::{ByteReader, ByteWriter};
pub use error::FormatError;
pub use objects::{ObjectRegion, PlacedObject, encode_object_blocks};
pub use tag::{BUNDLE_FAMILY, FormatTag, OBJECT_FAMILY, TAG_LEN, TERRAIN_FAMILY};
pub use terrain::{TerrainBlock, TerrainCell, TerrainRegion, TileExtra};

pub fn crate_info() -> &'static str {
    "regionview-formats v0.1.0"
}
