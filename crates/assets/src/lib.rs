//! Asset indexes: terrain texture index and placed-object catalog.
//!
//! Both are plain-text `.ifo` files shipped next to the map data. The mesh
//! builder consumes textures by layer, never by path.

mod catalog;
mod texture;

use std::path::PathBuf;

pub use catalog::{OBJECT_INDEX_FILE, ObjectCatalog, ObjectEntry};
pub use texture::{LayerMap, TEXTURE_DIR, TEXTURE_INDEX_FILE, TextureEntry, TextureIndex};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index file not found: {}", .0.display())]
    MissingIndex(PathBuf),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub fn crate_info() -> &'static str {
    "regionview-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
