use std::path::PathBuf;

/// Errors from catalog scans and configuration.
///
/// Only [`StreamError::Io`] and [`StreamError::RootNotFound`] block a
/// reindex. [`StreamError::InvalidCatalogEntry`] is logged and the entry is
/// skipped.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("region root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("invalid catalog entry {}: {reason}", .path.display())]
    InvalidCatalogEntry { path: PathBuf, reason: &'static str },
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
