//! Streaming: region catalog, streaming window, region mesh cache.
//!
//! # Invariants
//! - After an unbudgeted update the loaded set is exactly the window
//!   intersected with the catalog.
//! - A second identical update loads and evicts nothing.
//! - Backend handles are released exactly once, never on a read path.
//!
//! Loading is synchronous. A large viewpoint jump is absorbed in one update
//! by default, or spread over several with a load budget; out-of-window
//! regions are always evicted immediately.

mod budget;
mod cache;
mod catalog;
mod config;
mod error;
mod window;

pub use budget::{FrameTimer, StreamStats, UpdateThrottle};
pub use cache::{LoadedRegionMesh, StreamingCache, UpdateOutcome};
pub use catalog::{CatalogEntry, OBJECTS_EXT, RegionCatalog, RegionFileKind, TERRAIN_EXT};
pub use config::StreamConfig;
pub use error::StreamError;
pub use window::StreamingWindow;

pub fn crate_info() -> &'static str {
    "regionview-stream v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("stream"));
    }
}
