//! Developer tooling: region inspector and file summaries.
//!
//! # Invariants
//! - Tools never mutate the cache; every query is read-only.

mod inspector;

pub use inspector::{BundleSummary, CacheSummary, RegionInfo, RegionInspector, TerrainSummary};

pub fn crate_info() -> &'static str {
    "regionview-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
