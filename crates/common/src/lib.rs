//! Shared types for regionview: region and block addressing plus the fixed
//! geometry of the tiled world.

mod types;

pub use types::{
    BLOCK_SPAN, BLOCKS_PER_REGION, BLOCKS_PER_SIDE, BlockCoord, CELL_SPACING, CELLS_PER_BLOCK,
    CELLS_PER_SIDE, QUADS_PER_SIDE, REGION_SIZE, RegionCoord,
};

pub fn crate_info() -> &'static str {
    "regionview-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
