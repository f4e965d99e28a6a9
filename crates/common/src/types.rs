use glam::Vec3;
use serde::{Deserialize, Serialize};

/// World units covered by one region along each horizontal axis.
pub const REGION_SIZE: f32 = 1920.0;
/// Blocks along each side of a region.
pub const BLOCKS_PER_SIDE: u8 = 6;
/// Blocks in a region.
pub const BLOCKS_PER_REGION: usize = 36;
/// Height samples along each side of a block.
pub const CELLS_PER_SIDE: usize = 17;
/// Height samples in a block.
pub const CELLS_PER_BLOCK: usize = CELLS_PER_SIDE * CELLS_PER_SIDE;
/// Quads along each side of a block (one fewer than samples).
pub const QUADS_PER_SIDE: usize = CELLS_PER_SIDE - 1;
/// Distance between neighbouring height samples.
pub const CELL_SPACING: f32 = 20.0;
/// World units covered by one block.
pub const BLOCK_SPAN: f32 = QUADS_PER_SIDE as f32 * CELL_SPACING;

/// Integer tile address of a region in the world grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RegionCoord {
    pub x: i32,
    pub z: i32,
}

impl RegionCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing a world position, for regions `region_size` units wide.
    pub fn from_world(pos: Vec3, region_size: f32) -> Self {
        Self {
            x: (pos.x / region_size).floor() as i32,
            z: (pos.z / region_size).floor() as i32,
        }
    }

    /// World-space corner of the region (y is always zero).
    pub fn world_origin(self, region_size: f32) -> Vec3 {
        Vec3::new(
            self.x as f32 * region_size,
            0.0,
            self.z as f32 * region_size,
        )
    }

    /// Chebyshev (chessboard) distance between two regions.
    pub fn chebyshev(self, other: RegionCoord) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        dx.max(dz)
    }
}

impl std::fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Address of one of the 36 blocks inside a region.
///
/// Ordered by [`index`](Self::index), so sorted collections iterate in
/// on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockCoord {
    pub x: u8,
    pub z: u8,
}

impl BlockCoord {
    pub fn new(x: u8, z: u8) -> Self {
        debug_assert!(x < BLOCKS_PER_SIDE && z < BLOCKS_PER_SIDE);
        Self { x, z }
    }

    /// Row-major index (z outer, x inner), matching on-disk block order.
    pub fn index(self) -> usize {
        self.z as usize * BLOCKS_PER_SIDE as usize + self.x as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= BLOCKS_PER_REGION {
            return None;
        }
        let side = BLOCKS_PER_SIDE as usize;
        Some(Self {
            x: (index % side) as u8,
            z: (index / side) as u8,
        })
    }

    /// All block coordinates in on-disk order.
    pub fn all() -> impl DoubleEndedIterator<Item = BlockCoord> {
        (0..BLOCKS_PER_REGION).filter_map(BlockCoord::from_index)
    }

    /// Offset of the block's first sample relative to the region corner.
    pub fn local_origin(self) -> Vec3 {
        Vec3::new(self.x as f32 * BLOCK_SPAN, 0.0, self.z as f32 * BLOCK_SPAN)
    }
}

impl Ord for BlockCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.z, self.x).cmp(&(other.z, other.x))
    }
}

impl PartialOrd for BlockCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_world_floors_negative() {
        let c = RegionCoord::from_world(Vec3::new(10.0, 500.0, -5.0), REGION_SIZE);
        assert_eq!(c, RegionCoord::new(0, -1));

        let c = RegionCoord::from_world(Vec3::new(3840.0, 0.0, 1919.9), REGION_SIZE);
        assert_eq!(c, RegionCoord::new(2, 0));
    }

    #[test]
    fn world_origin_scales_by_region_size() {
        let origin = RegionCoord::new(2, -1).world_origin(REGION_SIZE);
        assert_eq!(origin, Vec3::new(3840.0, 0.0, -1920.0));
    }

    #[test]
    fn chebyshev_distance() {
        let a = RegionCoord::new(0, 0);
        assert_eq!(a.chebyshev(RegionCoord::new(3, -1)), 3);
        assert_eq!(a.chebyshev(RegionCoord::new(-2, 2)), 2);
        assert_eq!(a.chebyshev(a), 0);
    }

    #[test]
    fn block_span_covers_region() {
        assert_eq!(BLOCK_SPAN * BLOCKS_PER_SIDE as f32, REGION_SIZE);
        assert_eq!(CELLS_PER_BLOCK, 289);
    }

    #[test]
    fn block_index_round_trips_in_disk_order() {
        let blocks: Vec<_> = BlockCoord::all().collect();
        assert_eq!(blocks.len(), BLOCKS_PER_REGION);
        assert_eq!(blocks[0], BlockCoord::new(0, 0));
        assert_eq!(blocks[1], BlockCoord::new(1, 0));
        assert_eq!(blocks[6], BlockCoord::new(0, 1));
        for (i, b) in blocks.iter().enumerate() {
            assert_eq!(b.index(), i);
        }
        assert!(BlockCoord::from_index(36).is_none());
    }

    #[test]
    fn block_order_is_row_major() {
        let mut shuffled: Vec<_> = BlockCoord::all().rev().collect();
        shuffled.sort();
        assert!(shuffled.iter().enumerate().all(|(i, b)| b.index() == i));
        assert!(BlockCoord::new(5, 0) < BlockCoord::new(0, 1));
    }
}
