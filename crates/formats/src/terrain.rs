//! Terrain region files (`<X>.m`).
//!
//! Layout, all little-endian:
//! ```text
//! 12-byte tag
//! 36 blocks, z outer / x inner, each:
//!   6-byte ASCII name
//!   289 cells, z outer / x inner: f32 height, u16 texture word, u8 brightness
//!   u8 water type, u8 wave type, f32 sea level
//!   256 x (u8 extra min, u8 extra max)
//!   f32 max height, f32 min height
//!   20 reserved bytes
//! ```
//! Blocks carry no length prefix; position is implied by iteration order.

use std::collections::BTreeMap;

use regionview_common::{BLOCKS_PER_REGION, BlockCoord, CELLS_PER_BLOCK, CELLS_PER_SIDE, RegionCoord};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::FormatError;
use crate::tag::{FormatTag, TAG_LEN, TERRAIN_FAMILY};

/// Tile extra descriptors per block.
pub const TILES_PER_BLOCK: usize = 256;

const CELL_RECORD_SIZE: usize = 4 + 2 + 1;

/// Encoded size of one block.
pub const BLOCK_RECORD_SIZE: usize =
    6 + CELLS_PER_BLOCK * CELL_RECORD_SIZE + 1 + 1 + 4 + TILES_PER_BLOCK * 2 + 4 + 4 + 20;

/// Encoded size of a complete terrain region file.
pub const TERRAIN_FILE_SIZE: usize = TAG_LEN + BLOCKS_PER_REGION * BLOCK_RECORD_SIZE;

const TEXTURE_ID_MASK: u16 = 0x03ff;
const SPLASH_SHIFT: u16 = 10;

/// One height sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerrainCell {
    pub height: f32,
    /// Low 10 bits: texture id. High 6 bits: splash flags.
    pub texture: u16,
    pub brightness: u8,
}

impl TerrainCell {
    pub fn texture_id(&self) -> u16 {
        self.texture & TEXTURE_ID_MASK
    }

    pub fn splash(&self) -> u8 {
        (self.texture >> SPLASH_SHIFT) as u8
    }

    pub fn pack_texture(texture_id: u16, splash: u8) -> u16 {
        (texture_id & TEXTURE_ID_MASK) | ((splash as u16 & 0x3f) << SPLASH_SHIFT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileExtra {
    pub extra_min: u8,
    pub extra_max: u8,
}

/// A 17x17 sample grid plus water and bounds data.
///
/// The cell array is fixed-size, so a block either has all 289 cells or does
/// not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainBlock {
    pub name: [u8; 6],
    cells: Box<[TerrainCell; CELLS_PER_BLOCK]>,
    /// 0x00 water, 0x01 ice, 0xff solid.
    pub water_type: u8,
    pub wave_type: u8,
    pub sea_level: f32,
    pub tiles: Box<[TileExtra; TILES_PER_BLOCK]>,
    pub height_max: f32,
    pub height_min: f32,
    pub reserved: [u8; 20],
}

impl TerrainBlock {
    /// Build a block from a height function and a single texture word.
    pub fn from_fn(name: [u8; 6], texture: u16, mut height: impl FnMut(usize, usize) -> f32) -> Self {
        let mut cells = Box::new([TerrainCell::default(); CELLS_PER_BLOCK]);
        let mut height_max = f32::MIN;
        let mut height_min = f32::MAX;
        for z in 0..CELLS_PER_SIDE {
            for x in 0..CELLS_PER_SIDE {
                let h = height(x, z);
                height_max = height_max.max(h);
                height_min = height_min.min(h);
                cells[z * CELLS_PER_SIDE + x] = TerrainCell {
                    height: h,
                    texture,
                    brightness: 0xff,
                };
            }
        }
        Self {
            name,
            cells,
            water_type: 0xff,
            wave_type: 0,
            sea_level: 0.0,
            tiles: Box::new([TileExtra::default(); TILES_PER_BLOCK]),
            height_max,
            height_min,
            reserved: [0; 20],
        }
    }

    /// Block name with trailing NULs and spaces trimmed.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    pub fn cells(&self) -> &[TerrainCell; CELLS_PER_BLOCK] {
        &self.cells
    }

    /// Sample at column `x`, row `z`; `None` outside `[0, 17)`.
    pub fn cell(&self, x: usize, z: usize) -> Option<&TerrainCell> {
        if x >= CELLS_PER_SIDE || z >= CELLS_PER_SIDE {
            return None;
        }
        self.cells.get(z * CELLS_PER_SIDE + x)
    }

    fn read(r: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let name = r.read_array()?;

        let mut cells = Box::new([TerrainCell::default(); CELLS_PER_BLOCK]);
        for cell in cells.iter_mut() {
            *cell = TerrainCell {
                height: r.read_f32()?,
                texture: r.read_u16()?,
                brightness: r.read_u8()?,
            };
        }

        let water_type = r.read_u8()?;
        let wave_type = r.read_u8()?;
        let sea_level = r.read_f32()?;

        let mut tiles = Box::new([TileExtra::default(); TILES_PER_BLOCK]);
        for tile in tiles.iter_mut() {
            *tile = TileExtra {
                extra_min: r.read_u8()?,
                extra_max: r.read_u8()?,
            };
        }

        Ok(Self {
            name,
            cells,
            water_type,
            wave_type,
            sea_level,
            tiles,
            height_max: r.read_f32()?,
            height_min: r.read_f32()?,
            reserved: r.read_array()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(&self.name);
        for cell in self.cells.iter() {
            w.write_f32(cell.height)
                .write_u16(cell.texture)
                .write_u8(cell.brightness);
        }
        w.write_u8(self.water_type)
            .write_u8(self.wave_type)
            .write_f32(self.sea_level);
        for tile in self.tiles.iter() {
            w.write_u8(tile.extra_min).write_u8(tile.extra_max);
        }
        w.write_f32(self.height_max)
            .write_f32(self.height_min)
            .write_bytes(&self.reserved);
    }
}

/// A decoded terrain region.
///
/// An uninitialized region has no blocks; callers treat it as absent.
#[derive(Debug, Clone)]
pub struct TerrainRegion {
    coord: RegionCoord,
    tag: FormatTag,
    blocks: BTreeMap<BlockCoord, TerrainBlock>,
    initialized: bool,
}

impl TerrainRegion {
    /// Decode a region, propagating the first error.
    ///
    /// The coordinate is not stored in the file and comes from the caller.
    pub fn try_decode(bytes: &[u8], coord: RegionCoord) -> Result<Self, FormatError> {
        let mut r = ByteReader::new(bytes);
        let tag = FormatTag::read(&mut r, TERRAIN_FAMILY)?;

        let mut blocks = BTreeMap::new();
        for block in BlockCoord::all() {
            blocks.insert(block, TerrainBlock::read(&mut r)?);
        }

        Ok(Self {
            coord,
            tag,
            blocks,
            initialized: true,
        })
    }

    /// Decode a region, converting any failure into an uninitialized region.
    pub fn decode(bytes: &[u8], coord: RegionCoord) -> Self {
        match Self::try_decode(bytes, coord) {
            Ok(region) => region,
            Err(e) => {
                tracing::warn!(%coord, error = %e, "terrain region failed to decode");
                Self::uninitialized(coord)
            }
        }
    }

    pub fn uninitialized(coord: RegionCoord) -> Self {
        Self {
            coord,
            tag: FormatTag::TERRAIN,
            blocks: BTreeMap::new(),
            initialized: false,
        }
    }

    /// Assemble a complete region from one block per coordinate.
    pub fn from_fn(coord: RegionCoord, mut block: impl FnMut(BlockCoord) -> TerrainBlock) -> Self {
        Self {
            coord,
            tag: FormatTag::TERRAIN,
            blocks: BlockCoord::all().map(|b| (b, block(b))).collect(),
            initialized: true,
        }
    }

    pub fn coord(&self) -> RegionCoord {
        self.coord
    }

    pub fn tag(&self) -> FormatTag {
        self.tag
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn block(&self, block: BlockCoord) -> Option<&TerrainBlock> {
        self.blocks.get(&block)
    }

    /// Present blocks in on-disk order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockCoord, &TerrainBlock)> {
        self.blocks.iter().map(|(k, v)| (*k, v))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Lowest and highest block bounds across the region.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.blocks.values().fold(None, |acc, b| match acc {
            None => Some((b.height_min, b.height_max)),
            Some((lo, hi)) => Some((lo.min(b.height_min), hi.max(b.height_max))),
        })
    }

    /// Re-encode in file order. `None` unless all 36 blocks are present.
    pub fn encode(&self) -> Option<Vec<u8>> {
        if !self.initialized || self.blocks.len() != BLOCKS_PER_REGION {
            return None;
        }
        let mut w = ByteWriter::with_capacity(TERRAIN_FILE_SIZE);
        self.tag.write(&mut w);
        for block in BlockCoord::all() {
            self.blocks.get(&block)?.write(&mut w);
        }
        Some(w.into_inner())
    }
}
