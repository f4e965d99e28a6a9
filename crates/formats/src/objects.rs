//! Object placement files (`<X>.o`).
//!
//! 12-byte tag, then for each of the 36 blocks a `u16` count followed by
//! fixed 28-byte records. An object spanning several blocks is listed in each
//! of them under the same unique id.

use std::collections::BTreeMap;

use glam::Vec3;
use regionview_common::{BLOCKS_PER_REGION, RegionCoord};
use serde::Serialize;

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::FormatError;
use crate::tag::{FormatTag, OBJECT_FAMILY};

/// Encoded size of one placed-object record.
pub const OBJECT_RECORD_SIZE: usize = 28;

/// One placed object, positioned relative to the region corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedObject {
    /// Index into the object catalog (`object.ifo`).
    pub object_id: u32,
    pub position: Vec3,
    /// 0 for dynamic, -1 (0xffff) for static.
    pub static_flag: i16,
    pub yaw: f32,
    pub unique_id: i16,
    pub reserved: i16,
    pub is_big: u8,
    pub is_struct: u8,
}

impl PlacedObject {
    pub fn is_static(&self) -> bool {
        self.static_flag != 0
    }

    /// The object reaches outside its region's bounds.
    pub fn exceeds_region(&self) -> bool {
        self.is_big != 0
    }

    /// The object has an extended descriptor file.
    pub fn has_extended_info(&self) -> bool {
        self.is_struct != 0
    }

    fn read(r: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            object_id: r.read_u32()?,
            position: r.read_vec3()?,
            static_flag: r.read_i16()?,
            yaw: r.read_f32()?,
            unique_id: r.read_i16()?,
            reserved: r.read_i16()?,
            is_big: r.read_u8()?,
            is_struct: r.read_u8()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.write_u32(self.object_id)
            .write_vec3(self.position)
            .write_i16(self.static_flag)
            .write_f32(self.yaw)
            .write_i16(self.unique_id)
            .write_i16(self.reserved)
            .write_u8(self.is_big)
            .write_u8(self.is_struct);
    }
}

/// Objects of one region keyed by unique id.
#[derive(Debug, Clone)]
pub struct ObjectRegion {
    coord: RegionCoord,
    objects: BTreeMap<i16, PlacedObject>,
    /// Records read before deduplication.
    record_count: usize,
    initialized: bool,
}

impl ObjectRegion {
    pub fn try_decode(bytes: &[u8], coord: RegionCoord) -> Result<Self, FormatError> {
        let mut r = ByteReader::new(bytes);
        FormatTag::read(&mut r, OBJECT_FAMILY)?;

        let mut objects = BTreeMap::new();
        let mut record_count = 0;
        for _ in 0..BLOCKS_PER_REGION {
            let count = r.read_u16()?;
            for _ in 0..count {
                let object = PlacedObject::read(&mut r)?;
                // Later records for the same id replace earlier ones.
                objects.insert(object.unique_id, object);
                record_count += 1;
            }
        }

        Ok(Self {
            coord,
            objects,
            record_count,
            initialized: true,
        })
    }

    pub fn decode(bytes: &[u8], coord: RegionCoord) -> Self {
        match Self::try_decode(bytes, coord) {
            Ok(region) => region,
            Err(e) => {
                tracing::warn!(%coord, error = %e, "object region failed to decode");
                Self::uninitialized(coord)
            }
        }
    }

    pub fn uninitialized(coord: RegionCoord) -> Self {
        Self {
            coord,
            objects: BTreeMap::new(),
            record_count: 0,
            initialized: false,
        }
    }

    pub fn coord(&self) -> RegionCoord {
        self.coord
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn get(&self, unique_id: i16) -> Option<&PlacedObject> {
        self.objects.get(&unique_id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.values()
    }

    /// Distinct objects after deduplication.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

/// Encode per-block object lists as an object file. Missing trailing blocks
/// are written with a zero count.
pub fn encode_object_blocks(blocks: &[Vec<PlacedObject>]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    FormatTag::OBJECTS.write(&mut w);
    for i in 0..BLOCKS_PER_REGION {
        let objects = blocks.get(i).map(Vec::as_slice).unwrap_or(&[]);
        w.write_u16(objects.len() as u16);
        for object in objects {
            object.write(&mut w);
        }
    }
    w.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TAG_LEN;

    fn object(unique_id: i16, object_id: u32, x: f32) -> PlacedObject {
        PlacedObject {
            object_id,
            position: Vec3::new(x, 10.0, 250.0),
            static_flag: -1,
            yaw: 1.5,
            unique_id,
            reserved: 0,
            is_big: 0,
            is_struct: 1,
        }
    }

    #[test]
    fn record_size_matches_layout() {
        let bytes = encode_object_blocks(&[vec![object(1, 2, 3.0)]]);
        assert_eq!(bytes.len(), TAG_LEN + BLOCKS_PER_REGION * 2 + OBJECT_RECORD_SIZE);
    }

    #[test]
    fn decodes_objects_across_blocks() {
        let mut blocks = vec![Vec::new(); BLOCKS_PER_REGION];
        blocks[0].push(object(1, 100, 5.0));
        blocks[35].push(object(2, 200, 1900.0));
        let bytes = encode_object_blocks(&blocks);

        let region = ObjectRegion::try_decode(&bytes, RegionCoord::new(4, 4)).unwrap();
        assert!(region.is_initialized());
        assert_eq!(region.len(), 2);
        let obj = region.get(2).unwrap();
        assert_eq!(obj.object_id, 200);
        assert_eq!(obj.position, Vec3::new(1900.0, 10.0, 250.0));
        assert!(obj.is_static());
        assert!(obj.has_extended_info());
        assert!(!obj.exceeds_region());
    }

    #[test]
    fn duplicate_unique_id_keeps_last_record() {
        let mut blocks = vec![Vec::new(); BLOCKS_PER_REGION];
        blocks[3].push(object(7, 1, 100.0));
        blocks[4].push(object(7, 1, 400.0));
        let bytes = encode_object_blocks(&blocks);

        let region = ObjectRegion::decode(&bytes, RegionCoord::new(0, 0));
        assert_eq!(region.len(), 1);
        assert_eq!(region.record_count(), 2);
        assert_eq!(region.get(7).unwrap().position.x, 400.0);
    }

    #[test]
    fn truncated_record_is_uninitialized() {
        let bytes = encode_object_blocks(&[vec![object(1, 2, 3.0)]]);
        let region = ObjectRegion::decode(&bytes[..TAG_LEN + 2 + 10], RegionCoord::new(0, 0));
        assert!(!region.is_initialized());
        assert!(region.is_empty());
    }

    #[test]
    fn terrain_tag_is_rejected() {
        let mut bytes = encode_object_blocks(&[]);
        bytes[..TAG_LEN].copy_from_slice(FormatTag::TERRAIN.as_bytes());
        assert!(matches!(
            ObjectRegion::try_decode(&bytes, RegionCoord::new(0, 0)),
            Err(FormatError::MalformedHeader { .. })
        ));
    }
}
