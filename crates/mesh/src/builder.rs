use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use regionview_common::{CELL_SPACING, QUADS_PER_SIDE};
use regionview_formats::{TerrainBlock, TerrainRegion};

use crate::vertex::{TerrainMesh, TerrainVertex};

/// Maps a terrain texture id to a texture-array layer.
pub trait LayerLookup {
    fn layer(&self, texture_id: u16) -> Option<u32>;
}

impl LayerLookup for HashMap<u16, u32> {
    fn layer(&self, texture_id: u16) -> Option<u32> {
        self.get(&texture_id).copied()
    }
}

impl LayerLookup for BTreeMap<u16, u32> {
    fn layer(&self, texture_id: u16) -> Option<u32> {
        self.get(&texture_id).copied()
    }
}

/// Build the vertex buffer for a region.
///
/// Each block contributes 16×16 quads of two triangles. A quad is textured
/// with the layer of its first corner; ids missing from `lookup` fall back to
/// `default_layer`. An uninitialized region yields an empty mesh.
pub fn build_region_mesh(
    region: &TerrainRegion,
    lookup: &impl LayerLookup,
    default_layer: u32,
    region_size: f32,
) -> TerrainMesh {
    let coord = region.coord();
    let mut vertices = Vec::with_capacity(region.block_count() * QUADS_PER_SIDE * QUADS_PER_SIDE * 6);

    for (block_coord, block) in region.blocks() {
        push_block(
            &mut vertices,
            block,
            block_coord.local_origin(),
            lookup,
            default_layer,
        );
    }

    tracing::debug!(%coord, vertices = vertices.len(), "built region mesh");
    TerrainMesh {
        coord,
        origin: coord.world_origin(region_size),
        vertices,
    }
}

fn push_block(
    out: &mut Vec<TerrainVertex>,
    block: &TerrainBlock,
    offset: Vec3,
    lookup: &impl LayerLookup,
    default_layer: u32,
) {
    let corner = |x: usize, z: usize| {
        block.cell(x, z).map(|c| {
            let pos = offset + Vec3::new(x as f32 * CELL_SPACING, c.height, z as f32 * CELL_SPACING);
            (pos, c.texture_id())
        })
    };

    for z in 0..QUADS_PER_SIDE {
        for x in 0..QUADS_PER_SIDE {
            let (Some((p0, texture)), Some((p1, _)), Some((p2, _)), Some((p3, _))) = (
                corner(x, z),
                corner(x + 1, z),
                corner(x, z + 1),
                corner(x + 1, z + 1),
            ) else {
                continue;
            };

            let layer = lookup.layer(texture).unwrap_or(default_layer) as f32;
            // Wound so that a flat quad faces +Y.
            let tris = [
                [(p0, [0.0, 0.0]), (p2, [0.0, 1.0]), (p1, [1.0, 0.0])],
                [(p2, [0.0, 1.0]), (p3, [1.0, 1.0]), (p1, [1.0, 0.0])],
            ];
            for tri in tris {
                let normal = face_normal(tri[0].0, tri[1].0, tri[2].0);
                for (pos, uv) in tri {
                    out.push(TerrainVertex {
                        position: pos.to_array(),
                        normal: normal.to_array(),
                        uv,
                        layer,
                    });
                }
            }
        }
    }
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionview_common::{BLOCKS_PER_REGION, BlockCoord, REGION_SIZE, RegionCoord};
    use regionview_formats::TerrainCell;

    fn flat_region(coord: RegionCoord, texture_id: u16) -> TerrainRegion {
        TerrainRegion::from_fn(coord, |_| {
            TerrainBlock::from_fn(*b"flat\0\0", TerrainCell::pack_texture(texture_id, 0), |_, _| 5.0)
        })
    }

    #[test]
    fn full_region_vertex_count() {
        let region = flat_region(RegionCoord::new(0, 0), 1);
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        assert_eq!(mesh.vertex_count(), BLOCKS_PER_REGION * 16 * 16 * 6);
        assert_eq!(mesh.as_floats().len(), mesh.vertex_count() * TerrainVertex::FLOATS);
    }

    #[test]
    fn flat_terrain_faces_up() {
        let region = flat_region(RegionCoord::new(0, 0), 1);
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert!(mesh.vertices.iter().all(|v| v.position[1] == 5.0));
    }

    #[test]
    fn positions_span_the_region() {
        let region = flat_region(RegionCoord::new(0, 0), 1);
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        let max_x = mesh.vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        let max_z = mesh.vertices.iter().map(|v| v.position[2]).fold(f32::MIN, f32::max);
        assert_eq!(max_x, REGION_SIZE);
        assert_eq!(max_z, REGION_SIZE);
    }

    #[test]
    fn origin_is_coord_times_region_size() {
        let region = flat_region(RegionCoord::new(2, -1), 1);
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        assert_eq!(mesh.origin, Vec3::new(3840.0, 0.0, -1920.0));
    }

    #[test]
    fn sloped_quad_normal_tilts_against_slope() {
        // Height rises along +X, so normals lean towards -X.
        let region = TerrainRegion::from_fn(RegionCoord::new(0, 0), |_| {
            TerrainBlock::from_fn(*b"slope\0", 0, |x, _| x as f32 * 20.0)
        });
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        let n = Vec3::from_array(mesh.vertices[0].normal);
        assert!((n - Vec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn layers_come_from_lookup_with_default() {
        let mut lookup = BTreeMap::new();
        lookup.insert(42u16, 3u32);

        let mapped = build_region_mesh(&flat_region(RegionCoord::new(0, 0), 42), &lookup, 9, REGION_SIZE);
        assert!(mapped.vertices.iter().all(|v| v.layer == 3.0));

        let unmapped = build_region_mesh(&flat_region(RegionCoord::new(0, 0), 7), &lookup, 9, REGION_SIZE);
        assert!(unmapped.vertices.iter().all(|v| v.layer == 9.0));
    }

    #[test]
    fn uv_corners_are_unit_square() {
        let region = flat_region(RegionCoord::new(0, 0), 1);
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        let uvs: Vec<[f32; 2]> = mesh.vertices[..6].iter().map(|v| v.uv).collect();
        assert_eq!(
            uvs,
            vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
        );
    }

    #[test]
    fn uninitialized_region_is_empty() {
        let region = TerrainRegion::uninitialized(RegionCoord::new(1, 1));
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        assert!(mesh.is_empty());
        assert_eq!(mesh.origin, Vec3::new(1920.0, 0.0, 1920.0));
    }

    #[test]
    fn block_offset_applies() {
        let region = flat_region(RegionCoord::new(0, 0), 1);
        let mesh = build_region_mesh(&region, &HashMap::new(), 0, REGION_SIZE);
        let (second, _) = region.blocks().nth(1).unwrap();
        let origin = second.local_origin();
        let first = &mesh.vertices[16 * 16 * 6];
        assert_eq!((first.position[0], first.position[2]), (origin.x, origin.z));
        assert_eq!(second, BlockCoord::new(1, 0));
    }
}
