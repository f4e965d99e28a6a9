use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use regionview_common::RegionCoord;

/// One terrain vertex. The layout is the vertex buffer contract:
/// 3 position, 3 normal, 2 uv, 1 texture-array layer, all `f32`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub layer: f32,
}

impl TerrainVertex {
    /// Floats per vertex.
    pub const FLOATS: usize = 9;
    /// Bytes per vertex.
    pub const STRIDE: usize = Self::FLOATS * std::mem::size_of::<f32>();
}

/// Vertex buffer for one region. Positions are relative to `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub coord: RegionCoord,
    pub origin: Vec3,
    pub vertices: Vec<TerrainVertex>,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Interleaved float view, `FLOATS` per vertex.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
