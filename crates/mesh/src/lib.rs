//! Mesh builder: decoded terrain regions to flat vertex buffers.
//!
//! # Invariants
//! - Output never depends on a rendering API; the vertex layout is plain
//!   `#[repr(C)]` floats.
//! - Vertex positions are region-local; the mesh carries its world origin.

mod builder;
mod vertex;

pub use builder::{LayerLookup, build_region_mesh};
pub use vertex::{TerrainMesh, TerrainVertex};

pub fn crate_info() -> &'static str {
    "regionview-mesh v0.1.0"
}
