//! Rendering adapter: renderer-agnostic mesh upload and release.
//!
//! # Invariants
//! - The renderer never reads or mutates decoded region data; it only
//!   receives finished vertex buffers.
//! - Every uploaded handle is released exactly once.
//!
//! A headless backend stands in for a GPU implementation. The trait is
//! stable; a GPU backend plugs in without changing the streaming cache.

mod backend;

pub use backend::{HeadlessBackend, LiveMesh, MeshBackend, MeshHandle};

pub fn crate_info() -> &'static str {
    "regionview-render v0.1.0"
}
