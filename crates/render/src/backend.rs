use std::collections::BTreeMap;

use glam::Vec3;
use regionview_common::RegionCoord;
use regionview_mesh::TerrainMesh;

/// Renderer-side storage for region meshes. All backends implement this
/// trait.
///
/// `release` takes the handle by value, so a handle can only be released
/// once. Handles are never released on a read path.
pub trait MeshBackend {
    /// Opaque reference to an uploaded mesh.
    type Handle;

    /// Copy a mesh into renderer storage.
    fn upload(&mut self, mesh: &TerrainMesh) -> Self::Handle;

    /// Free the storage behind a handle.
    fn release(&mut self, handle: Self::Handle);
}

/// Handle issued by [`HeadlessBackend`]. Deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(u64);

impl MeshHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// What the headless backend keeps for each live upload.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMesh {
    pub coord: RegionCoord,
    pub origin: Vec3,
    pub vertex_count: usize,
    pub bytes: usize,
}

/// Backend that keeps no GPU state, only bookkeeping.
///
/// Used by the CLI, tests and benchmarks. Counts uploads and releases and
/// tracks which handles are still live.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    live: BTreeMap<u64, LiveMesh>,
    uploads: u64,
    releases: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live(&self) -> impl Iterator<Item = &LiveMesh> {
        self.live.values()
    }

    /// Bytes held by live uploads.
    pub fn resident_bytes(&self) -> usize {
        self.live.values().map(|m| m.bytes).sum()
    }

    /// Human-readable summary of backend state.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "=== Headless backend (uploads={}, releases={}) ===\nLive meshes: {} ({} bytes)\n",
            self.uploads,
            self.releases,
            self.live.len(),
            self.resident_bytes()
        );
        for (id, mesh) in &self.live {
            out.push_str(&format!(
                "  [{id}] region {} origin=({:.0}, {:.0}, {:.0}) vertices={}\n",
                mesh.coord, mesh.origin.x, mesh.origin.y, mesh.origin.z, mesh.vertex_count
            ));
        }
        out
    }
}

impl MeshBackend for HeadlessBackend {
    type Handle = MeshHandle;

    fn upload(&mut self, mesh: &TerrainMesh) -> MeshHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.uploads += 1;
        self.live.insert(
            id,
            LiveMesh {
                coord: mesh.coord,
                origin: mesh.origin,
                vertex_count: mesh.vertex_count(),
                bytes: mesh.as_bytes().len(),
            },
        );
        tracing::trace!(id, coord = %mesh.coord, "mesh uploaded");
        MeshHandle(id)
    }

    fn release(&mut self, handle: MeshHandle) {
        self.releases += 1;
        if self.live.remove(&handle.0).is_none() {
            tracing::warn!(id = handle.0, "released a handle this backend does not own");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionview_mesh::TerrainVertex;

    fn mesh(x: i32, z: i32, vertices: usize) -> TerrainMesh {
        let coord = RegionCoord::new(x, z);
        TerrainMesh {
            coord,
            origin: coord.world_origin(1920.0),
            vertices: vec![
                TerrainVertex {
                    position: [0.0; 3],
                    normal: [0.0, 1.0, 0.0],
                    uv: [0.0; 2],
                    layer: 0.0,
                };
                vertices
            ],
        }
    }

    #[test]
    fn upload_then_release() {
        let mut backend = HeadlessBackend::new();
        let a = backend.upload(&mesh(0, 0, 6));
        let b = backend.upload(&mesh(1, 0, 12));
        assert_ne!(a, b);
        assert_eq!(backend.live_count(), 2);
        assert_eq!(backend.resident_bytes(), 18 * TerrainVertex::STRIDE);

        backend.release(a);
        assert_eq!(backend.live_count(), 1);
        assert_eq!(backend.uploads(), 2);
        assert_eq!(backend.releases(), 1);
        assert_eq!(backend.live().next().unwrap().coord, RegionCoord::new(1, 0));
    }

    #[test]
    fn describe_lists_live_meshes() {
        let mut backend = HeadlessBackend::new();
        let _h = backend.upload(&mesh(2, -1, 6));
        let text = backend.describe();
        assert!(text.contains("uploads=1"));
        assert!(text.contains("region (2, -1)"));
        assert!(text.contains("origin=(3840, 0, -1920)"));
    }

    #[test]
    fn foreign_handle_is_counted_but_ignored() {
        let mut backend = HeadlessBackend::new();
        backend.release(MeshHandle(99));
        assert_eq!(backend.releases(), 1);
        assert_eq!(backend.live_count(), 0);
    }
}
