use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::{Duration, Instant};

use glam::Vec3;
use regionview_assets::LayerMap;
use regionview_common::RegionCoord;
use regionview_formats::{ObjectRegion, TerrainRegion};
use regionview_mesh::build_region_mesh;
use regionview_render::MeshBackend;

use crate::budget::{FrameTimer, StreamStats, UpdateThrottle};
use crate::catalog::RegionCatalog;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::window::StreamingWindow;

const LOAD_TIMER_CAPACITY: usize = 64;

/// A region whose mesh is resident in the backend.
#[derive(Debug)]
pub struct LoadedRegionMesh<H> {
    pub handle: H,
    pub vertex_count: usize,
    pub origin: Vec3,
    pub load_time: Duration,
}

/// What one window update changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub loaded: Vec<RegionCoord>,
    pub evicted: Vec<RegionCoord>,
    pub failed: Vec<RegionCoord>,
    pub deferred: usize,
}

impl UpdateOutcome {
    pub fn is_noop(&self) -> bool {
        self.loaded.is_empty() && self.evicted.is_empty() && self.failed.is_empty()
    }
}

/// Keeps the regions around a moving viewpoint resident as meshes.
///
/// Each coordinate moves `NotCataloged -> Cataloged -> Loaded -> Cataloged`.
/// The cache owns every backend handle it creates and releases each exactly
/// once: on eviction, on [`cleanup`](Self::cleanup), on reindex or on drop.
pub struct StreamingCache<B: MeshBackend> {
    config: StreamConfig,
    backend: B,
    catalog: RegionCatalog,
    layers: LayerMap,
    loaded: BTreeMap<RegionCoord, LoadedRegionMesh<B::Handle>>,
    objects: BTreeMap<RegionCoord, ObjectRegion>,
    /// Terrain files that failed to decode since the last reindex.
    failed: BTreeSet<RegionCoord>,
    window: Option<StreamingWindow>,
    throttle: UpdateThrottle,
    stats: StreamStats,
    timer: FrameTimer,
}

impl<B: MeshBackend> StreamingCache<B> {
    pub fn new(backend: B, config: StreamConfig) -> Self {
        Self {
            throttle: UpdateThrottle::new(config.update_interval),
            config,
            backend,
            catalog: RegionCatalog::default(),
            layers: LayerMap::default(),
            loaded: BTreeMap::new(),
            objects: BTreeMap::new(),
            failed: BTreeSet::new(),
            window: None,
            stats: StreamStats::default(),
            timer: FrameTimer::new(LOAD_TIMER_CAPACITY),
        }
    }

    /// Replace the texture layer map used for regions loaded from now on.
    pub fn set_layers(&mut self, layers: LayerMap) {
        self.layers = layers;
    }

    /// Drop everything and rescan `root`. On error the cache is left empty.
    pub fn reindex(&mut self, root: impl AsRef<Path>) -> Result<usize, StreamError> {
        let _span = tracing::info_span!("reindex").entered();
        self.cleanup();
        self.catalog = RegionCatalog::default();
        self.failed.clear();
        self.catalog = RegionCatalog::scan(root)?;
        self.throttle.force();
        Ok(self.catalog.terrain_count())
    }

    /// Per-frame driver: runs a window update with the configured range once
    /// every `update_interval` seconds of accumulated `dt`.
    pub fn tick(&mut self, dt: f32, position: Vec3) -> Option<UpdateOutcome> {
        if !self.throttle.tick(dt) {
            return None;
        }
        Some(self.update_window(position, self.config.load_range))
    }

    /// Bring the loaded set in line with the window around `position`.
    ///
    /// Every loaded region outside the window is evicted. Desired regions
    /// that are cataloged, not loaded and not known to fail are loaded,
    /// nearest first, up to the load budget.
    pub fn update_window(&mut self, position: Vec3, load_range: u32) -> UpdateOutcome {
        let _span = tracing::info_span!("update_window").entered();
        let start = Instant::now();
        let window = StreamingWindow::around(position, load_range, self.config.region_size);
        self.window = Some(window);

        let mut outcome = UpdateOutcome::default();
        self.evict_outside(&window, &mut outcome);

        let budget = self.config.load_budget.unwrap_or(usize::MAX);
        let mut attempts = 0;
        for coord in self.desired(&window) {
            if !self.objects.contains_key(&coord) {
                self.load_objects(coord);
            }
            if !self.wants_terrain(coord) {
                continue;
            }
            if attempts == budget {
                outcome.deferred += 1;
                continue;
            }
            attempts += 1;
            if self.load_terrain(coord) {
                outcome.loaded.push(coord);
            } else {
                outcome.failed.push(coord);
            }
        }

        self.stats = StreamStats {
            loaded_this_update: outcome.loaded.len(),
            evicted_this_update: outcome.evicted.len(),
            failed_this_update: outcome.failed.len(),
            deferred: outcome.deferred,
            total_loaded: self.loaded.len(),
            total_vertices: self.loaded.values().map(|m| m.vertex_count).sum(),
            update_time: start.elapsed(),
        };
        tracing::trace!(
            center = %window.center,
            loaded = outcome.loaded.len(),
            evicted = outcome.evicted.len(),
            deferred = outcome.deferred,
            total = self.loaded.len(),
            "window update complete"
        );
        outcome
    }

    /// Release every loaded resource. The catalog is kept.
    pub fn cleanup(&mut self) {
        for (coord, mesh) in std::mem::take(&mut self.loaded) {
            tracing::debug!(%coord, "releasing region mesh");
            self.backend.release(mesh.handle);
        }
        self.objects.clear();
        self.window = None;
    }

    /// Window coordinates that could have files, nearest first. Large
    /// windows are filtered from the catalog instead of enumerated.
    fn desired(&self, window: &StreamingWindow) -> Vec<RegionCoord> {
        if window.area() > self.catalog.len() as u64 {
            window.select(self.catalog.coords())
        } else {
            window.coords_nearest_first()
        }
    }

    fn wants_terrain(&self, coord: RegionCoord) -> bool {
        !self.loaded.contains_key(&coord)
            && !self.failed.contains(&coord)
            && self.catalog.has_terrain(coord)
    }

    fn evict_outside(&mut self, window: &StreamingWindow, outcome: &mut UpdateOutcome) {
        let stale: Vec<RegionCoord> = self
            .loaded
            .keys()
            .copied()
            .filter(|c| !window.contains(*c))
            .collect();
        for coord in stale {
            if let Some(mesh) = self.loaded.remove(&coord) {
                tracing::debug!(%coord, "evicting region");
                self.backend.release(mesh.handle);
                outcome.evicted.push(coord);
            }
        }
        self.objects.retain(|c, _| window.contains(*c));
    }

    /// Decode, mesh and upload one region. Returns `false` and remembers the
    /// coordinate when the file cannot be read or decoded.
    fn load_terrain(&mut self, coord: RegionCoord) -> bool {
        let Some(path) = self.catalog.terrain_path(coord) else {
            return false;
        };
        let start = Instant::now();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%coord, path = %path.display(), error = %e, "terrain file unreadable");
                self.failed.insert(coord);
                return false;
            }
        };
        let region = TerrainRegion::decode(&bytes, coord);
        if !region.is_initialized() {
            self.failed.insert(coord);
            return false;
        }

        let mesh = build_region_mesh(
            &region,
            &self.layers,
            self.config.default_layer,
            self.config.region_size,
        );
        let handle = self.backend.upload(&mesh);
        let load_time = start.elapsed();
        self.timer.record(load_time);
        tracing::debug!(%coord, vertices = mesh.vertex_count(), ?load_time, "region loaded");

        self.loaded.insert(
            coord,
            LoadedRegionMesh {
                handle,
                vertex_count: mesh.vertex_count(),
                origin: mesh.origin,
                load_time,
            },
        );
        true
    }

    /// Object files are small; they load with the window and are never
    /// budgeted. A file that fails to decode is kept as an uninitialized
    /// region so it is not retried.
    fn load_objects(&mut self, coord: RegionCoord) {
        let Some(path) = self.catalog.objects_path(coord) else {
            return;
        };
        let region = match std::fs::read(path) {
            Ok(bytes) => ObjectRegion::decode(&bytes, coord),
            Err(e) => {
                tracing::warn!(%coord, path = %path.display(), error = %e, "object file unreadable");
                ObjectRegion::uninitialized(coord)
            }
        };
        self.objects.insert(coord, region);
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn layers(&self) -> &LayerMap {
        &self.layers
    }

    pub fn window(&self) -> Option<StreamingWindow> {
        self.window
    }

    pub fn loaded(&self) -> impl Iterator<Item = (RegionCoord, &LoadedRegionMesh<B::Handle>)> {
        self.loaded.iter().map(|(&c, m)| (c, m))
    }

    pub fn loaded_coords(&self) -> BTreeSet<RegionCoord> {
        self.loaded.keys().copied().collect()
    }

    pub fn loaded_mesh(&self, coord: RegionCoord) -> Option<&LoadedRegionMesh<B::Handle>> {
        self.loaded.get(&coord)
    }

    pub fn is_loaded(&self, coord: RegionCoord) -> bool {
        self.loaded.contains_key(&coord)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn objects(&self, coord: RegionCoord) -> Option<&ObjectRegion> {
        self.objects.get(&coord)
    }

    pub fn loaded_objects(&self) -> impl Iterator<Item = &ObjectRegion> {
        self.objects.values()
    }

    pub fn failed(&self) -> &BTreeSet<RegionCoord> {
        &self.failed
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn load_timer(&self) -> &FrameTimer {
        &self.timer
    }
}

impl<B: MeshBackend> Drop for StreamingCache<B> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
