use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use glam::Vec3;
use regionview_common::RegionCoord;
use regionview_formats::{ResourceBundle, TerrainRegion};
use regionview_render::MeshBackend;
use regionview_stream::StreamingCache;
use serde::Serialize;

/// Region inspector for developer tooling.
///
/// Read-only queries against the streaming cache and decoded files. Nothing
/// here loads, evicts or releases.
pub struct RegionInspector;

impl RegionInspector {
    /// Produce a summary of catalog and cache state.
    pub fn summary<B: MeshBackend>(cache: &StreamingCache<B>) -> CacheSummary {
        let catalog = cache.catalog();
        CacheSummary {
            terrain_files: catalog.terrain_count(),
            object_files: catalog.objects_count(),
            skipped_entries: catalog.skipped().len(),
            bounds: catalog.bounds(),
            loaded_regions: cache.loaded_count(),
            loaded_object_regions: cache.loaded_objects().count(),
            failed_regions: cache.failed().len(),
            total_vertices: cache.loaded().map(|(_, m)| m.vertex_count).sum(),
            window_center: cache.window().map(|w| w.center),
            average_load: cache.load_timer().average(),
        }
    }

    /// Catalog and cache details for one coordinate. `None` when the
    /// coordinate is neither cataloged nor loaded.
    pub fn inspect_region<B: MeshBackend>(
        cache: &StreamingCache<B>,
        coord: RegionCoord,
    ) -> Option<RegionInfo> {
        let terrain_path = cache.catalog().terrain_path(coord).map(PathBuf::from);
        let objects_path = cache.catalog().objects_path(coord).map(PathBuf::from);
        let mesh = cache.loaded_mesh(coord);
        if terrain_path.is_none() && objects_path.is_none() && mesh.is_none() {
            return None;
        }
        Some(RegionInfo {
            coord,
            terrain_path,
            objects_path,
            loaded: mesh.is_some(),
            failed: cache.failed().contains(&coord),
            vertex_count: mesh.map(|m| m.vertex_count),
            origin: mesh.map(|m| m.origin),
            load_time: mesh.map(|m| m.load_time),
            object_count: cache.objects(coord).map(|o| o.len()),
        })
    }

    /// List all loaded region coordinates.
    pub fn list_loaded<B: MeshBackend>(cache: &StreamingCache<B>) -> Vec<RegionCoord> {
        cache.loaded().map(|(c, _)| c).collect()
    }

    /// Summarize a decoded terrain region.
    pub fn terrain(region: &TerrainRegion) -> TerrainSummary {
        let mut texture_ids = BTreeSet::new();
        let mut water_blocks = 0;
        for (_, block) in region.blocks() {
            texture_ids.extend(block.cells().iter().map(|c| c.texture_id()));
            if block.water_type != 0xff {
                water_blocks += 1;
            }
        }
        TerrainSummary {
            coord: region.coord(),
            initialized: region.is_initialized(),
            tag: region.tag().to_string(),
            blocks: region.block_count(),
            height_range: region.height_range(),
            texture_ids: texture_ids.into_iter().collect(),
            water_blocks,
        }
    }

    /// Summarize a decoded resource bundle.
    pub fn bundle(bundle: &ResourceBundle) -> BundleSummary {
        BundleSummary {
            name: bundle.name().to_string(),
            initialized: bundle.is_initialized(),
            materials: bundle.materials.len(),
            meshes: bundle.meshes.len(),
            skeleton: bundle.skeleton.as_ref().map(|s| s.path.clone()),
            animations: bundle.animations.paths.len(),
            mesh_groups: bundle.mesh_groups.len(),
            animation_groups: bundle.animation_groups.len(),
            modifier_sets: bundle.palette.sets.len(),
            modifiers: bundle.palette.modifier_count(),
            palette_complete: bundle.palette.is_complete(),
            has_collision: bundle.collision.is_some(),
            warnings: bundle.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Summary of catalog and cache state for the inspector.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub terrain_files: usize,
    pub object_files: usize,
    pub skipped_entries: usize,
    pub bounds: Option<(RegionCoord, RegionCoord)>,
    pub loaded_regions: usize,
    pub loaded_object_regions: usize,
    pub failed_regions: usize,
    pub total_vertices: usize,
    pub window_center: Option<RegionCoord>,
    pub average_load: Duration,
}

impl std::fmt::Display for CacheSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Catalog: terrain={} objects={} skipped={}",
            self.terrain_files, self.object_files, self.skipped_entries
        )?;
        if let Some((min, max)) = self.bounds {
            write!(f, " bounds={min}..{max}")?;
        }
        write!(
            f,
            "\nCache: loaded={} object_regions={} failed={} vertices={} avg_load={:?}",
            self.loaded_regions,
            self.loaded_object_regions,
            self.failed_regions,
            self.total_vertices,
            self.average_load
        )?;
        if let Some(center) = self.window_center {
            write!(f, " center={center}")?;
        }
        Ok(())
    }
}

/// Detailed info about a single region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionInfo {
    pub coord: RegionCoord,
    pub terrain_path: Option<PathBuf>,
    pub objects_path: Option<PathBuf>,
    pub loaded: bool,
    pub failed: bool,
    pub vertex_count: Option<usize>,
    pub origin: Option<Vec3>,
    pub load_time: Option<Duration>,
    pub object_count: Option<usize>,
}

impl std::fmt::Display for RegionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Region {}", self.coord)?;
        match (self.vertex_count, self.origin) {
            (Some(n), Some(o)) => write!(
                f,
                " loaded vertices={n} origin=({:.0}, {:.0}, {:.0})",
                o.x, o.y, o.z
            )?,
            _ if self.failed => write!(f, " failed")?,
            _ => write!(f, " not loaded")?,
        }
        if let Some(n) = self.object_count {
            write!(f, " objects={n}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TerrainSummary {
    pub coord: RegionCoord,
    pub initialized: bool,
    pub tag: String,
    pub blocks: usize,
    pub height_range: Option<(f32, f32)>,
    pub texture_ids: Vec<u16>,
    pub water_blocks: usize,
}

impl std::fmt::Display for TerrainSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.initialized {
            return write!(f, "Terrain {}: uninitialized", self.coord);
        }
        write!(
            f,
            "Terrain {} [{}]: blocks={} textures={} water_blocks={}",
            self.coord,
            self.tag,
            self.blocks,
            self.texture_ids.len(),
            self.water_blocks
        )?;
        if let Some((min, max)) = self.height_range {
            write!(f, " height={min:.1}..{max:.1}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
    pub name: String,
    pub initialized: bool,
    pub materials: usize,
    pub meshes: usize,
    pub skeleton: Option<String>,
    pub animations: usize,
    pub mesh_groups: usize,
    pub animation_groups: usize,
    pub modifier_sets: usize,
    pub modifiers: usize,
    pub palette_complete: bool,
    pub has_collision: bool,
    pub warnings: Vec<String>,
}

impl std::fmt::Display for BundleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.initialized {
            return write!(f, "Bundle: uninitialized");
        }
        writeln!(
            f,
            "Bundle {:?}: materials={} meshes={} animations={} mesh_groups={} animation_groups={}",
            self.name,
            self.materials,
            self.meshes,
            self.animations,
            self.mesh_groups,
            self.animation_groups
        )?;
        if let Some(skeleton) = &self.skeleton {
            writeln!(f, "  skeleton: {skeleton}")?;
        }
        write!(
            f,
            "  modifiers: {} in {} sets{} collision={}",
            self.modifiers,
            self.modifier_sets,
            if self.palette_complete { "" } else { " (incomplete)" },
            self.has_collision
        )?;
        for w in &self.warnings {
            write!(f, "\n  warning: {w}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionview_common::REGION_SIZE;
    use regionview_formats::{TerrainBlock, TerrainCell};
    use regionview_render::HeadlessBackend;
    use regionview_stream::StreamConfig;

    fn region(coord: RegionCoord) -> TerrainRegion {
        TerrainRegion::from_fn(coord, |b| {
            let texture = TerrainCell::pack_texture(b.index() as u16 % 3, 0);
            TerrainBlock::from_fn(*b"insp\0\0", texture, |x, _| x as f32)
        })
    }

    fn cache_with(coords: &[(i32, i32)]) -> (tempfile::TempDir, StreamingCache<HeadlessBackend>) {
        let dir = tempfile::tempdir().unwrap();
        for &(x, z) in coords {
            let path = dir.path().join(z.to_string());
            std::fs::create_dir_all(&path).unwrap();
            let bytes = region(RegionCoord::new(x, z)).encode().unwrap();
            std::fs::write(path.join(format!("{x}.m")), bytes).unwrap();
        }
        let mut cache = StreamingCache::new(HeadlessBackend::new(), StreamConfig::default());
        cache.reindex(dir.path()).unwrap();
        (dir, cache)
    }

    #[test]
    fn summary_empty_cache() {
        let cache = StreamingCache::new(HeadlessBackend::new(), StreamConfig::default());
        let summary = RegionInspector::summary(&cache);
        assert_eq!(summary.terrain_files, 0);
        assert_eq!(summary.loaded_regions, 0);
        assert!(summary.bounds.is_none());
    }

    #[test]
    fn summary_after_update() {
        let (_dir, mut cache) = cache_with(&[(0, 0), (1, 0), (9, 9)]);
        cache.update_window(Vec3::new(10.0, 0.0, 10.0), 1);

        let summary = RegionInspector::summary(&cache);
        assert_eq!(summary.terrain_files, 3);
        assert_eq!(summary.loaded_regions, 2);
        assert_eq!(summary.bounds, Some((RegionCoord::new(0, 0), RegionCoord::new(9, 9))));
        assert_eq!(summary.window_center, Some(RegionCoord::new(0, 0)));
        let text = summary.to_string();
        assert!(text.contains("loaded=2"));
        assert!(text.contains("bounds=(0, 0)..(9, 9)"));
    }

    #[test]
    fn inspect_loaded_and_cataloged_regions() {
        let (_dir, mut cache) = cache_with(&[(1, 1), (5, 5)]);
        cache.update_window(Vec3::splat(1.5 * REGION_SIZE), 0);

        let loaded = RegionInspector::inspect_region(&cache, RegionCoord::new(1, 1)).unwrap();
        assert!(loaded.loaded);
        assert_eq!(loaded.origin, Some(Vec3::new(1920.0, 0.0, 1920.0)));
        assert!(loaded.to_string().contains("origin=(1920, 0, 1920)"));

        let idle = RegionInspector::inspect_region(&cache, RegionCoord::new(5, 5)).unwrap();
        assert!(!idle.loaded);
        assert!(idle.terrain_path.is_some());
        assert!(idle.to_string().contains("not loaded"));

        assert!(RegionInspector::inspect_region(&cache, RegionCoord::new(7, 7)).is_none());
    }

    #[test]
    fn list_loaded_regions() {
        let (_dir, mut cache) = cache_with(&[(0, 0), (0, 1)]);
        cache.update_window(Vec3::ZERO, 1);
        assert_eq!(
            RegionInspector::list_loaded(&cache),
            vec![RegionCoord::new(0, 0), RegionCoord::new(0, 1)]
        );
    }

    #[test]
    fn terrain_summary_counts_textures() {
        let summary = RegionInspector::terrain(&region(RegionCoord::new(3, 4)));
        assert!(summary.initialized);
        assert_eq!(summary.blocks, 36);
        assert_eq!(summary.texture_ids, vec![0, 1, 2]);
        assert_eq!(summary.height_range, Some((0.0, 16.0)));
        assert!(summary.to_string().contains("blocks=36"));

        let empty = RegionInspector::terrain(&TerrainRegion::uninitialized(RegionCoord::new(0, 0)));
        assert!(empty.to_string().contains("uninitialized"));
    }

    #[test]
    fn bundle_summary_of_uninitialized() {
        let summary = RegionInspector::bundle(&ResourceBundle::uninitialized());
        assert!(!summary.initialized);
        assert_eq!(summary.to_string(), "Bundle: uninitialized");
    }
}
