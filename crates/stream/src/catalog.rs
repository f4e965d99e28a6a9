use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regionview_common::RegionCoord;
use serde::Serialize;

use crate::error::StreamError;

pub const TERRAIN_EXT: &str = "m";
pub const OBJECTS_EXT: &str = "o";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RegionFileKind {
    Terrain,
    Objects,
}

impl RegionFileKind {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            TERRAIN_EXT => Some(Self::Terrain),
            OBJECTS_EXT => Some(Self::Objects),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub coord: RegionCoord,
    pub path: PathBuf,
    pub kind: RegionFileKind,
}

#[derive(Debug, Clone, Default)]
struct RegionFiles {
    terrain: Option<PathBuf>,
    objects: Option<PathBuf>,
}

/// Region files found under a root laid out as `<root>/<Z>/<X>.m|.o`.
///
/// Built by a full scan and replaced wholesale on every reindex.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    root: Option<PathBuf>,
    regions: BTreeMap<RegionCoord, RegionFiles>,
    skipped: Vec<PathBuf>,
}

impl RegionCatalog {
    /// Scan a root directory. An unreadable root is an error; unusable
    /// entries inside it are logged and skipped.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, StreamError> {
        let root = root.as_ref();
        let _span = tracing::info_span!("catalog_scan", root = %root.display()).entered();
        if !root.is_dir() {
            return Err(StreamError::RootNotFound(root.to_path_buf()));
        }

        let mut catalog = Self {
            root: Some(root.to_path_buf()),
            ..Self::default()
        };

        for dir in std::fs::read_dir(root)? {
            let dir = dir?;
            if !dir.file_type()?.is_dir() {
                continue;
            }
            let dir_path = dir.path();
            let Some(z) = parse_coord_component(&dir.file_name().to_string_lossy()) else {
                catalog.skip(dir_path, "directory name is not an integer Z coordinate");
                continue;
            };

            let entries = match std::fs::read_dir(&dir_path) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %dir_path.display(), error = %e, "unreadable region directory");
                    catalog.skipped.push(dir_path);
                    continue;
                }
            };
            for file in entries {
                let path = file?.path();
                if !path.is_file() {
                    continue;
                }
                let Some(kind) = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(RegionFileKind::from_extension)
                else {
                    continue;
                };
                let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
                let Some(x) = stem.as_deref().and_then(parse_coord_component) else {
                    catalog.skip(path, "file stem is not an integer X coordinate");
                    continue;
                };
                catalog.insert(RegionCoord::new(x, z), kind, path);
            }
        }

        tracing::info!(
            terrain = catalog.terrain_count(),
            objects = catalog.objects_count(),
            skipped = catalog.skipped.len(),
            "region catalog built"
        );
        Ok(catalog)
    }

    fn skip(&mut self, path: PathBuf, reason: &'static str) {
        let err = StreamError::InvalidCatalogEntry {
            path: path.clone(),
            reason,
        };
        tracing::warn!("{err}");
        self.skipped.push(path);
    }

    fn insert(&mut self, coord: RegionCoord, kind: RegionFileKind, path: PathBuf) {
        let files = self.regions.entry(coord).or_default();
        match kind {
            RegionFileKind::Terrain => files.terrain = Some(path),
            RegionFileKind::Objects => files.objects = Some(path),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn terrain_path(&self, coord: RegionCoord) -> Option<&Path> {
        self.regions.get(&coord)?.terrain.as_deref()
    }

    pub fn objects_path(&self, coord: RegionCoord) -> Option<&Path> {
        self.regions.get(&coord)?.objects.as_deref()
    }

    pub fn has_terrain(&self, coord: RegionCoord) -> bool {
        self.terrain_path(coord).is_some()
    }

    /// Every cataloged file, ordered by coordinate then kind.
    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry> + '_ {
        self.regions.iter().flat_map(|(&coord, files)| {
            let terrain = files.terrain.as_ref().map(|p| CatalogEntry {
                coord,
                path: p.clone(),
                kind: RegionFileKind::Terrain,
            });
            let objects = files.objects.as_ref().map(|p| CatalogEntry {
                coord,
                path: p.clone(),
                kind: RegionFileKind::Objects,
            });
            terrain.into_iter().chain(objects)
        })
    }

    /// Coordinates with at least one file.
    pub fn coords(&self) -> impl Iterator<Item = RegionCoord> + '_ {
        self.regions.keys().copied()
    }

    pub fn terrain_count(&self) -> usize {
        self.regions.values().filter(|f| f.terrain.is_some()).count()
    }

    pub fn objects_count(&self) -> usize {
        self.regions.values().filter(|f| f.objects.is_some()).count()
    }

    /// Number of coordinates with at least one file.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Paths skipped during the scan.
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Smallest and largest coordinate on each axis.
    pub fn bounds(&self) -> Option<(RegionCoord, RegionCoord)> {
        let mut coords = self.regions.keys();
        let first = *coords.next()?;
        Some(coords.fold((first, first), |(min, max), c| {
            (
                RegionCoord::new(min.x.min(c.x), min.z.min(c.z)),
                RegionCoord::new(max.x.max(c.x), max.z.max(c.z)),
            )
        }))
    }
}

fn parse_coord_component(s: &str) -> Option<i32> {
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn scans_z_dirs_and_x_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0/0.m");
        touch(dir.path(), "0/1.m");
        touch(dir.path(), "0/1.o");
        touch(dir.path(), "-3/7.o");

        let catalog = RegionCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.terrain_count(), 2);
        assert_eq!(catalog.objects_count(), 2);
        assert!(catalog.has_terrain(RegionCoord::new(1, 0)));
        assert!(catalog.objects_path(RegionCoord::new(7, -3)).is_some());
        assert!(!catalog.has_terrain(RegionCoord::new(7, -3)));
        assert_eq!(catalog.entries().count(), 4);
        assert_eq!(
            catalog.bounds(),
            Some((RegionCoord::new(0, -3), RegionCoord::new(7, 0)))
        );
    }

    #[test]
    fn non_numeric_names_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "textures/0.m");
        touch(dir.path(), "2/abc.m");
        touch(dir.path(), "2/3.m");
        touch(dir.path(), "2/readme.txt");
        touch(dir.path(), "tile2d.ifo");

        let catalog = RegionCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.terrain_count(), 1);
        assert!(catalog.has_terrain(RegionCoord::new(3, 2)));
        assert_eq!(catalog.skipped().len(), 2);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegionCatalog::scan(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, StreamError::RootNotFound(_)));
    }

    #[test]
    fn empty_root_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = RegionCatalog::scan(dir.path()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.bounds(), None);
        assert_eq!(catalog.root(), Some(dir.path()));
    }
}
