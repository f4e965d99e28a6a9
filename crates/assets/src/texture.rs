use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::AssetError;

/// File name of the texture index inside a map root.
pub const TEXTURE_INDEX_FILE: &str = "tile2d.ifo";
/// Directory holding texture images, relative to the map root.
pub const TEXTURE_DIR: &str = "tile2d";

const LINE_PATTERN: &str = r#"^(\d+)\s+(\S+)\s+"([^"]+)"\s+"([^"]+)"(?:\s+(.*))?$"#;

/// One line of `tile2d.ifo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureEntry {
    pub id: u16,
    pub secondary: String,
    pub region: String,
    /// Path as written in the index, relative to [`TEXTURE_DIR`].
    pub path: String,
}

/// Texture ids known to a map, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextureIndex {
    root: PathBuf,
    entries: BTreeMap<u16, TextureEntry>,
    skipped: usize,
}

impl TextureIndex {
    /// Load `<root>/tile2d.ifo`. A missing file is [`AssetError::MissingIndex`].
    pub fn load(root: impl AsRef<Path>) -> Result<Self, AssetError> {
        let root = root.as_ref();
        let path = root.join(TEXTURE_INDEX_FILE);
        if !path.is_file() {
            return Err(AssetError::MissingIndex(path));
        }
        let text = std::fs::read_to_string(&path)?;
        let index = Self::parse(&text, root)?;
        tracing::info!(
            path = %path.display(),
            textures = index.len(),
            skipped = index.skipped,
            "texture index loaded"
        );
        Ok(index)
    }

    /// Parse index text. Lines that do not match are skipped with a warning;
    /// a repeated id replaces the earlier entry.
    pub fn parse(text: &str, root: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let pattern = Regex::new(LINE_PATTERN)?;
        let mut index = Self {
            root: root.into(),
            ..Self::default()
        };

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed = pattern.captures(line).and_then(|caps| {
                Some(TextureEntry {
                    id: caps[1].parse().ok()?,
                    secondary: caps[2].to_string(),
                    region: caps[3].to_string(),
                    path: caps[4].to_string(),
                })
            });
            match parsed {
                Some(entry) => {
                    index.entries.insert(entry.id, entry);
                }
                None => {
                    tracing::warn!(line = line_no + 1, text = line, "unparseable texture index line");
                    index.skipped += 1;
                }
            }
        }
        Ok(index)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines skipped during parsing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, id: u16) -> Option<&TextureEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TextureEntry> {
        self.entries.values()
    }

    /// Image file for an entry: `.ddj` is served as `.png` under `tile2d/`.
    pub fn image_path(&self, entry: &TextureEntry) -> PathBuf {
        let mut relative = entry.path.replace('\\', "/");
        if let Some(stem) = relative.strip_suffix(".ddj") {
            relative = format!("{stem}.png");
        }
        self.root.join(TEXTURE_DIR).join(relative)
    }

    /// Assign texture-array layers sequentially in id order. With
    /// `require_image`, textures whose image file is missing get no layer.
    pub fn layer_map(&self, require_image: bool) -> LayerMap {
        let mut layers = BTreeMap::new();
        for entry in self.entries.values() {
            if require_image && !self.image_path(entry).is_file() {
                tracing::debug!(id = entry.id, path = %entry.path, "texture image missing");
                continue;
            }
            let next = layers.len() as u32;
            layers.insert(entry.id, next);
        }
        LayerMap { layers }
    }
}

/// Texture id to texture-array layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMap {
    layers: BTreeMap<u16, u32>,
}

impl LayerMap {
    pub fn get(&self, texture_id: u16) -> Option<u32> {
        self.layers.get(&texture_id).copied()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u32)> + '_ {
        self.layers.iter().map(|(&id, &layer)| (id, layer))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl FromIterator<(u16, u32)> for LayerMap {
    fn from_iter<I: IntoIterator<Item = (u16, u32)>>(iter: I) -> Self {
        Self {
            layers: iter.into_iter().collect(),
        }
    }
}

impl regionview_mesh::LayerLookup for LayerMap {
    fn layer(&self, texture_id: u16) -> Option<u32> {
        self.get(texture_id)
    }
}
