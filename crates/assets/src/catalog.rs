use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::AssetError;

pub const OBJECT_INDEX_FILE: &str = "object.ifo";

const LINE_PATTERN: &str = r#"^(\d{5})\s+0x([0-9a-fA-F]{8})\s+"(.+?)"$"#;

/// Resource descriptor for a placed-object id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub id: u32,
    pub flags: u32,
    pub path: String,
}

/// Placed-object ids resolved to resource paths (`object.ifo`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectCatalog {
    entries: BTreeMap<u32, ObjectEntry>,
}

impl ObjectCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AssetError::MissingIndex(path.to_path_buf()));
        }
        let catalog = Self::parse(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), objects = catalog.len(), "object catalog loaded");
        Ok(catalog)
    }

    /// Header and malformed lines are ignored.
    pub fn parse(text: &str) -> Result<Self, AssetError> {
        let pattern = Regex::new(LINE_PATTERN)?;
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let Some(caps) = pattern.captures(line.trim()) else {
                continue;
            };
            let (Ok(id), Ok(flags)) = (caps[1].parse::<u32>(), u32::from_str_radix(&caps[2], 16)) else {
                continue;
            };
            entries.insert(
                id,
                ObjectEntry {
                    id,
                    flags,
                    path: caps[3].to_string(),
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn resolve(&self, object_id: u32) -> Option<&ObjectEntry> {
        self.entries.get(&object_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ObjectEntry> {
        self.entries.values()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}
