//! Operator selections: which remote asset each local texture was paired with.
//!
//! The selection database is written by the tagging tool; this module only
//! reads it and turns one slot of every texture into a [`Job`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::manifest::ManifestNode;
use crate::queue::Job;

/// `db.json`: `{"textures": {"<path>": {"tags": [...], "selected_thumbnails": [...]}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionDb {
    #[serde(default)]
    pub textures: BTreeMap<String, TextureEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextureEntry {
    #[serde(default)]
    pub tags: Vec<String>,
    /// Display names of the chosen remote assets, slot A first.
    #[serde(default)]
    pub selected_thumbnails: Vec<String>,
}

impl SelectionDb {
    /// Reads the database; a missing file is an empty database.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_json_slice(&bytes)
                .with_context(|| format!("parse selection db: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("read selection db: {}", path.display())),
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One of the four selection slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    A,
    B,
    C,
    D,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
            Slot::C => 2,
            Slot::D => 3,
        }
    }
}

impl FromStr for Slot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Slot::A),
            "B" => Ok(Slot::B),
            "C" => Ok(Slot::C),
            "D" => Ok(Slot::D),
            other => anyhow::bail!("unknown slot {:?} (expected A, B, C or D)", other),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = (b'A' + self.index() as u8) as char;
        write!(f, "{}", c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: Option<String>,
    pub tags: Vec<String>,
}

/// The asset API's texture listing, keyed by asset id.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl AssetCatalog {
    /// Reads `{ "<id>": { "name": ..., "tags": [...] } }`. Non-object entries are ignored.
    pub fn from_node(node: &ManifestNode) -> Self {
        let ManifestNode::Object(map) = node else {
            return Self::default();
        };
        let entries = map
            .iter()
            .filter(|(_, v)| matches!(v, ManifestNode::Object(_)))
            .map(|(id, v)| {
                let name = v.get("name").and_then(ManifestNode::as_str).map(str::to_string);
                let tags = match v.get("tags") {
                    Some(ManifestNode::Array(items)) => items
                        .iter()
                        .filter_map(|t| t.as_str().map(str::to_string))
                        .collect(),
                    _ => Vec::new(),
                };
                (id.clone(), CatalogEntry { name, tags })
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    /// Asset id for a display name. A name that already is an id resolves to itself.
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| e.name.as_deref() == Some(name))
            .map(|(id, _)| id.as_str())
            .or_else(|| self.entries.get_key_value(name).map(|(id, _)| id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Composite label for a local texture: its file name without `.png`.
pub fn output_label(texture_path: &str) -> String {
    let base = texture_path
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(texture_path);
    base.replace(".png", "")
}

/// A texture whose slot could not become a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSkip {
    pub texture: String,
    pub reason: String,
}

/// One job per texture that has a selection in `slot`, in texture path order.
pub fn build_jobs(
    db: &SelectionDb,
    catalog: &AssetCatalog,
    slot: Slot,
) -> (Vec<Job>, Vec<SelectionSkip>) {
    let mut jobs = Vec::new();
    let mut skipped = Vec::new();
    for (path, entry) in &db.textures {
        let Some(name) = entry.selected_thumbnails.get(slot.index()) else {
            continue;
        };
        match catalog.id_for_name(name) {
            Some(id) => jobs.push(Job::new(path.clone(), id, output_label(path))),
            None => {
                tracing::warn!(texture = %path, "no catalogue entry named {:?}", name);
                skipped.push(SelectionSkip {
                    texture: path.clone(),
                    reason: format!("no catalogue entry named {:?}", name),
                });
            }
        }
    }
    (jobs, skipped)
}
