//! Remote asset manifests: a typed JSON tree and URL discovery inside it.

mod cache;

pub use cache::ManifestCache;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A manifest document as returned by the asset API.
///
/// Any JSON document maps onto this tree, so traversal is an exhaustive match
/// instead of runtime type inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestNode {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ManifestNode>),
    Object(BTreeMap<String, ManifestNode>),
}

impl ManifestNode {
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Child of an object node by key.
    pub fn get(&self, key: &str) -> Option<&ManifestNode> {
        match self {
            ManifestNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ManifestNode::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Collects every string leaf that starts with `http`, at any depth.
///
/// Object keys are never considered, only values. The result is a set: the
/// order of appearance in the manifest carries no meaning.
pub fn extract_urls(node: &ManifestNode) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    collect_urls(node, &mut urls);
    urls
}

fn collect_urls(node: &ManifestNode, out: &mut BTreeSet<String>) {
    match node {
        ManifestNode::String(s) if s.starts_with("http") => {
            out.insert(s.clone());
        }
        ManifestNode::Array(items) => items.iter().for_each(|item| collect_urls(item, out)),
        ManifestNode::Object(map) => map.values().for_each(|value| collect_urls(value, out)),
        ManifestNode::String(_)
        | ManifestNode::Null
        | ManifestNode::Bool(_)
        | ManifestNode::Number(_) => {}
    }
}
