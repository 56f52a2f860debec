//! In-process asset API: manifests by asset id, file bodies by URL.
//!
//! Records every call and the highest number of calls that were running at
//! the same time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use texstage_core::fetch::{FetchError, Fetcher, ManifestSource};
use texstage_core::manifest::ManifestNode;

pub const DL_BASE: &str = "https://dl.test";

#[derive(Default)]
pub struct FakeApi {
    manifests: HashMap<String, ManifestNode>,
    files: HashMap<String, Vec<u8>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

pub fn file_url(asset: &str, filename: &str) -> String {
    format!("{}/{}/{}", DL_BASE, asset, filename)
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset whose manifest lists `files` (nested like the real API)
    /// and whose file URLs serve the given bodies.
    pub fn with_asset(mut self, asset: &str, files: Vec<(String, Vec<u8>)>) -> Self {
        let names: Vec<String> = files.iter().map(|(n, _)| n.clone()).collect();
        for (name, body) in files {
            self.files.insert(file_url(asset, &name), body);
        }
        self.with_manifest_listing(asset, &names)
    }

    /// Manifest only: the listed URLs are not served.
    pub fn with_manifest_listing(mut self, asset: &str, names: &[String]) -> Self {
        let mut maps = serde_json::Map::new();
        for (i, name) in names.iter().enumerate() {
            maps.insert(
                format!("map{}", i),
                serde_json::json!({
                    "4k": { "png": { "url": file_url(asset, name), "size": 1024 } },
                    "note": "not a url",
                }),
            );
        }
        let doc = serde_json::json!({ "maps": maps, "blend": [42, null, true] });
        let node = ManifestNode::from_json_slice(&serde_json::to_vec(&doc).unwrap()).unwrap();
        self.manifests.insert(asset.to_string(), node);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for FakeApi {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.enter(format!("file {}", url));
        let result = self.files.get(url).cloned().ok_or(FetchError::Http {
            url: url.to_string(),
            status: 404,
        });
        self.leave();
        result
    }
}

impl ManifestSource for FakeApi {
    fn fetch_manifest(&self, asset_id: &str) -> Result<ManifestNode, FetchError> {
        self.enter(format!("manifest {}", asset_id));
        let result = self.manifests.get(asset_id).cloned().ok_or(FetchError::Http {
            url: format!("https://api.test/files/{}", asset_id),
            status: 404,
        });
        self.leave();
        result
    }
}
