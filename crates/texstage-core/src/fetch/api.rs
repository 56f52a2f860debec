//! Asset API client: manifests and the texture catalogue, both cached by URL.

use std::sync::Arc;

use url::Url;

use super::{FetchError, Fetcher, ManifestSource};
use crate::config::TexstageConfig;
use crate::manifest::{ManifestCache, ManifestNode};

pub struct ApiClient {
    base: String,
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<ManifestCache>,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, fetcher: Arc<dyn Fetcher>, cache: Arc<ManifestCache>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            fetcher,
            cache,
        }
    }

    /// Client for `cfg.api_base` with the response cache file loaded.
    pub fn from_config(cfg: &TexstageConfig, fetcher: Arc<dyn Fetcher>) -> anyhow::Result<Self> {
        let cache = ManifestCache::load_or_empty(&cfg.manifest_cache_path()?)?;
        Ok(Self::new(cfg.api_base.clone(), fetcher, Arc::new(cache)))
    }

    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base).map_err(|_| FetchError::InvalidUrl(self.base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `<base>/files/<asset_id>`, with the id percent-encoded as one path segment.
    pub fn manifest_url(&self, asset_id: &str) -> Result<String, FetchError> {
        Ok(self.endpoint(&["files", asset_id])?.to_string())
    }

    /// `<base>/assets?type=textures`.
    pub fn catalog_url(&self) -> Result<String, FetchError> {
        let mut url = self.endpoint(&["assets"])?;
        url.query_pairs_mut().append_pair("type", "textures");
        Ok(url.to_string())
    }

    /// Texture catalogue: `{ "<id>": { "name": ..., "tags": [...] }, ... }`.
    pub fn fetch_catalog(&self) -> Result<ManifestNode, FetchError> {
        self.get_json(&self.catalog_url()?)
    }

    fn get_json(&self, url: &str) -> Result<ManifestNode, FetchError> {
        self.cache.get_or_fetch(url, || {
            tracing::debug!(url, "requesting");
            let bytes = self.fetcher.fetch_bytes(url)?;
            ManifestNode::from_json_slice(&bytes).map_err(|source| FetchError::Parse {
                url: url.to_string(),
                source,
            })
        })
    }
}

impl ManifestSource for ApiClient {
    fn fetch_manifest(&self, asset_id: &str) -> Result<ManifestNode, FetchError> {
        self.get_json(&self.manifest_url(asset_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        bodies: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl Fetcher for Recorded {
        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.bodies.get(url).cloned().ok_or(FetchError::Http {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn client(bodies: &[(&str, &str)]) -> (ApiClient, Arc<Recorded>) {
        let fetcher = Arc::new(Recorded {
            bodies: bodies
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
            ..Default::default()
        });
        let api = ApiClient::new(
            "https://api.example.com/",
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
            Arc::new(ManifestCache::new()),
        );
        (api, fetcher)
    }

    #[test]
    fn endpoint_urls() {
        let (api, _) = client(&[]);
        assert_eq!(api.manifest_url("rock_face").unwrap(), "https://api.example.com/files/rock_face");
        assert_eq!(api.manifest_url("a b").unwrap(), "https://api.example.com/files/a%20b");
        assert_eq!(api.catalog_url().unwrap(), "https://api.example.com/assets?type=textures");
    }

    #[test]
    fn manifest_is_fetched_once() {
        let (api, fetcher) = client(&[(
            "https://api.example.com/files/rock",
            r#"{"arm": {"4k": {"png": {"url": "https://dl.example.com/rock_arm_4k.png"}}}}"#,
        )]);
        let first = api.fetch_manifest("rock").unwrap();
        let second = api.fetch_manifest("rock").unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
        assert_eq!(api.cache().len(), 1);
    }

    #[test]
    fn http_failure_is_not_cached() {
        let (api, fetcher) = client(&[]);
        assert!(matches!(
            api.fetch_manifest("missing"),
            Err(FetchError::Http { status: 404, .. })
        ));
        assert!(api.fetch_manifest("missing").is_err());
        assert_eq!(fetcher.requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let (api, _) = client(&[("https://api.example.com/assets?type=textures", "not json")]);
        assert!(matches!(api.fetch_catalog(), Err(FetchError::Parse { .. })));
    }

    #[test]
    fn bad_base_is_invalid_url() {
        let api = ApiClient::new(
            "not a url",
            Arc::new(Recorded::default()),
            Arc::new(ManifestCache::new()),
        );
        assert!(matches!(api.manifest_url("x"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn from_config_serves_from_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_cache.json");
        std::fs::write(
            &path,
            br#"{"https://api.example.com/files/rock": {"arm": "https://dl.example.com/rock_arm_4k.png"}}"#,
        )
        .unwrap();
        let cfg = TexstageConfig {
            api_base: "https://api.example.com".to_string(),
            manifest_cache: Some(path),
            ..Default::default()
        };
        let fetcher = Arc::new(Recorded::default());
        let api = ApiClient::from_config(&cfg, Arc::clone(&fetcher) as Arc<dyn Fetcher>).unwrap();
        let doc = api.fetch_manifest("rock").unwrap();
        assert!(doc.get("arm").is_some());
        assert!(fetcher.requests.lock().unwrap().is_empty());
    }
}
