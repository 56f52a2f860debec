//! Integration test: a job fetched over HTTP from a local server through curl.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{asset_server, full_map_set, staging_in};
use tempfile::tempdir;
use texstage_core::config::FetchConfig;
use texstage_core::fetch::{ApiClient, CurlFetcher, Fetcher, ManifestSource};
use texstage_core::manifest::ManifestCache;
use texstage_core::queue::{DownloadQueue, Job, JobRunner, JobState};

fn quick_fetch() -> FetchConfig {
    FetchConfig {
        connect_timeout_secs: 5,
        timeout_secs: 20,
        low_speed_limit: 1,
        low_speed_time_secs: 10,
    }
}

/// Routes for one asset: its manifest under `/files/<id>` and the maps under `/dl/`.
fn routes_for(asset: &str, base: &str) -> HashMap<String, Vec<u8>> {
    let mut routes = HashMap::new();
    let mut maps = serde_json::Map::new();
    for (name, body) in full_map_set(asset) {
        maps.insert(
            name.clone(),
            serde_json::json!({ "4k": { "png": { "url": format!("{}/dl/{}", base, name) } } }),
        );
        routes.insert(format!("/dl/{}", name), body);
    }
    let manifest = serde_json::to_vec(&serde_json::json!({ "Diffuse": maps })).unwrap();
    routes.insert(format!("/files/{}", asset), manifest);
    let mut catalog = serde_json::Map::new();
    catalog.insert(
        asset.to_string(),
        serde_json::json!({ "name": "Rock Face", "tags": ["rock"] }),
    );
    routes.insert("/assets?type=textures".to_string(), serde_json::to_vec(&catalog).unwrap());
    routes
}

fn start_server(asset: &str) -> asset_server::AssetServer {
    asset_server::start_with(|base| routes_for(asset, base))
}

#[tokio::test]
async fn job_over_http_writes_composites_and_caches_manifest() {
    let server = start_server("rock_face");
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("api_cache.json");

    let fetcher: Arc<dyn Fetcher> = Arc::new(CurlFetcher::new("pbrmatcher", quick_fetch()));
    let cache = Arc::new(ManifestCache::load_or_empty(&cache_path).unwrap());
    let api = Arc::new(ApiClient::new(&server.base, Arc::clone(&fetcher), cache));
    let manifests: Arc<dyn ManifestSource> = api.clone();

    let runner = JobRunner::new(fetcher, manifests, staging_in(dir.path()));
    let queue = DownloadQueue::start(runner, None);
    let id = queue
        .submit(Job::new("textures/Rock.png", "rock_face", "Rock"))
        .unwrap();
    queue.wait_idle().await;

    let record = queue.record(id).unwrap();
    assert_eq!(record.state, JobState::Completed, "{:?}", record.error);
    let report = record.report.unwrap();
    assert_eq!(report.composites.len(), 4, "{:?}", report);
    assert!(staging_in(dir.path()).output_dir().join("rock_diffparam.png").is_file());

    let agents = server.user_agents.lock().unwrap().clone();
    assert!(!agents.is_empty());
    assert!(agents.iter().all(|a| a == "pbrmatcher"));

    // Manifest landed in the persisted cache, keyed by its URL.
    let reloaded = ManifestCache::load_or_empty(&cache_path).unwrap();
    let key = format!("{}/files/rock_face", server.base);
    assert!(reloaded.get(&key).is_some());

    let catalog = texstage_core::selection::AssetCatalog::from_node(&api.fetch_catalog().unwrap());
    assert_eq!(catalog.id_for_name("Rock Face"), Some("rock_face"));
}

#[test]
fn missing_manifest_is_http_error() {
    let server = start_server("rock_face");
    let fetcher: Arc<dyn Fetcher> = Arc::new(CurlFetcher::new("pbrmatcher", quick_fetch()));
    let api = ApiClient::new(&server.base, fetcher, Arc::new(ManifestCache::new()));
    let err = api.fetch_manifest("marble").unwrap_err();
    assert!(
        matches!(err, texstage_core::fetch::FetchError::Http { status: 404, .. }),
        "{:?}",
        err
    );
}
