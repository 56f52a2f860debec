//! Network collaborators: raw byte fetches and manifest lookups.
//!
//! The queue only sees the [`Fetcher`] and [`ManifestSource`] traits, so tests
//! can run jobs against in-process fakes. [`CurlFetcher`] and [`ApiClient`] are
//! the production implementations.

mod api;
mod http;

pub use api::ApiClient;
pub use http::CurlFetcher;

use std::fmt;

use crate::manifest::ManifestNode;

/// Downloads the body of a URL. Blocking; the queue calls it from the blocking pool.
pub trait Fetcher: Send + Sync {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Resolves an asset identifier to its manifest document.
pub trait ManifestSource: Send + Sync {
    fn fetch_manifest(&self, asset_id: &str) -> Result<ManifestNode, FetchError>;
}

/// A failed fetch (the network error of the pipeline).
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// Response had a non-2xx status.
    Http { url: String, status: u32 },
    /// Body was not valid JSON.
    Parse {
        url: String,
        source: serde_json::Error,
    },
    /// The request URL could not be built.
    InvalidUrl(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Curl(e) if e.is_operation_timedout())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http { url, status } => write!(f, "GET {} returned HTTP {}", url, status),
            FetchError::Parse { url, source } => write!(f, "invalid JSON from {}: {}", url, source),
            FetchError::InvalidUrl(u) => write!(f, "invalid URL: {}", u),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Parse { source, .. } => Some(source),
            FetchError::Http { .. } | FetchError::InvalidUrl(_) => None,
        }
    }
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}
