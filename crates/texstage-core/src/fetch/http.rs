//! libcurl-backed [`Fetcher`].

use std::time::Duration;

use super::{FetchError, Fetcher};
use crate::config::{FetchConfig, TexstageConfig};

/// GET with redirects, a fixed User-Agent and the configured timeouts.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    user_agent: String,
    config: FetchConfig,
}

impl CurlFetcher {
    pub fn new(user_agent: impl Into<String>, config: FetchConfig) -> Self {
        Self {
            user_agent: user_agent.into(),
            config,
        }
    }

    pub fn from_config(cfg: &TexstageConfig) -> Self {
        Self::new(cfg.user_agent.clone(), cfg.fetch.clone())
    }

    fn easy(&self, url: &str) -> Result<curl::easy::Easy, FetchError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(Duration::from_secs(self.config.connect_timeout_secs))?;
        easy.low_speed_limit(self.config.low_speed_limit)?;
        easy.low_speed_time(Duration::from_secs(self.config.low_speed_time_secs))?;
        easy.timeout(Duration::from_secs(self.config.timeout_secs))?;
        Ok(easy)
    }
}

impl Fetcher for CurlFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut easy = self.easy(url)?;
        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Http {
                url: url.to_string(),
                status,
            });
        }
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}
