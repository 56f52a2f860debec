use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::composite::{CompositeOptions, RequiredFileSet, ResizePolicy};

/// Network timeouts for map and manifest downloads (optional `[fetch]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Upper bound for a whole transfer in seconds. A hung fetch blocks the queue until this fires.
    pub timeout_secs: u64,
    /// Abort when throughput stays below this many bytes/sec for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 600,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/texstage/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TexstageConfig {
    /// Directory that receives downloaded source maps.
    pub staging_dir: PathBuf,
    /// Subdirectory of `staging_dir` that receives composites.
    pub output_subdir: String,
    /// Base URL of the asset API (no trailing slash needed).
    pub api_base: String,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Resolution tier of the maps to download (e.g. "2k", "4k").
    pub resolution: String,
    /// How channels of differing size are merged: "linear" (resize) or "strict" (fail).
    #[serde(default)]
    pub resize: ResizePolicy,
    /// Optional path of the JSON response cache; None = `~/.cache/texstage/api_cache.json`.
    #[serde(default)]
    pub manifest_cache: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for TexstageConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("staging"),
            output_subdir: "textures".to_string(),
            api_base: "https://api.polyhaven.com".to_string(),
            user_agent: "pbrmatcher".to_string(),
            resolution: "4k".to_string(),
            resize: ResizePolicy::default(),
            manifest_cache: None,
            fetch: FetchConfig::default(),
        }
    }
}

impl TexstageConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.staging_dir.join(&self.output_subdir)
    }

    pub fn required_files(&self) -> RequiredFileSet {
        RequiredFileSet::for_resolution(&self.resolution)
    }

    pub fn composite_options(&self) -> CompositeOptions {
        CompositeOptions {
            resize: self.resize,
        }
    }

    /// Resolved location of the response cache file.
    pub fn manifest_cache_path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.manifest_cache {
            return Ok(p.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("texstage")?;
        Ok(xdg_dirs.get_cache_home().join("api_cache.json"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("texstage")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TexstageConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<TexstageConfig> {
    if !path.exists() {
        let default_cfg = TexstageConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TexstageConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
