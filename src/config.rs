//! Build configuration.
//!
//! Loaded from TOML or constructed in code. Covers the knobs the pipeline
//! actually consults: resolver concurrency, fetch behavior, and the
//! optional on-disk asset cache.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BuildError, Result};

/// Default bound on concurrently executing field resolutions
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Top-level build configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Maximum number of concurrently executing field resolutions.
    pub concurrency: usize,
    /// Remote fetch settings.
    pub fetch: FetchConfig,
    /// Directory for the persistent asset cache; `None` keeps it in memory.
    pub cache_dir: Option<PathBuf>,
}

/// Remote fetch settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header for outgoing requests.
    pub user_agent: String,
    /// Maximum redirects to follow.
    pub max_redirects: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch: FetchConfig::default(),
            cache_dir: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
        }
    }
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BuildError::ConfigIo(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }
}
