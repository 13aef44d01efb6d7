use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use cg_resolver::ResolverConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub resolver: ResolverConfig,
    /// Maximum age of cached lookups, in seconds
    pub cache_expiry_secs: Option<u64>,
}

impl AppConfig {
    pub fn cache_expiry(&self) -> Option<Duration> {
        self.cache_expiry_secs.map(Duration::from_secs)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_slice(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit path, or the default file if it exists, or defaults
    pub async fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::load(path).await;
        }

        let default_path = default_config_path()?;
        if tokio::fs::metadata(&default_path).await.is_ok() {
            return Self::load(&default_path).await;
        }

        debug!(
            "No config file at {}, using defaults",
            default_path.display()
        );
        Ok(Self::default())
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "craftgate", "craftgate")
        .context("Failed to get project directories")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}
