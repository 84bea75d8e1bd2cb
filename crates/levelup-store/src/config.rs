//! levelup configuration and gateway factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use levelup_core::controller::ControllerSettings;
use levelup_core::engine::QuizConfig;

use crate::gateway::DualPathGateway;
use crate::http::{HttpProgressApi, DEFAULT_TIMEOUT_MS};
use crate::local::LocalFileStore;

/// Connection settings for the progress API.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Budget for each remote call before falling back to the local cache.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Top-level levelup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelupConfig {
    /// Progress API. Without it progress stays on this machine.
    #[serde(default)]
    pub api: Option<ApiConfig>,
    /// Player identity used in local storage keys.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Directory of the local progress cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub controller: ControllerSettings,
}

fn default_user_id() -> String {
    "local".to_string()
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.levelup")
}

impl Default for LevelupConfig {
    fn default() -> Self {
        Self {
            api: None,
            user_id: default_user_id(),
            cache_dir: default_cache_dir(),
            quiz: QuizConfig::default(),
            controller: ControllerSettings::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `levelup.toml` in the current directory
/// 2. `~/.config/levelup/config.toml`
///
/// Environment variable overrides: `LEVELUP_API_URL`, `LEVELUP_API_TOKEN`,
/// `LEVELUP_USER`.
pub fn load_config() -> Result<LevelupConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LevelupConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("levelup.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<LevelupConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LevelupConfig::default(),
    };

    Ok(apply_env(config, |name| std::env::var(name).ok()))
}

/// Apply `LEVELUP_*` overrides and resolve `${VAR}` references.
fn apply_env(mut config: LevelupConfig, var: impl Fn(&str) -> Option<String>) -> LevelupConfig {
    if let Some(url) = var("LEVELUP_API_URL") {
        match &mut config.api {
            Some(api) => api.base_url = url,
            None => {
                config.api = Some(ApiConfig {
                    base_url: url,
                    token: None,
                    timeout_ms: default_timeout_ms(),
                })
            }
        }
    }

    if let (Some(token), Some(api)) = (var("LEVELUP_API_TOKEN"), config.api.as_mut()) {
        api.token = Some(token);
    }

    if let Some(user) = var("LEVELUP_USER") {
        config.user_id = user;
    }

    if let Some(api) = config.api.as_mut() {
        api.base_url = resolve_env_vars(&api.base_url);
        api.token = api
            .token
            .as_deref()
            .map(resolve_env_vars)
            .filter(|t| !t.is_empty());
        if api.base_url.is_empty() {
            tracing::warn!("API base_url resolved to an empty string, running local-only");
            config.api = None;
        }
    }

    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("levelup"))
}

/// Create the progress gateway described by `config`.
pub fn create_gateway(config: &LevelupConfig) -> Result<DualPathGateway> {
    let cache = Arc::new(LocalFileStore::new(&config.cache_dir));
    let gateway = DualPathGateway::new(cache);

    match &config.api {
        Some(api) => {
            let timeout = Duration::from_millis(api.timeout_ms);
            let remote = HttpProgressApi::new(&api.base_url, api.token.clone(), timeout)
                .with_context(|| format!("failed to set up API client for {}", api.base_url))?;
            tracing::debug!(base_url = %api.base_url, "remote progress enabled");
            Ok(gateway.with_remote(Arc::new(remote), timeout))
        }
        None => {
            tracing::debug!(cache_dir = %config.cache_dir.display(), "local-only progress");
            Ok(gateway)
        }
    }
}
