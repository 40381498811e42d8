//! Global configuration management for bomsync.
//!
//! The global configuration lives at `~/.bomsync/config.toml` (or
//! `%LOCALAPPDATA%\bomsync\config.toml` on Windows) and holds everything a
//! run needs besides its command-line arguments: the item master endpoint and
//! token, resolver limits, the write delay and the category hierarchy.
//!
//! # Security Considerations
//!
//! The file may contain an API token. It is written with `0600` permissions
//! on Unix, and [`GlobalConfig::redacted`] must be used whenever it is shown.
//!
//! # Example
//!
//! ```toml
//! assemblies = ["RACK-A1", "RACK-B2"]
//!
//! [api]
//! base_url = "https://plm.example.com/api/v2"
//! token = "..."
//!
//! [resolver]
//! max_depth = 10
//!
//! [sync]
//! request_delay_ms = 250
//!
//! [[hierarchy]]
//! level = 0
//! category = "Rack"
//!
//! [[hierarchy]]
//! level = 1
//! category = "Chassis"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    CONFIG_ENV_VAR, DEFAULT_MAX_DEPTH, DEFAULT_REQUEST_DELAY_MS, HTTP_REQUEST_TIMEOUT,
    TOKEN_ENV_VAR, batch_operation_timeout,
};
use crate::core::BomError;
use crate::models::HierarchyLevel;

/// `[api]` section: where and how to reach the item master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. `https://plm.example.com/api/v2`
    pub base_url: String,
    /// Bearer token; falls back to `BOMSYNC_TOKEN` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token: None,
            timeout_secs: HTTP_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of BOM levels fetched below a root
    pub max_depth: usize,
    /// Timeout for one fan-out batch before falling back to sequential fetching
    pub batch_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            batch_timeout_secs: batch_operation_timeout().as_secs(),
        }
    }
}

impl ResolverConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay after each BOM line creation, in milliseconds
    pub request_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
        }
    }
}

impl SyncConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Global bomsync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    /// Item numbers treated as placeable assemblies when consolidating
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assemblies: Vec<String>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Ordered category hierarchy, level 0 first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchy: Vec<HierarchyLevel>,
}

impl GlobalConfig {
    /// Load from the default location; a missing file yields defaults.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else `BOMSYNC_CONFIG`, else the default
    /// location. A missing file yields defaults; `~` is expanded.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(BomError::from)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        if let Err(problems) = crate::aggregate::classifier::validate_hierarchy(&config.hierarchy) {
            for problem in problems {
                tracing::warn!("Hierarchy in {}: {problem}", path.display());
            }
        }

        Ok(config)
    }

    /// Reject settings no request could succeed with.
    pub fn validate(&self) -> Result<(), BomError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(BomError::ConfigError {
                message: "api.base_url is empty".to_string(),
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BomError::ConfigError {
                message: format!("api.base_url '{base_url}' must start with http:// or https://"),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(BomError::ConfigError {
                message: "api.timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        // Owner read/write only: the file may carry a token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Platform default path of the config file.
    pub fn default_path() -> Result<PathBuf> {
        let unknown = |what: &str| BomError::ConfigError {
            message: format!("Unable to determine {what}; pass --config or set {CONFIG_ENV_VAR}"),
        };
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir().ok_or_else(|| unknown("local data directory"))?.join("bomsync")
        } else {
            dirs::home_dir().ok_or_else(|| unknown("home directory"))?.join(".bomsync")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// The path `load_with_optional` would read.
    pub fn resolve_path(path: Option<PathBuf>) -> Result<PathBuf> {
        let explicit = path.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        match explicit {
            Some(path) => {
                let raw = path.to_string_lossy();
                Ok(PathBuf::from(shellexpand::tilde(&raw).into_owned()))
            }
            None => Self::default_path(),
        }
    }

    /// The API token from the config, or from `BOMSYNC_TOKEN`.
    pub fn token(&self) -> Option<String> {
        self.api
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok().filter(|token| !token.is_empty()))
    }

    /// Copy safe to print: the token is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.api.token.is_some() {
            copy.api.token = Some("********".to_string());
        }
        copy
    }

    /// Example configuration written by `bomsync config init`.
    pub fn init_example() -> Self {
        Self {
            assemblies: vec!["RACK-A1".to_string(), "RACK-B2".to_string()],
            api: ApiConfig {
                base_url: "https://plm.example.com/api/v2".to_string(),
                token: None,
                ..ApiConfig::default()
            },
            resolver: ResolverConfig::default(),
            sync: SyncConfig::default(),
            hierarchy: vec![
                HierarchyLevel::new(0, "Rack"),
                HierarchyLevel::new(1, "Chassis"),
                HierarchyLevel::new(2, "Module"),
                HierarchyLevel::new(3, "Cable"),
            ],
        }
    }
}
