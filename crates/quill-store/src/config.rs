//! # Configuration
//!
//! Two layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  QuillConfig (quill.toml, per installation)                            │
//! │    1. defaults                                                          │
//! │    2. quill.toml  (~/.config/quill/quill.toml on Linux)                │
//! │    3. QUILL_* environment variables                                    │
//! │    4. validate()                                                       │
//! │                                                                         │
//! │  AppSettings (local store key "appSettings", changed at runtime)       │
//! │    { "useRemote": bool, "remoteUrl": "https://.../exec" }              │
//! │                                                                         │
//! │  select_store(local, settings, config) ──► Arc<dyn EntityStore>        │
//! │    use_remote = QUILL_USE_REMOTE / [remote].use_remote, else settings  │
//! │    url        = settings.remoteUrl, else [remote].url                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Config File Format
//! ```toml
//! [storage]
//! database_path = "/var/lib/quill/quill.db"
//!
//! [remote]
//! url = "https://script.google.com/macros/s/XXXX/exec"
//! timeout_secs = 30
//!
//! [sheet_server]
//! bind_addr = "127.0.0.1:8790"
//! snapshot_path = "/var/lib/quill/sheet.json"
//!
//! [logging]
//! filter = "info,quill=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::local::LocalStore;
use crate::remote::RemoteStore;
use crate::sheet::server::DEFAULT_SHEET_BIND;
use crate::store::EntityStore;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file for the local store. Default: platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Endpoint used when the runtime settings carry no URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout. Unset means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Forces the backend choice, overriding the runtime settings.
    #[serde(default)]
    pub use_remote: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetServerSettings {
    #[serde(default = "default_sheet_bind")]
    pub bind_addr: String,

    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_sheet_bind() -> String {
    DEFAULT_SHEET_BIND.to_string()
}

impl Default for SheetServerSettings {
    fn default() -> Self {
        SheetServerSettings {
            bind_addr: default_sheet_bind(),
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

// =============================================================================
// QuillConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sheet_server: SheetServerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl QuillConfig {
    /// Loads defaults, then the file (explicit path or the platform
    /// default), then environment overrides, then validates.
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> StoreResult<()> {
        if let Some(url) = &self.remote.url {
            if !is_http_url(url) {
                return Err(StoreError::InvalidConfig(format!(
                    "remote.url must start with http:// or https://, got: {url}"
                )));
            }
        }
        if self.remote.timeout_secs == Some(0) {
            return Err(StoreError::InvalidConfig(
                "remote.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.sheet_server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(StoreError::InvalidConfig(format!(
                "sheet_server.bind_addr is not a socket address: {}",
                self.sheet_server.bind_addr
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("QUILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(url) = var("QUILL_REMOTE_URL") {
            debug!(url = %url, "Overriding remote URL from environment");
            self.remote.url = Some(url);
        }

        if let Some(flag) = var("QUILL_USE_REMOTE") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.remote.use_remote = Some(true),
                "0" | "false" | "no" | "off" => self.remote.use_remote = Some(false),
                _ => warn!(value = %flag, "Unknown QUILL_USE_REMOTE value"),
            }
        }

        if let Some(bind) = var("QUILL_SHEET_BIND") {
            self.sheet_server.bind_addr = bind;
        }

        if let Some(filter) = var("QUILL_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// `quill.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "quill", "shop")
            .map(|dirs| dirs.config_dir().join("quill.toml"))
    }

    /// Configured database file, else `quill.db` in the platform data dir,
    /// else `./quill.db`.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("com", "quill", "shop")
                    .map(|dirs| dirs.data_dir().join("quill.db"))
            })
            .unwrap_or_else(|| PathBuf::from("quill.db"))
    }

    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote.timeout_secs.map(Duration::from_secs)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// =============================================================================
// Runtime Settings
// =============================================================================

/// Backend toggle persisted in the local store. Accepts the field names
/// older installs wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default, alias = "useGoogleSheets")]
    pub use_remote: bool,

    #[serde(default, alias = "googleSheetUrl")]
    pub remote_url: String,
}

impl AppSettings {
    pub fn validate(&self) -> StoreResult<()> {
        if self.use_remote && !is_http_url(self.remote_url.trim()) {
            return Err(StoreError::InvalidConfig(
                "remote URL must start with http:// or https:// when the remote store is enabled".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Store Selection
// =============================================================================

/// Picks the backend every caller will use.
///
/// Remote needs both the flag and a URL; with the flag set but no URL the
/// local store is used and a warning is logged.
pub fn select_store(
    local: &LocalStore,
    settings: &AppSettings,
    config: &QuillConfig,
) -> StoreResult<Arc<dyn EntityStore>> {
    let use_remote = config.remote.use_remote.unwrap_or(settings.use_remote);
    if !use_remote {
        debug!("Using local store");
        return Ok(Arc::new(local.clone()));
    }

    let url = Some(settings.remote_url.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .or_else(|| config.remote.url.clone());

    match url {
        Some(url) => {
            info!(url = %url, "Using remote store");
            Ok(Arc::new(RemoteStore::new(url, config.remote_timeout())?))
        }
        None => {
            warn!("Remote store enabled but no URL configured, using local store");
            Ok(Arc::new(local.clone()))
        }
    }
}
