//! # Application Configuration
//!
//! Where the dataset lives and how it is backed up.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ESTATE_STORAGE_MODE=remote                                         │
//! │     ESTATE_API_URL=https://crm.example.com                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/estate-crm/estate.toml (Linux)                           │
//! │     ~/Library/Application Support/com.estate.crm/estate.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     local mode, estate.db in the platform data directory               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! mode = "local"            # local | remote
//! database_path = "/data/estate.db"
//!
//! [remote]
//! base_url = "http://localhost:3001"
//! timeout_secs = 30
//!
//! [backup]
//! auto_backup = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

const CONFIG_FILE: &str = "estate.toml";
const DATABASE_FILE: &str = "estate.db";

// =============================================================================
// Storage Mode
// =============================================================================

/// Where the dataset is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// SQLite key-value file on this machine.
    #[default]
    Local,

    /// REST backend.
    Remote,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Local => write!(f, "local"),
            StorageMode::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "sqlite" => Ok(StorageMode::Local),
            "remote" | "api" | "rest" => Ok(StorageMode::Remote),
            other => Err(StoreError::InvalidConfig(format!(
                "Unknown storage mode: '{}'. Valid options: local, remote",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub mode: StorageMode,

    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Server root, without the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Write the rolling auto-backup slot on every save.
    #[serde(default = "default_true")]
    pub auto_backup: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSettings { auto_backup: true }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub backup: BackupSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (estate.toml)
    /// 3. Environment variables
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

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        if self.remote.timeout_secs == 0 {
            return Err(StoreError::InvalidConfig(
                "remote.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.storage.mode == StorageMode::Remote {
            let base = self.remote.base_url.trim();
            if base.is_empty() {
                return Err(StoreError::InvalidConfig(
                    "remote.base_url is required in remote mode".into(),
                ));
            }
            let parsed = url::Url::parse(base)
                .map_err(|e| StoreError::InvalidConfig(format!("remote.base_url: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(StoreError::InvalidConfig(format!(
                    "remote.base_url must start with http:// or https://, got: {}",
                    base
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("ESTATE_STORAGE_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding storage mode from environment");
                    self.storage.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown storage mode in environment"),
            }
        }

        if let Ok(path) = std::env::var("ESTATE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Ok(url) = std::env::var("ESTATE_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.remote.base_url = url;
        }

        if let Ok(secs) = std::env::var("ESTATE_API_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.remote.timeout_secs = s;
            }
        }

        if let Ok(flag) = std::env::var("ESTATE_AUTO_BACKUP") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.backup.auto_backup = true,
                "0" | "false" | "no" | "off" => self.backup.auto_backup = false,
                _ => warn!(value = %flag, "Unknown ESTATE_AUTO_BACKUP value"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "estate", "crm")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Database file: configured path, else the platform data directory,
    /// else the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE)))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }
}
