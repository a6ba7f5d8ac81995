//! Configuration module for vispipe
//!
//! This module handles the runner's configuration:
//! - Logging filter and optional log directory
//! - The data source the root is bound to at start-up
//! - Where the tree layout is saved and restored from
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.vispipe.engine/`
//! - **macOS**: `~/Library/Application Support/dev.vispipe.engine/`
//! - **Windows**: `%APPDATA%\dev.vispipe.engine\`
//!
//! # Example
//!
//! ```ignore
//! use vispipe::config::AppConfig;
//!
//! let config = AppConfig::load_or_default("vispipe.toml");
//! let layout_path = config.layout_path();
//! ```

use crate::error::{Result, VisPipeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.vispipe.engine";

/// Default config filename
pub const CONFIG_FILE: &str = "vispipe.toml";

/// Default layout filename inside the app data directory
pub const DEFAULT_LAYOUT_FILE: &str = "last_tree.vplayout";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,vispipe=debug";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        VisPipeError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            VisPipeError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

// ==================== Source Config ====================

/// In-memory source the runner binds to the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URI reported by the source
    #[serde(default = "default_source_uri")]
    pub uri: String,

    /// Numeric channels served as `Series` (by index) and `Table`
    #[serde(default)]
    pub channels: Vec<Vec<f64>>,
}

fn default_source_uri() -> String {
    "mem://demo".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: default_source_uri(),
            channels: vec![vec![0.5, 1.5, 3.0, 4.0, 2.0, 8.0]],
        }
    }
}

// ==================== App Config ====================

/// Runner configuration, loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Directory for daily-rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Layout file to restore from and save to
    #[serde(default)]
    pub layout_path: Option<PathBuf>,

    /// Data source bound to the root
    #[serde(default)]
    pub source: SourceConfig,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_dir: None,
            layout_path: None,
            source: SourceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisPipeError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            VisPipeError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VisPipeError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| VisPipeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            VisPipeError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }

    /// Layout path: the configured one, else the default in the app data dir
    pub fn layout_path(&self) -> Option<PathBuf> {
        self.layout_path
            .clone()
            .or_else(|| app_data_dir().map(|d| d.join(DEFAULT_LAYOUT_FILE)))
    }
}
