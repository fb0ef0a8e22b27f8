//! Configuration for the layout stream driver
//!
//! Settings are stored as TOML. Without an explicit path the file lives in the
//! platform config directory:
//!
//! - **Linux**: `~/.config/layoutstream-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/layoutstream-rs/config.toml`
//! - **Windows**: `%APPDATA%\layoutstream-rs\config.toml`
//!
//! # Example
//!
//! ```toml
//! queue_capacity = 64
//! max_iter = 100
//! node_col_names = ["id", "color", "size", "x", "y"]
//! edge_col_names = ["edge", "color", "bundle"]
//! resend_edges = false
//!
//! [transport]
//! type = "tcp"
//! addr = "127.0.0.1:5555"
//!
//! [dataset]
//! kind = "large"
//! ```

use crate::datasets::DatasetConfig;
use crate::error::{Result, ResultExt, StreamError};
use crate::session::{default_edge_col_names, default_node_col_names, SessionOptions};
use crate::types::{COL_BUNDLE, COL_COLOR, COL_EDGE, COL_ID, COL_SIZE, COL_X, COL_Y};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "layoutstream-rs";

/// Config filename inside the app directory
pub const CONFIG_FILE: &str = "config.toml";

/// Default bound on queued outbound frames
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default iteration cap
pub const DEFAULT_MAX_ITER: u32 = 100;

/// Default wait for the close sentinel, in milliseconds
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 500;

const KNOWN_NODE_COLUMNS: &[&str] = &[COL_ID, COL_COLOR, COL_SIZE, COL_X, COL_Y];
const KNOWN_EDGE_COLUMNS: &[&str] = &[COL_EDGE, COL_COLOR, COL_BUNDLE];

/// Platform config directory for this application
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Default config file path
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Where frames are published
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Bounded in-process queue drained by a consumer thread
    #[default]
    InProcess,
    /// TCP publisher for a single subscriber
    Tcp { addr: String },
}

impl std::fmt::Display for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportConfig::InProcess => write!(f, "in-process"),
            TransportConfig::Tcp { addr } => write!(f, "tcp://{}", addr),
        }
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Outbound queue bound; frames beyond it are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_iter")]
    pub max_iter: u32,

    #[serde(default = "default_node_col_names")]
    pub node_col_names: Vec<String>,

    #[serde(default = "default_edge_col_names")]
    pub edge_col_names: Vec<String>,

    /// Send the edge frame every iteration instead of once
    #[serde(default)]
    pub resend_edges: bool,

    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_max_iter() -> u32 {
    DEFAULT_MAX_ITER
}

fn default_close_timeout_ms() -> u64 {
    DEFAULT_CLOSE_TIMEOUT_MS
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_iter: DEFAULT_MAX_ITER,
            node_col_names: default_node_col_names(),
            edge_col_names: default_edge_col_names(),
            resend_edges: false,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            dataset: DatasetConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            StreamError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Save to `path`, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StreamError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| StreamError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| StreamError::Config(format!("Failed to write config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(StreamError::Config(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        check_columns("node_col_names", &self.node_col_names, KNOWN_NODE_COLUMNS)?;
        for required in [COL_ID, COL_X, COL_Y] {
            if !self.node_col_names.iter().any(|c| c == required) {
                return Err(StreamError::Config(format!(
                    "node_col_names must include '{}'",
                    required
                )));
            }
        }
        check_columns("edge_col_names", &self.edge_col_names, KNOWN_EDGE_COLUMNS)?;
        if let TransportConfig::Tcp { addr } = &self.transport {
            if addr.trim().is_empty() {
                return Err(StreamError::Config("tcp transport needs an addr".to_string()));
            }
        }
        Ok(())
    }

    /// Framing options for a session built from this config
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            node_col_names: self.node_col_names.clone(),
            edge_col_names: self.edge_col_names.clone(),
            resend_edges: self.resend_edges,
            close_timeout: Duration::from_millis(self.close_timeout_ms),
        }
    }
}

fn check_columns(field: &str, names: &[String], known: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !known.contains(&name.as_str()) {
            return Err(StreamError::Config(format!(
                "{}: unknown column '{}' (expected one of {})",
                field,
                name,
                known.join(", ")
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(StreamError::Config(format!(
                "{}: column '{}' listed twice",
                field, name
            )));
        }
    }
    Ok(())
}
