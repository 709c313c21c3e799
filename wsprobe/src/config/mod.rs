//! Configuration system for the `wsprobe` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/wsprobe/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use wsprobe_core::history::MAXIMUM_SAVED_MESSAGES;
use wsprobe_core::session::SessionConfig;

use crate::net::NetConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    connection: ConnectionFileConfig,
    storage: StorageFileConfig,
    ui: UiFileConfig,
}

/// `[connection]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConnectionFileConfig {
    address: Option<String>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    path: Option<PathBuf>,
    max_saved_messages: Option<usize>,
    quota_bytes: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Default byte quota for the persistence store.
const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Connection --
    /// Address to put in the address bar on startup, overriding the stored one.
    pub address: Option<String>,
    /// Handshake timeout. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,

    // -- Storage --
    /// Path of the persistence file. `None` if no data directory exists.
    pub store_path: Option<PathBuf>,
    /// Number of received messages kept.
    pub max_saved_messages: usize,
    /// Byte quota of the persistence store.
    pub quota_bytes: usize,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout: None,
            channel_capacity: 256,
            store_path: default_store_path(),
            max_saved_messages: MAXIMUM_SAVED_MESSAGES,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            poll_timeout: Duration::from_millis(50),
            timestamp_format: SessionConfig::default().timestamp_format,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path
    /// (`~/.config/wsprobe/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            address: cli
                .address
                .clone()
                .or_else(|| file.connection.address.clone()),
            connect_timeout: file
                .connection
                .connect_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .or(defaults.connect_timeout),
            channel_capacity: file
                .connection
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            store_path: cli
                .store
                .clone()
                .or_else(|| file.storage.path.clone())
                .or(defaults.store_path),
            max_saved_messages: file
                .storage
                .max_saved_messages
                .unwrap_or(defaults.max_saved_messages),
            quota_bytes: file.storage.quota_bytes.unwrap_or(defaults.quota_bytes),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.ui.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
        }
    }

    /// Networking settings.
    #[must_use]
    pub fn to_net_config(&self) -> NetConfig {
        NetConfig {
            connect_timeout: self.connect_timeout,
            channel_capacity: self.channel_capacity,
        }
    }

    /// Session settings.
    #[must_use]
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            max_saved_messages: self.max_saved_messages,
            timestamp_format: self.timestamp_format.clone(),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal-native WebSocket testing tool")]
pub struct CliArgs {
    /// WebSocket address to start with (e.g. `ws://127.0.0.1:9000/ws`).
    #[arg(short, long, env = "WSPROBE_ADDRESS")]
    pub address: Option<String>,

    /// Path to config file (default: `~/.config/wsprobe/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the persistence file (default: `<data dir>/wsprobe/storage.json`).
    #[arg(long, env = "WSPROBE_STORE")]
    pub store: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "WSPROBE_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/wsprobe.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("wsprobe").join("storage.json"))
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("wsprobe").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
