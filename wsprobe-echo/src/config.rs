//! Configuration for the echo server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/wsprobe-echo/config.toml`)
//! 4. Compiled defaults

use std::path::PathBuf;

use crate::server::EchoOptions;

/// Errors that can occur when loading echo server configuration.
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

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct EchoConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    wrap: Option<bool>,
}

/// CLI arguments for the echo server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "WebSocket echo server for wsprobe")]
pub struct EchoCliArgs {
    /// Address to bind the server to.
    #[arg(short, long, env = "WSPROBE_ECHO_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/wsprobe-echo/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Wrap echoed frames as `{"echo": ..., "received_at": ...}`.
    #[arg(short, long)]
    pub wrap: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "WSPROBE_ECHO_LOG")]
    pub log_level: String,
}

/// Fully resolved echo server configuration.
#[derive(Debug, Clone)]
pub struct EchoConfig {
    /// Address to bind the server to (e.g., `127.0.0.1:9000`).
    pub bind_addr: String,
    /// Wrap echoed text frames in a JSON envelope.
    pub wrap: bool,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            wrap: false,
            log_level: "info".to_string(),
        }
    }
}

impl EchoConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// An explicit `--config` path that does not exist is an error; a missing
    /// default file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &EchoCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default. `--wrap` can only switch wrapping on.
    fn resolve(cli: &EchoCliArgs, file: &EchoConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            wrap: cli.wrap || file.server.wrap.unwrap_or(defaults.wrap),
            log_level: cli.log_level.clone(),
        }
    }

    /// The echo behavior this configuration asks for.
    #[must_use]
    pub const fn options(&self) -> EchoOptions {
        EchoOptions { wrap: self.wrap }
    }
}

fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<EchoConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(EchoConfigFile::default());
        };
        config_dir.join("wsprobe-echo").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EchoConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
