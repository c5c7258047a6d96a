//! Configuration for the server and the controller.
//!
//! The controller reads an optional TOML file; command-line flags override
//! individual fields afterwards. Every field has a default, so an empty file
//! is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::Params;
use crate::{AppError, Result};

fn default_listen_addr() -> String {
    "0.0.0.0:8030".into()
}

fn default_server_addr() -> String {
    "localhost:8030".into()
}

fn default_turns() -> usize {
    1_000_000_000
}

fn default_dimension() -> usize {
    512
}

fn default_tick_interval_ms() -> u64 {
    2000
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}

/// Server settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Address the coordinator listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl ServerConfig {
    /// Listen on all interfaces at `port`.
    ///
    /// Accepts both `8030` and the `:8030` form.
    #[must_use]
    pub fn for_port(port: &str) -> Self {
        let port = port.trim_start_matches(':');
        Self {
            listen_addr: format!("0.0.0.0:{port}"),
        }
    }
}

/// Controller session settings, loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Coordinator address, `host:port`.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Generations to compute.
    #[serde(default = "default_turns")]
    pub turns: usize,
    /// Grid width.
    #[serde(default = "default_dimension")]
    pub width: usize,
    /// Grid height.
    #[serde(default = "default_dimension")]
    pub height: usize,
    /// Milliseconds between progress polls.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Directory holding `<width>x<height>.pgm` input images.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    /// Directory snapshots are written into.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            turns: default_turns(),
            width: default_dimension(),
            height: default_dimension(),
            tick_interval_ms: default_tick_interval_ms(),
            image_dir: default_image_dir(),
            out_dir: default_out_dir(),
        }
    }
}

impl SessionConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges. Call again after applying overrides.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(AppError::Config("server_addr must not be empty".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(AppError::Config(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        self.params()
            .validate()
            .map_err(|err| AppError::Config(err.message().to_owned()))
    }

    /// Run parameters described by this configuration.
    #[must_use]
    pub fn params(&self) -> Params {
        Params::new(self.turns, self.width, self.height)
    }

    /// Poll period.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
