//! Runner configuration from the environment.
//!
//! Game-level settings live in `outpost.yaml`; this covers what differs per
//! operator and invocation: where that file is, the session cookie, the log
//! format and the task record file.

use std::path::{Path, PathBuf};

use outpost_core::config::OutpostConfig;
use tracing::info;

use crate::error::RunnerError;

/// File loaded when no configuration path is given and it exists.
const DEFAULT_CONFIG_FILE: &str = "outpost.yaml";

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Path of the YAML configuration.
    pub config_path: Option<PathBuf>,
    /// `Cookie` header value of an authenticated game session.
    pub session_cookie: Option<String>,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    /// Append task records to this file as JSON lines.
    pub record_path: Option<PathBuf>,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `OUTPOST_CONFIG` -- path to the YAML configuration
    /// - `OUTPOST_SESSION_COOKIE` -- session cookie header value
    /// - `OUTPOST_LOG_JSON` -- `true` for JSON log output (default `false`)
    /// - `OUTPOST_RECORD_PATH` -- task record file
    pub fn from_env() -> Result<Self, RunnerError> {
        let log_json: bool = std::env::var("OUTPOST_LOG_JSON")
            .unwrap_or_else(|_| "false".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid OUTPOST_LOG_JSON: {e}")))?;

        Ok(Self {
            config_path: non_empty_var("OUTPOST_CONFIG").map(PathBuf::from),
            session_cookie: non_empty_var("OUTPOST_SESSION_COOKIE"),
            log_json,
            record_path: non_empty_var("OUTPOST_RECORD_PATH").map(PathBuf::from),
        })
    }

    /// The session cookie, required by every command that talks to the
    /// game.
    pub fn require_cookie(&self) -> Result<String, RunnerError> {
        self.session_cookie.clone().ok_or_else(|| {
            RunnerError::Config(String::from(
                "OUTPOST_SESSION_COOKIE is not set; log in and export the session cookie",
            ))
        })
    }

    /// Load the game configuration.
    ///
    /// Uses the configured path, else `outpost.yaml` in the working
    /// directory when present, else built-in defaults.
    pub fn load_outpost_config(&self) -> Result<OutpostConfig, RunnerError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let path = match &self.config_path {
            Some(path) => Some(path.as_path()),
            None if default_path.exists() => Some(default_path),
            None => None,
        };

        let config = match path {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                OutpostConfig::from_file(path)?
            }
            None => {
                info!("no configuration file, using defaults");
                OutpostConfig::parse("{}")?
            }
        };
        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
