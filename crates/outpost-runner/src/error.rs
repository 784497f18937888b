//! Error types for the runner binary.

use outpost_core::config::ConfigError;
use outpost_core::error::CoreError;

/// Errors that can occur while running a command.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Environment configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The YAML configuration could not be loaded.
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    /// A workflow failed fatally.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The requested preset is not configured.
    #[error("unknown preset {0:?}; run `outpost presets` to list them")]
    UnknownPreset(String),
}
