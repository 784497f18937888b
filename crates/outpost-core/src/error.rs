//! Error types for the orchestration core.
//!
//! Most failures are local: a slot that cannot be read becomes
//! [`Occupancy::Unknown`](outpost_types::Occupancy::Unknown), a rejected
//! construct becomes a failed execution result, a missing plot becomes a
//! blocked workflow. [`CoreError`] is what remains after those
//! degradations, and only [`CoreError::SessionExpired`] is meant to reach
//! the caller of a workflow.

use crate::config::ConfigError;

/// Errors surfaced by the game client and the workflows built on it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Network failure or server error that persisted through retries.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server kept throttling after the single permitted retry.
    #[error("rate limited while requesting {0}")]
    RateLimited(String),

    /// The page did not have the structure the parser expects.
    #[error("unexpected page layout: {0}")]
    LayoutMismatch(String),

    /// The authenticated session is no longer valid; the caller must log
    /// in again before retrying.
    #[error("session expired; re-authenticate before retrying")]
    SessionExpired,

    /// The requested village is not listed on the account profile.
    #[error("village {0} is not listed on the account profile; run `outpost villages` to see the ids")]
    UnknownVillage(u32),

    /// Configuration is invalid or incomplete.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Whether this error must abort the current workflow run.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::Config(_))
    }
}
