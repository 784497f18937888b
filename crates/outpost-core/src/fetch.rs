//! The page fetcher seam.
//!
//! Fetching pages and posting forms belongs to an external collaborator
//! that owns the session cookies and the HTTP client. The core only needs
//! the [`PageFetcher`] trait: logical page requests in, raw documents out.
//! All interpretation of those documents happens in
//! [`document`](crate::document).

use std::future::Future;

use outpost_types::{PositionId, SlotPosition};

use crate::config::PageConfig;

/// A page the core wants to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRequest {
    /// Detail page of one village slot.
    Slot(SlotPosition),
    /// Detail page of one world map tile.
    MapTile(PositionId),
    /// Account profile with the village table.
    Profile,
    /// Page showing accumulated culture points.
    Culture,
}

impl core::fmt::Display for PageRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Slot(position) => write!(f, "slot {position}"),
            Self::MapTile(id) => write!(f, "map tile {id}"),
            Self::Profile => f.write_str("profile"),
            Self::Culture => f.write_str("culture overview"),
        }
    }
}

impl PageConfig {
    /// Server-relative path for a logical page.
    pub fn path_for(&self, request: &PageRequest) -> String {
        match request {
            PageRequest::Slot(position) => self.slot.replace("{id}", &position.to_string()),
            PageRequest::MapTile(id) => self.map_tile.replace("{id}", &id.to_string()),
            PageRequest::Profile => self.profile.clone(),
            PageRequest::Culture => self.culture.clone(),
        }
    }

    /// Link that makes `village_id` the active village.
    pub fn switch_village_href(&self, village_id: u32) -> String {
        self.switch_village.replace("{id}", &village_id.to_string())
    }
}

/// A side-effecting request: construct, upgrade, train, celebrate, settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Follow an action link scraped from a page (GET with side effects).
    FollowLink {
        /// Server-relative link target.
        href: String,
    },
    /// Post a form.
    PostForm {
        /// Server-relative form action.
        action: String,
        /// Form fields in submission order.
        fields: Vec<(String, String)>,
    },
}

impl Submission {
    /// Server-relative target of the request.
    pub fn target(&self) -> &str {
        match self {
            Self::FollowLink { href } => href,
            Self::PostForm { action, .. } => action,
        }
    }
}

/// A fetched page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    body: String,
}

impl Document {
    /// Wrap a page body.
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// The raw HTML.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Whether the collaborator still holds a usable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Credentials are present and believed valid.
    Active,
    /// The session has expired or was never established.
    Expired,
}

/// Failures reported by a [`PageFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, TLS or timeout failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The server answered with an explicit throttling signal.
    #[error("rate limited by server")]
    RateLimited,
    /// The server redirected to login or otherwise rejected the session.
    #[error("session expired")]
    SessionExpired,
    /// Any other unsuccessful HTTP status.
    #[error("server returned HTTP {0}")]
    Status(u16),
}

impl FetchError {
    /// Whether a transport-level retry might help.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            Self::RateLimited | Self::SessionExpired => false,
        }
    }
}

/// Reads pages and submits actions on behalf of one authenticated session.
///
/// Implementations own the HTTP client and cookies. They must not retry
/// on their own; pacing and retries are applied by
/// [`GameClient`](crate::client::GameClient).
pub trait PageFetcher: Send + Sync {
    /// Read a page. Must be free of game-side effects.
    fn fetch(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Document, FetchError>> + Send;

    /// Perform a side-effecting request and return the resulting page.
    fn submit(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<Document, FetchError>> + Send;

    /// Current session state. Never triggers a login.
    fn session(&self) -> SessionStatus;
}
