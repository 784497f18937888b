//! Typed game client.
//!
//! [`GameClient`] wraps a [`PageFetcher`] with the request discipline every
//! workflow shares: a fixed pause before each request, one wait-and-retry
//! on an explicit rate-limit signal, bounded exponential backoff on
//! transport failures, and a session check before anything is sent. It
//! hands back typed pages from [`document`](crate::document) so no
//! workflow ever touches HTML.

use std::time::Duration;

use outpost_types::{PositionId, SlotPosition, VillageSummary};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::document::{self, CultureOverview, MapTilePage, ResidencePage, SlotPage};
use crate::error::CoreError;
use crate::fetch::{Document, FetchError, PageFetcher, PageRequest, SessionStatus, Submission};

/// A request as seen by the retry loop.
#[derive(Clone, Copy)]
enum Call<'a> {
    Read(&'a PageRequest),
    Write(&'a Submission),
}

impl core::fmt::Display for Call<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Read(request) => write!(f, "{request}"),
            Self::Write(submission) => write!(f, "submit {}", submission.target()),
        }
    }
}

/// Paced, retrying access to the game's pages for one session.
pub struct GameClient<F> {
    fetcher: F,
    server: ServerConfig,
}

impl<F: PageFetcher> GameClient<F> {
    /// Wrap a fetcher with the given pacing and retry settings.
    pub const fn new(fetcher: F, server: ServerConfig) -> Self {
        Self { fetcher, server }
    }

    /// The underlying fetcher.
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Unwrap the underlying fetcher.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Server settings in effect.
    pub const fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Fail fast when the collaborator reports an expired session.
    pub fn ensure_session(&self) -> Result<(), CoreError> {
        match self.fetcher.session() {
            SessionStatus::Active => Ok(()),
            SessionStatus::Expired => Err(CoreError::SessionExpired),
        }
    }

    /// Read a page, applying pacing and retries.
    pub async fn fetch(&self, request: &PageRequest) -> Result<Document, CoreError> {
        self.send(Call::Read(request)).await
    }

    /// Perform a side-effecting request.
    ///
    /// Rate-limit signals are retried once like reads. Transport failures
    /// are not retried: the server may already have applied the action.
    pub async fn perform(&self, submission: &Submission) -> Result<Document, CoreError> {
        self.send(Call::Write(submission)).await
    }

    /// Read and classify one slot.
    pub async fn slot(&self, position: SlotPosition) -> Result<SlotPage, CoreError> {
        let page = self.fetch(&PageRequest::Slot(position)).await?;
        document::parse_slot(position, &page)
    }

    /// Read and classify one map tile.
    pub async fn map_tile(&self, id: PositionId) -> Result<MapTilePage, CoreError> {
        let page = self.fetch(&PageRequest::MapTile(id)).await?;
        document::parse_map_tile(&page)
    }

    /// Villages listed on the account profile, in listing order.
    pub async fn villages(&self) -> Result<Vec<VillageSummary>, CoreError> {
        let page = self.fetch(&PageRequest::Profile).await?;
        document::parse_profile(&page)
    }

    /// Make `village_id` the active village for every later request.
    ///
    /// The id must be listed on the account profile; the listing entry is
    /// returned.
    pub async fn switch_village(&self, village_id: u32) -> Result<VillageSummary, CoreError> {
        let village = self
            .villages()
            .await?
            .into_iter()
            .find(|village| village.village_id == village_id)
            .ok_or(CoreError::UnknownVillage(village_id))?;

        let href = self.server.pages.switch_village_href(village_id);
        self.perform(&Submission::FollowLink { href }).await?;
        info!(village_id, name = %village.name, at = %village.coordinate, "active village switched");
        Ok(village)
    }

    /// Culture points and village switcher from the statistics page.
    pub async fn culture_overview(&self) -> Result<CultureOverview, CoreError> {
        let page = self.fetch(&PageRequest::Culture).await?;
        document::parse_culture_overview(&page)
    }

    /// Read the residence page on `position`.
    pub async fn residence(&self, position: SlotPosition) -> Result<ResidencePage, CoreError> {
        let page = self.fetch(&PageRequest::Slot(position)).await?;
        document::parse_residence(&page)
    }

    /// The celebration action offered by the town hall on `position`.
    pub async fn celebration(
        &self,
        position: SlotPosition,
    ) -> Result<Option<Submission>, CoreError> {
        let request = PageRequest::Slot(position);
        let page = self.fetch(&request).await?;
        document::parse_celebration(&page, &self.server.pages.path_for(&request))
    }

    async fn send(&self, call: Call<'_>) -> Result<Document, CoreError> {
        self.ensure_session()?;

        let mut rate_limited = false;
        let mut transport_attempts: u32 = 0;
        loop {
            tokio::time::sleep(self.server.request_delay()).await;
            debug!(request = %call, "sending request");

            let result = match call {
                Call::Read(request) => self.fetcher.fetch(request).await,
                Call::Write(submission) => self.fetcher.submit(submission).await,
            };

            match result {
                Ok(page) => return Ok(page),
                Err(FetchError::SessionExpired) => return Err(CoreError::SessionExpired),
                Err(FetchError::RateLimited) if !rate_limited => {
                    rate_limited = true;
                    warn!(
                        request = %call,
                        wait_ms = self.server.rate_limit_wait_ms,
                        "rate limited, waiting before the single retry"
                    );
                    tokio::time::sleep(self.server.rate_limit_wait()).await;
                }
                Err(FetchError::RateLimited) => {
                    return Err(CoreError::RateLimited(call.to_string()));
                }
                Err(err)
                    if matches!(call, Call::Read(_))
                        && err.is_retryable()
                        && transport_attempts < self.server.transport_retries =>
                {
                    transport_attempts = transport_attempts.saturating_add(1);
                    let delay = self.backoff(transport_attempts);
                    warn!(
                        request = %call,
                        error = %err,
                        attempt = transport_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transport failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(CoreError::Transport(format!("{call}: {err}"))),
            }
        }
    }

    /// Exponential delay for the given retry attempt, with up to 50% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.server.backoff_base_ms;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter = if base > 1 {
            rand::rng().random_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}
