//! HTTP page fetcher.
//!
//! Implements [`PageFetcher`] over `reqwest` for one cookie-authenticated
//! session. Redirects are handled here rather than by `reqwest`: the game
//! acknowledges accepted actions with a redirect to an overview page, and
//! answers an expired session with a redirect to its login page. The first
//! is followed and its landing page returned; the second surfaces as
//! [`FetchError::SessionExpired`].

use std::sync::atomic::{AtomicBool, Ordering};

use outpost_core::config::ServerConfig;
use outpost_core::fetch::{
    Document, FetchError, PageFetcher, PageRequest, SessionStatus, Submission,
};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::error::RunnerError;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("outpost/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed for one request.
const MAX_REDIRECTS: usize = 3;

/// How a response is handled.
#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Page,
    Redirect,
    Error(FetchError),
}

/// `reqwest`-backed fetcher for one session.
pub struct HttpFetcher {
    client: reqwest::Client,
    server: ServerConfig,
    expired: AtomicBool,
}

impl HttpFetcher {
    /// Build a fetcher that sends `cookie` with every request.
    pub fn new(server: &ServerConfig, cookie: &str) -> Result<Self, RunnerError> {
        let mut headers = HeaderMap::new();
        let mut cookie = HeaderValue::from_str(cookie)
            .map_err(|e| RunnerError::Config(format!("invalid session cookie: {e}")))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .timeout(server.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RunnerError::Http(e.to_string()))?;

        let mut server = server.clone();
        server.base_url = server.base_url.trim_end_matches('/').to_owned();
        Ok(Self {
            client,
            server,
            expired: AtomicBool::new(false),
        })
    }

    /// Absolute URL for a server-relative path or an absolute link.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}/{}", self.server.base_url, path.trim_start_matches('/'))
        }
    }

    fn expire(&self) {
        self.expired.store(true, Ordering::Relaxed);
    }

    /// Send `request` and follow non-login redirects with GETs.
    async fn read(&self, mut request: RequestBuilder) -> Result<Document, FetchError> {
        for _ in 0..=MAX_REDIRECTS {
            let response = request
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            let status = response.status();

            match classify(status) {
                Disposition::Page => {
                    let body = response
                        .text()
                        .await
                        .map_err(|e| FetchError::Transport(format!("reading body: {e}")))?;
                    return Ok(Document::new(body));
                }
                Disposition::Redirect => {
                    let Some(location) = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|value| value.to_str().ok())
                        .map(ToOwned::to_owned)
                    else {
                        return Err(FetchError::Status(status.as_u16()));
                    };
                    if self.server.is_login_redirect(&location) {
                        self.expire();
                        warn!(%status, %location, "redirected to login, session expired");
                        return Err(FetchError::SessionExpired);
                    }
                    debug!(%status, %location, "following redirect");
                    request = self.client.get(self.url(&location));
                }
                Disposition::Error(err) => {
                    if err == FetchError::SessionExpired {
                        self.expire();
                        warn!(%status, url = %response.url(), "session rejected by server");
                    }
                    return Err(err);
                }
            }
        }
        Err(FetchError::Transport(format!("more than {MAX_REDIRECTS} redirects")))
    }
}

fn classify(status: StatusCode) -> Disposition {
    if status.is_success() {
        Disposition::Page
    } else if status.is_redirection() {
        Disposition::Redirect
    } else if status == StatusCode::UNAUTHORIZED {
        Disposition::Error(FetchError::SessionExpired)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Disposition::Error(FetchError::RateLimited)
    } else {
        Disposition::Error(FetchError::Status(status.as_u16()))
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Document, FetchError> {
        let url = self.url(&self.server.pages.path_for(request));
        debug!(%url, "GET");
        self.read(self.client.get(&url)).await
    }

    async fn submit(&self, submission: &Submission) -> Result<Document, FetchError> {
        let url = self.url(submission.target());
        match submission {
            Submission::FollowLink { .. } => {
                debug!(%url, "GET (action)");
                self.read(self.client.get(&url)).await
            }
            Submission::PostForm { fields, .. } => {
                debug!(%url, fields = fields.len(), "POST");
                self.read(self.client.post(&url).form(fields)).await
            }
        }
    }

    fn session(&self) -> SessionStatus {
        if self.expired.load(Ordering::Relaxed) {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }
}
