//! HTTP implementation of the session service.
//!
//! Talks to the backend's session endpoints over JSON: `POST` to the
//! session collection to create, `GET` on a session resource to refresh,
//! `DELETE` on the server-issued href to destroy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Session, SessionCreateStruct};

use super::{ServiceError, SessionService};

/// HTTP request timeout in seconds.
/// 30s allows for slow backends while still failing fast enough.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default path of the session collection under the base URL.
const DEFAULT_SESSIONS_PATH: &str = "/sessions";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// The backend nests the session document under a `Session` key.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "Session")]
    session: Session,
}

/// Session service backed by a reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpSessionService {
    client: Client,
    base_url: String,
    sessions_path: String,
}

impl HttpSessionService {
    /// Create a service against the given base URL, e.g.
    /// `https://api.example.net`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            sessions_path: DEFAULT_SESSIONS_PATH.to_string(),
        })
    }

    /// Override the session collection path (default `/sessions`).
    pub fn with_sessions_path(mut self, path: impl Into<String>) -> Self {
        self.sessions_path = path.into();
        self
    }

    fn sessions_url(&self) -> String {
        format!("{}{}", self.base_url, self.sessions_path)
    }

    /// Check if the response is successful, returning an error with body if
    /// not. `Ok(None)` signals a rate limit that should be retried.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ServiceError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ServiceError::from_status(status, &body))
        }
    }

    /// Send a request, retrying rate-limited responses with exponential
    /// backoff.
    async fn send_with_retry(
        &self,
        url: &str,
        build: impl Fn() -> reqwest::RequestBuilder + Send + Sync,
    ) -> Result<reqwest::Response, ServiceError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ServiceError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn parse_session(response: reqwest::Response) -> Result<Session, ServiceError> {
        let parsed: SessionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        Ok(parsed.session)
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn create_session(
        &self,
        create_struct: &SessionCreateStruct,
    ) -> Result<Session, ServiceError> {
        let url = self.sessions_url();
        let body = serde_json::json!({
            "SessionInput": {
                "login": create_struct.login,
                "password": create_struct.password,
            }
        });

        let response = self
            .send_with_retry(&url, || {
                self.client
                    .post(&url)
                    .header(header::ACCEPT, "application/json")
                    .json(&body)
            })
            .await?;

        let session = Self::parse_session(response).await?;
        debug!(identifier = %session.identifier, "Session created");
        Ok(session)
    }

    async fn refresh_session(&self, session_id: &str) -> Result<Session, ServiceError> {
        let url = format!("{}/{}", self.sessions_url(), session_id);

        let response = self
            .send_with_retry(&url, || {
                self.client.get(&url).header(header::ACCEPT, "application/json")
            })
            .await?;

        let session = Self::parse_session(response).await?;
        debug!(identifier = %session.identifier, "Session refreshed");
        Ok(session)
    }

    async fn delete_session(&self, session_href: &str) -> Result<(), ServiceError> {
        // The href is the server-issued locator, resolved against the base URL
        let url = format!("{}{}", self.base_url, session_href);

        self.send_with_retry(&url, || self.client.delete(&url)).await?;
        debug!(href = session_href, "Session deleted");
        Ok(())
    }
}
