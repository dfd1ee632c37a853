//! Shared, session-aware HTTP client for the jbeatda backend.
//!
//! One `ApiClient` is built per process and cloned into every service
//! binding; clones share the connection pool. The bearer token is read from
//! the session at dispatch time, never captured at construction.

use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use super::ApiError;
use crate::auth::{jwt, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Production backend
pub const DEFAULT_BASE_URL: &str = "https://jbeatda.up.railway.app/api/";

/// Time allowed to establish a connection
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Time allowed between reads of a response.
/// 30s allows for slow responses while failing fast enough for good UX.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

/// Idle pooled connections kept per host
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 8;

/// Retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting
const INITIAL_BACKOFF_MS: u64 = 1000;

const USER_AGENT: &str = concat!("jbeatda-core/", env!("CARGO_PKG_VERSION"));

/// Explicit transport configuration for the shared client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_idle_connections: usize,
    pub max_rate_limit_retries: u32,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
        }
    }
}

/// One logical request; may be dispatched several times when rate limited.
struct Call<'a> {
    method: Method,
    path: &'a str,
    body: Option<serde_json::Value>,
    authenticated: bool,
}

impl<'a> Call<'a> {
    fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            body: None,
            authenticated: true,
        }
    }

    fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", self.path, e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Send without a bearer token (login and other public endpoints)
    fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// API client for the jbeatda backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionState,
    max_rate_limit_retries: u32,
}

impl ApiClient {
    /// Build the shared client. Call once per process and clone the result.
    pub fn new(config: &ClientConfig, session: SessionState) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()?;

        info!(base_url = %config.base_url, "API client ready");
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
            max_rate_limit_retries: config.max_rate_limit_retries,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    // ===== Request helpers =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.execute(Call::new(Method::GET, path)).await?;
        decode(path, &text)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self
            .execute(Call::new(Method::POST, path).with_body(body)?)
            .await?;
        decode(path, &text)
    }

    /// POST without attaching the session token
    pub async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self
            .execute(Call::new(Method::POST, path).with_body(body)?.public())
            .await?;
        decode(path, &text)
    }

    /// DELETE, ignoring whatever acknowledgement body comes back
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Call::new(Method::DELETE, path)).await?;
        Ok(())
    }

    // ===== Dispatch =====

    async fn execute(&self, call: Call<'_>) -> Result<String, ApiError> {
        let url = self.endpoint(call.path)?;
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            // Read per attempt: the token may rotate between requests.
            // `stored_token` is whatever was stored at dispatch, usable or
            // not; it decides which session a rejection may clear.
            let (stored_token, sent_token) = if call.authenticated {
                let session = self.session.current_session();
                let sent = session.bearer_token().map(str::to_owned);
                (session.token, sent)
            } else {
                (None, None)
            };

            let mut request = self
                .http
                .request(call.method.clone(), url.clone())
                .header(header::ACCEPT, "application/json");
            if let Some(ref token) = sent_token {
                request = request.bearer_auth(token);
            }
            if let Some(ref body) = call.body {
                request = request.json(body);
            }

            debug!(method = %call.method, url = %url, authenticated = sent_token.is_some(), "Dispatching request");
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS && retries < self.max_rate_limit_retries {
                retries += 1;
                warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            if matches!(err, ApiError::Unauthorized) && call.authenticated {
                self.force_logout(stored_token.as_deref()).await;
            }
            return Err(err);
        }
    }

    /// Drop the session the rejected request was dispatched under. Runs
    /// before the failed call returns, so session observers see the logout
    /// no later than the caller sees the error. A session stored after
    /// dispatch is left alone. Never retries the request.
    async fn force_logout(&self, stored_token: Option<&str>) {
        let Some(token) = stored_token else {
            debug!("Rejected while signed out, nothing to clear");
            return;
        };

        match self.session.clear_session_if(token).await {
            Ok(true) => warn!(
                token = %jwt::fingerprint(token),
                "Backend rejected the session, logged out"
            ),
            Ok(false) => debug!("Rejected session was already cleared"),
            Err(e) => error!(error = %e, "Failed to clear rejected session"),
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::decode(path, e))
}
