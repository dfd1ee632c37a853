use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream;
use tracing::{debug, info, warn};

use super::jwt;
use crate::observe::Subscription;
use crate::store::{SettingsStore, StorageError};

/// Default reserved key holding the raw bearer token
pub const DEFAULT_TOKEN_KEY: &str = "session.token";

/// Default reserved key holding the token expiry (RFC 3339)
pub const DEFAULT_EXPIRY_KEY: &str = "session.expires_at";

/// Names of the reserved settings the session is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub token: String,
    pub expiry: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN_KEY.to_string(),
            expiry: DEFAULT_EXPIRY_KEY.to_string(),
        }
    }
}

/// Point-in-time view of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_authenticated: bool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            token: None,
            expires_at: None,
            is_authenticated: false,
        }
    }

    /// Build a snapshot from the raw settings. Without a token there is no
    /// session at all, so a leftover expiry is ignored.
    fn derive(token: Option<String>, expiry: Option<String>, now: DateTime<Utc>) -> Self {
        let Some(token) = token else {
            return Self::anonymous();
        };

        match expiry {
            None => Self {
                token: Some(token),
                expires_at: None,
                is_authenticated: true,
            },
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(parsed) => {
                    let expires_at = parsed.with_timezone(&Utc);
                    Self {
                        token: Some(token),
                        expires_at: Some(expires_at),
                        is_authenticated: now < expires_at,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Unreadable session expiry, treating session as expired");
                    Self {
                        token: Some(token),
                        expires_at: None,
                        is_authenticated: false,
                    }
                }
            },
        }
    }

    /// Token to present to the backend, if the session is usable
    pub fn bearer_token(&self) -> Option<&str> {
        if self.is_authenticated {
            self.token.as_deref()
        } else {
            None
        }
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|at| at - Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry().map(|d| d.num_minutes().max(0))
    }
}

/// Derived, stateless view of the session over the settings store.
///
/// Holds no copy of the token: every read goes back to the store, and
/// `set_session` / `clear_session` are the only ways the token changes.
/// Clone is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct SessionState {
    store: Arc<SettingsStore>,
    keys: SessionKeys,
}

impl SessionState {
    pub fn new(store: Arc<SettingsStore>, keys: SessionKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Synchronous snapshot for call sites that cannot subscribe
    pub fn current_session(&self) -> Session {
        Session::derive(
            self.store.get(&self.keys.token),
            self.store.get(&self.keys.expiry),
            Utc::now(),
        )
    }

    /// Snapshots re-derived whenever the token or expiry setting changes.
    /// Consecutive identical snapshots are emitted once.
    pub fn observe_session(&self) -> Subscription<Session> {
        let tokens = self.store.observe(&self.keys.token).map(|_| ());
        let expiries = self.store.observe(&self.keys.expiry).map(|_| ());

        // Either key changing triggers a fresh read of both, so the snapshot
        // never pairs a new token with a stale expiry.
        let state = self.clone();
        Subscription::new(stream::select(tokens, expiries))
            .map(move |()| state.current_session())
            .distinct()
    }

    /// Store a new token. The expiry is written first so a fresh login
    /// becomes visible as a single transition.
    pub async fn set_session(
        &self,
        token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        match expires_at {
            Some(at) => self.store.write(&self.keys.expiry, at.to_rfc3339()).await?,
            None => {
                self.store.delete(&self.keys.expiry).await?;
            }
        }
        self.store.write(&self.keys.token, token).await?;

        info!(token = %jwt::fingerprint(token), expires_at = ?expires_at, "Session stored");
        Ok(())
    }

    /// Log out locally. Returns whether a token was actually removed.
    pub async fn clear_session(&self) -> Result<bool, StorageError> {
        let removed = self.store.delete(&self.keys.token).await?;
        self.store.delete(&self.keys.expiry).await?;
        if removed {
            info!("Session cleared");
        }
        Ok(removed)
    }

    /// Clear the session only while it still holds `token`, so a late
    /// rejection of an old token cannot log out a newer session.
    pub async fn clear_session_if(&self, token: &str) -> Result<bool, StorageError> {
        let removed = self.store.delete_if(&self.keys.token, token).await?;
        if removed {
            self.store.delete(&self.keys.expiry).await?;
            info!(token = %jwt::fingerprint(token), "Session cleared after rejection");
        } else {
            debug!(token = %jwt::fingerprint(token), "Session already cleared or rotated");
        }
        Ok(removed)
    }
}
