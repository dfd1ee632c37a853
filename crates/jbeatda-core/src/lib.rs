//! jbeatda-core - session and data-access core for the jbeatda client.
//!
//! This crate provides the non-UI pieces shared by every front end:
//! - `store`: durable, observable key-value settings
//! - `auth`: the session derived from those settings, plus keychain credentials
//! - `api`: the shared, token-attaching HTTP client and typed service bindings
//! - `cache`: cached resources kept in the settings store
//! - `repository`: cache-then-network domain operations
//! - `context`: the composition root wiring all of the above
//!
//! Front ends build one `AppContext` and consume its repositories through
//! `Subscription`s and one-shot async calls.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod models;
pub mod observe;
pub mod repository;
pub mod store;

pub use api::{ApiClient, ApiError, ClientConfig};
pub use auth::{CredentialStore, Session, SessionKeys, SessionState};
pub use cache::CachedData;
pub use config::Config;
pub use context::AppContext;
pub use observe::Subscription;
pub use repository::{Account, AccountRepository, RepositoryError, StampRepository};
pub use store::{SettingsStore, StorageError};
