//! Authentication state for the client.
//!
//! This module provides:
//! - `SessionState`: the derived, store-backed view of "is the user logged in"
//! - `Session`: an immutable snapshot of that state
//! - `CredentialStore`: remembered passwords in the OS keychain
//! - `jwt`: expiry extraction from backend-issued tokens
//!
//! The token itself lives only in the settings store; nothing here caches it.

pub mod credentials;
pub mod jwt;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionKeys, SessionState};
