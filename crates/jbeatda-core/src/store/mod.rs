//! Durable, reactive key-value settings store.
//!
//! This module provides the `SettingsStore`, the process-wide owner of all
//! persisted client state. Each setting is a `(key, value)` string pair
//! stored in its own JSON file, so:
//!
//! - writes to different keys never contend with each other
//! - writes to the same key are serialized and applied in call order
//! - every committed write or delete is pushed to observers of that key
//!
//! The session token, its expiry and the repository caches all live here.

pub mod error;
pub mod settings;

pub use error::StorageError;
pub use settings::SettingsStore;
