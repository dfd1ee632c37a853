//! Local caching for offline data access.
//!
//! Cached resources are JSON `CachedData<T>` values stored as ordinary
//! settings under `cache.<resource>` keys, so the settings store stays the
//! only writer of durable state. Data is considered stale after 60 minutes.

pub mod cached;
pub mod resource;

pub use cached::CachedData;
pub use resource::ResourceCache;
