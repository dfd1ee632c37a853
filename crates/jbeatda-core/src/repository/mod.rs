//! Domain-level operations over the typed services.
//!
//! Repositories own the caching policy: cached data is served immediately
//! through a `Subscription`, refreshed from the network on request, and kept
//! when a refresh fails. Results are `RepositoryError`-tagged so consumers
//! never see transport or storage types.

pub mod account;
pub mod error;
pub mod stamps;

pub use account::{Account, AccountRepository, PROFILE_CACHE_KEY};
pub use error::RepositoryError;
pub use stamps::{StampRepository, STAMPS_CACHE_KEY};
