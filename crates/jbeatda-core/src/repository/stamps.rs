use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::RepositoryError;
use crate::api::{ApiError, StampService};
use crate::cache::{CachedData, ResourceCache};
use crate::models::Stamp;
use crate::observe::Subscription;
use crate::store::SettingsStore;

/// Setting holding the cached stamp list
pub const STAMPS_CACHE_KEY: &str = "cache.stamps";

/// The user's stamps, served cache-first.
pub struct StampRepository<S> {
    service: S,
    cache: ResourceCache<Vec<Stamp>>,
    /// Held across every cache update so a delete's read-filter-write cannot
    /// interleave with a refresh's write.
    cache_lock: Mutex<()>,
}

impl<S: StampService> StampRepository<S> {
    pub fn new(service: S, store: Arc<SettingsStore>) -> Self {
        Self {
            service,
            cache: ResourceCache::new(store, STAMPS_CACHE_KEY),
            cache_lock: Mutex::new(()),
        }
    }

    /// Cached list immediately, then again after every refresh or delete.
    pub fn stamps(&self) -> Subscription<Option<CachedData<Vec<Stamp>>>> {
        self.cache.observe()
    }

    pub fn cached_stamps(&self) -> Option<CachedData<Vec<Stamp>>> {
        self.cache.load()
    }

    pub fn cache_age(&self) -> String {
        self.cache.age_display()
    }

    /// Fetch from the server and replace the cache. On failure the cache is
    /// left untouched and the error is returned.
    pub async fn refresh_stamps(&self) -> Result<Vec<Stamp>, RepositoryError> {
        let stamps = match self.service.my_stamps().await {
            Ok(stamps) => stamps,
            // The backend reports "no stamps yet" as a 404
            Err(ApiError::NotFound(detail)) => {
                debug!(detail = %detail, "Server has no stamps for this user");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, cached = self.cache.load().is_some(), "Stamp refresh failed, keeping cache");
                return Err(e.into());
            }
        };

        {
            let _guard = self.cache_lock.lock().await;
            self.cache.save(&stamps).await?;
        }
        info!(count = stamps.len(), "Stamps refreshed");
        Ok(stamps)
    }

    pub async fn stamp_for_menu(&self, menu_id: i64) -> Result<Stamp, RepositoryError> {
        Ok(self.service.stamp_for_menu(menu_id).await?)
    }

    /// Delete on the server, then drop the stamp from the cached list.
    pub async fn delete_stamp(&self, stamp_id: i64) -> Result<(), RepositoryError> {
        self.service.delete_stamp(stamp_id).await?;

        let _guard = self.cache_lock.lock().await;
        if let Some(cached) = self.cache.load() {
            let before = cached.data.len();
            let remaining: Vec<Stamp> = cached
                .data
                .into_iter()
                .filter(|stamp| stamp.stamp_id != stamp_id)
                .collect();
            if remaining.len() != before {
                self.cache.save(&remaining).await?;
            }
        }
        info!(stamp_id, "Stamp removed");
        Ok(())
    }
}
