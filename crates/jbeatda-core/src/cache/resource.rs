use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::CachedData;
use crate::observe::Subscription;
use crate::store::{SettingsStore, StorageError};

/// One cached resource, stored as a single setting.
///
/// The cache never touches disk itself; saving is an ordinary store write,
/// so observers of the resource are notified like any other setting.
pub struct ResourceCache<T> {
    store: Arc<SettingsStore>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> ResourceCache<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    pub fn new(store: Arc<SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cached value, if present and readable
    pub fn load(&self) -> Option<CachedData<T>> {
        self.store
            .get(&self.key)
            .and_then(|raw| decode(&self.key, &raw))
    }

    pub async fn save(&self, data: &T) -> Result<(), StorageError> {
        let cached = CachedData::new(data);
        let raw = serde_json::to_string(&cached).map_err(|source| StorageError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.store.write(&self.key, raw).await
    }

    pub async fn clear(&self) -> Result<bool, StorageError> {
        self.store.delete(&self.key).await
    }

    /// Current cached value immediately, then every change to it
    pub fn observe(&self) -> Subscription<Option<CachedData<T>>> {
        let key = self.key.clone();
        self.store
            .observe(&self.key)
            .map(move |raw| raw.and_then(|raw| decode(&key, &raw)))
    }

    pub fn age_display(&self) -> String {
        self.load()
            .map(|cached| cached.age_display())
            .unwrap_or_else(|| "never".to_string())
    }
}

/// An unreadable entry (e.g. left by an older build) is treated as a miss.
fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<CachedData<T>> {
    match serde_json::from_str(raw) {
        Ok(cached) => Some(cached),
        Err(e) => {
            debug!(key = %key, error = %e, "Ignoring unreadable cache entry");
            None
        }
    }
}
