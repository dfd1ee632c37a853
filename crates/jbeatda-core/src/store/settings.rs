use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::StorageError;
use crate::observe::Subscription;

/// Directory (under the data dir) holding one file per setting
const SETTINGS_DIR: &str = "settings";

/// Extension of committed setting files
const RECORD_EXT: &str = "json";

/// Extension of in-flight writes; leftovers are discarded on open
const TEMP_EXT: &str = "json.tmp";

/// Longest key (in bytes) whose hex spelling is used as the file name.
/// Longer keys would exceed the 255-byte file name limit and get a digest.
const MAX_HEX_KEY_BYTES: usize = 100;

/// Emissions buffered per observer before it is considered lagging.
/// A lagging observer is resynced to the current value instead of erroring.
const CHANNEL_CAPACITY: usize = 64;

/// On-disk shape of a single setting
#[derive(Debug, Serialize, Deserialize)]
struct SettingRecord {
    key: String,
    value: String,
    updated_at: DateTime<Utc>,
}

/// Per-key state: committed value, writer lock and change channel.
struct KeySlot {
    write_lock: tokio::sync::Mutex<()>,
    value: Mutex<Option<String>>,
    tx: broadcast::Sender<Option<String>>,
}

impl KeySlot {
    fn new(value: Option<String>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            write_lock: tokio::sync::Mutex::new(()),
            value: Mutex::new(value),
            tx,
        }
    }

    fn current(&self) -> Option<String> {
        lock(&self.value).clone()
    }

    /// Publish a committed value. The value lock is held across the send so a
    /// concurrent `subscribe` sees either the old value plus this emission or
    /// the new value without it, never both.
    fn commit(&self, value: Option<String>) {
        let mut guard = lock(&self.value);
        *guard = value.clone();
        let _ = self.tx.send(value);
    }

    fn subscribe(&self) -> (Option<String>, broadcast::Receiver<Option<String>>) {
        let guard = lock(&self.value);
        (guard.clone(), self.tx.subscribe())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// File-backed settings store with per-key observation.
///
/// Construct one per process (see `AppContext`) and share it behind an `Arc`.
pub struct SettingsStore {
    dir: PathBuf,
    slots: Mutex<HashMap<String, Arc<KeySlot>>>,
}

impl SettingsStore {
    /// Open (or create) the store rooted at `data_dir` and load every
    /// committed setting into memory.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = data_dir.as_ref().join(SETTINGS_DIR);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let mut slots = HashMap::new();
        let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&dir, e))?.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            if name.ends_with(TEMP_EXT) {
                debug!(?path, "Discarding interrupted setting write");
                let _ = fs::remove_file(&path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }

            let contents = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
            let record: SettingRecord =
                serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?;

            if file_name_for(&record.key) != name {
                warn!(?path, key = %record.key, "Setting file name does not match its key, skipping");
                continue;
            }
            slots.insert(record.key, Arc::new(KeySlot::new(Some(record.value))));
        }

        info!(dir = ?dir, count = slots.len(), "Settings store opened");
        Ok(Self {
            dir,
            slots: Mutex::new(slots),
        })
    }

    /// Directory holding the setting files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Slot for `key`, created on first use. Slots are dropped again when
    /// the key is deleted and nobody else holds them; a key that is only
    /// ever observed while absent keeps its slot until the store is dropped.
    fn slot(&self, key: &str) -> Arc<KeySlot> {
        let mut slots = lock(&self.slots);
        Arc::clone(
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(KeySlot::new(None))),
        )
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }

    // ===== Reads =====

    /// Snapshot of the committed value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.slots).get(key).and_then(|slot| slot.current())
    }

    /// Keys that currently hold a value, sorted
    pub fn keys(&self) -> Vec<String> {
        let slots = lock(&self.slots);
        let mut keys: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.current().is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Observe `key`: emits the current value immediately, then once per
    /// committed write or delete, in commit order.
    ///
    /// An observer that falls more than 64 emissions behind skips the
    /// intermediate values and is resynced to the current one; emissions it
    /// does receive are still in commit order.
    pub fn observe(&self, key: &str) -> Subscription<Option<String>> {
        let slot = self.slot(key);
        let (initial, rx) = slot.subscribe();

        let stream = futures::stream::unfold(
            (Some(initial), rx, slot),
            |(pending, mut rx, slot)| async move {
                if let Some(value) = pending {
                    return Some((value, (None, rx, slot)));
                }
                match rx.recv().await {
                    Ok(value) => Some((value, (None, rx, slot))),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Settings observer lagged, resyncing to current value");
                        let (current, fresh) = slot.subscribe();
                        Some((current, (None, fresh, slot)))
                    }
                    // The slot owns the sender, so this only happens on teardown.
                    Err(RecvError::Closed) => None,
                }
            },
        );
        Subscription::new(stream)
    }

    /// Like `observe`, substituting `default` while the key is absent
    pub fn observe_or(&self, key: &str, default: impl Into<String>) -> Subscription<String> {
        let default = default.into();
        self.observe(key)
            .map(move |value| value.unwrap_or_else(|| default.clone()))
    }

    /// Number of live observers of `key`
    pub fn observer_count(&self, key: &str) -> usize {
        lock(&self.slots)
            .get(key)
            .map(|slot| slot.tx.receiver_count())
            .unwrap_or(0)
    }

    // ===== Writes =====

    /// Durably set `key` to `value`. Either the whole value is committed and
    /// observers are notified, or nothing changes.
    pub async fn write(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let value = value.into();
        let slot = self.slot(key);
        let _guard = slot.write_lock.lock().await;

        let record = SettingRecord {
            key: key.to_string(),
            value: value.clone(),
            updated_at: Utc::now(),
        };
        let contents =
            serde_json::to_vec_pretty(&record).map_err(|source| StorageError::Encode {
                key: key.to_string(),
                source,
            })?;

        let path = self.record_path(key);
        run_blocking(path.clone(), move || write_atomically(&path, &contents)).await?;

        slot.commit(Some(value));
        debug!(key = %key, "Setting written");
        Ok(())
    }

    /// Remove `key`. Returns `false` (and notifies nobody) if it was absent.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.delete_matching(key, None).await
    }

    /// Remove `key` only while it still holds `expected`.
    pub async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, StorageError> {
        self.delete_matching(key, Some(expected)).await
    }

    async fn delete_matching(&self, key: &str, expected: Option<&str>) -> Result<bool, StorageError> {
        let slot = self.slot(key);
        let removed = self.remove_locked(key, &slot, expected).await;
        self.prune(key, &slot);
        removed
    }

    async fn remove_locked(
        &self,
        key: &str,
        slot: &KeySlot,
        expected: Option<&str>,
    ) -> Result<bool, StorageError> {
        let _guard = slot.write_lock.lock().await;

        match (slot.current(), expected) {
            (None, _) => return Ok(false),
            (Some(current), Some(expected)) if current != expected => return Ok(false),
            _ => {}
        }

        let path = self.record_path(key);
        run_blocking(path.clone(), move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        })
        .await?;

        slot.commit(None);
        debug!(key = %key, "Setting deleted");
        Ok(true)
    }

    /// Forget the slot of an absent key once only the map and the caller
    /// hold it. `slot()` clones under the same lock, so nobody can pick it
    /// up between the check and the removal.
    fn prune(&self, key: &str, slot: &Arc<KeySlot>) {
        let mut slots = lock(&self.slots);
        let idle = Arc::strong_count(slot) == 2 && slot.tx.receiver_count() == 0;
        if idle && slot.current().is_none() {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        lock(&self.slots).len()
    }
}

/// Keys may contain any character, so file names are the hex of the key
/// bytes (`k` prefix keeps the empty key from becoming a dotfile). Long keys
/// are named by a fixed-length digest (`d` prefix) instead; the record body
/// still carries the full key.
fn file_name_for(key: &str) -> String {
    let mut name = if key.len() <= MAX_HEX_KEY_BYTES {
        let mut name = String::from("k");
        name.extend(key.bytes().map(|b| format!("{:02x}", b)));
        name
    } else {
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes());
        format!("d{}", digest.simple())
    };
    name.push('.');
    name.push_str(RECORD_EXT);
    name
}

/// Write to a temp file, fsync, then rename over the target.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let tmp_path = path.with_extension(TEMP_EXT);

    let result = (|| -> std::io::Result<()> {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(contents)?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::io(path, e));
    }
    Ok(())
}

async fn run_blocking<F>(path: PathBuf, op: F) -> Result<(), StorageError>
where
    F: FnOnce() -> Result<(), StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StorageError::io(path, std::io::Error::other(e)))?
}
