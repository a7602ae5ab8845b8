//! Durable persistence for query snapshots
//!
//! [`SlotStore`] is the narrow contract over a browser-storage-shaped
//! backend: string keys, string values, last write wins. The crate ships an
//! in-memory store for tests and demos and a file-backed store for native
//! embeddings. [`QueryStateStore`] sits on top and owns the snapshot
//! envelope and the fixed session key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{StorageError, StoreError, StoreResult};
use crate::session::{ListenerId, QuerySession};

/// Key the query snapshot lives under unless the embedder overrides it.
pub const DEFAULT_SESSION_KEY: &str = "querydeck-session-query";

// ============================================================================
// Snapshot envelope
// ============================================================================

/// Persisted record of a session: the query payload plus its dirty flag.
///
/// The wire shape is fixed: `{"modified": <bool>, "query": <engine JSON>}`.
/// The inner query value is stored verbatim and only validated against the
/// engine's loadability contract when it is loaded back into a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Dirty flag at save time
    pub modified: bool,
    /// Engine-defined query definition
    pub query: Value,
}

// ============================================================================
// SlotStore backends
// ============================================================================

/// A durable key-value slot.
///
/// Writes are whole-value replacements; there is no merging and no
/// concurrency control beyond last write wins, matching the semantics of
/// the browser storage this mirrors.
pub trait SlotStore: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any prior value.
    fn write_slot(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory slot store. Useful for tests and demos.
#[derive(Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current slot contents, for inspection in tests.
    pub fn contents(&self) -> HashMap<String, String> {
        self.slots.lock().unwrap().clone()
    }
}

impl SlotStore for MemorySlotStore {
    fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.lock().unwrap().get(key).cloned())
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed slot store: one file per key under a base directory.
///
/// Writes go through a temp file and an atomic rename so a crash mid-write
/// never leaves a torn snapshot behind. Concurrent writers to the same
/// directory are not locked against each other; like the browser storage
/// this mirrors, the last completed write wins.
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    /// Store slots under `dir`. The directory is created on first write.
    /// Keys must be filename-safe; the fixed session key is.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SlotStore for FileSlotStore {
    fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.slot_path(key);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

// ============================================================================
// QueryStateStore
// ============================================================================

/// Persists the query session to one fixed slot and reads it back later.
///
/// Every save serializes the whole session state and overwrites the slot
/// unconditionally; there is no debouncing and no delta encoding. Browser
/// storage quotas start at megabytes while query definitions are kilobytes,
/// so write amplification is a non-issue at this payload size.
pub struct QueryStateStore<S: SlotStore> {
    slot: S,
    key: String,
}

impl<S: SlotStore> QueryStateStore<S> {
    /// Store snapshots under [`DEFAULT_SESSION_KEY`].
    pub fn new(slot: S) -> Self {
        Self::with_key(slot, DEFAULT_SESSION_KEY)
    }

    /// Store snapshots under a custom key. Embedders hosting several
    /// builder instances on one origin give each its own key.
    pub fn with_key(slot: S, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    /// Get the slot key this store writes to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialize the session's payload and dirty flag and overwrite the
    /// slot. An encoding fault surfaces without touching the slot, so the
    /// previously stored snapshot stays readable.
    pub fn save(&self, session: &QuerySession) -> StoreResult<()> {
        let snapshot = Snapshot {
            modified: session.is_modified(),
            query: session.payload().clone(),
        };
        self.write_snapshot(&snapshot)
    }

    /// Write an already-built snapshot envelope to the slot.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let encoded = serde_json::to_string(snapshot).map_err(StoreError::Encode)?;
        self.slot.write_slot(&self.key, &encoded)?;
        tracing::debug!(key = %self.key, modified = snapshot.modified, "query snapshot persisted");
        Ok(())
    }

    /// Read the slot. An absent slot is `Ok(None)`, not an error. A present
    /// but malformed envelope is [`StoreError::Decode`]; the slot itself is
    /// left untouched for post-mortem inspection.
    pub fn load(&self) -> StoreResult<Option<Snapshot>> {
        let Some(raw) = self.slot.read_slot(&self.key)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&raw).map_err(StoreError::Decode)?;
        Ok(Some(snapshot))
    }

    /// Wire the save-on-change listener: every change notification from the
    /// session overwrites the slot with the state carried on the event.
    /// Write failures are logged and swallowed; a broken backend must not
    /// take the editing session down with it.
    pub fn attach(store: &Arc<Self>, session: &mut QuerySession) -> ListenerId
    where
        S: 'static,
    {
        let store = Arc::clone(store);
        session.on_change(move |event| {
            let snapshot = Snapshot {
                modified: event.modified,
                query: event.query.clone(),
            };
            if let Err(err) = store.write_snapshot(&snapshot) {
                tracing::error!(key = %store.key, error = %err, "failed to persist query snapshot");
            }
        })
    }
}
