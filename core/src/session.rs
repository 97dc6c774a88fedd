//! Persisted session id.
//!
//! The id lives under a single key of a small key-value store. On startup the
//! stored id is restored, or a new one is minted and written back. Starting a
//! new chat overwrites it.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::errors::{MedQueryError, MedQueryResult};

/// Key holding the session id
pub const SESSION_KEY: &str = "ds_session_id";

const FALLBACK_ID_LEN: usize = 11;

/// String key-value storage that survives restarts
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> MedQueryResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> MedQueryResult<()>;
}

/// Key-value store backed by a JSON object on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> MedQueryResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            MedQueryError::StorageError(format!(
                "Failed to parse storage file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> MedQueryResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> MedQueryResult<()> {
        // An unreadable file is replaced rather than blocking the write
        let mut entries = self.read_all().unwrap_or_else(|e| {
            warn!("Discarding unreadable storage: {}", e);
            HashMap::new()
        });
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

/// In-process store, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> MedQueryResult<Option<String>> {
        let entries = self.entries.lock().map_err(|e| {
            MedQueryError::StorageError(format!("Failed to acquire lock: {}", e))
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> MedQueryResult<()> {
        let mut entries = self.entries.lock().map_err(|e| {
            MedQueryError::StorageError(format!("Failed to acquire lock: {}", e))
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Generates a session id: a v4 UUID from OS randomness, or a short base-36
/// string from a time-seeded generator when the OS source fails.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(e) => {
            warn!("OS randomness unavailable ({}), using fallback session id", e);
            fallback_session_id()
        }
    }
}

fn fallback_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut rng = SmallRng::seed_from_u64(nanos ^ u64::from(std::process::id()));
    (0..FALLBACK_ID_LEN)
        .map(|_| char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'))
        .collect()
}

/// A session id that still has to be written to the store.
///
/// Writes carry a sequence number and an older write never overwrites a newer
/// one, so pending writes may be saved in any order.
#[must_use = "the session id is only persisted once the write is saved"]
pub struct PendingWrite {
    store: Arc<dyn KeyValueStore>,
    written: Arc<Mutex<u64>>,
    seq: u64,
    id: String,
}

impl PendingWrite {
    /// Writes on the calling thread
    pub fn save_blocking(self) {
        let mut written = match self.written.lock() {
            Ok(written) => written,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *written >= self.seq {
            debug!("Skipping superseded session id write {}", self.id);
            return;
        }
        match self.store.set(SESSION_KEY, &self.id) {
            Ok(()) => *written = self.seq,
            Err(e) => warn!("Failed to persist session id: {}", e),
        }
    }

    /// Writes on the blocking pool so async callers never wait on file I/O
    pub async fn save(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.save_blocking()).await {
            warn!("Session id write did not complete: {}", e);
        }
    }
}

/// Owns the current session id and keeps it in sync with the store
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    current: Option<String>,
    next_seq: u64,
    written: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &self.current)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// A manager that has not touched the store yet
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            current: None,
            next_seq: 1,
            written: Arc::new(Mutex::new(0)),
        }
    }

    /// Restores the stored id, creating and persisting one if there is none
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut manager = Self::new(store);
        match manager.store.get(SESSION_KEY) {
            Ok(Some(id)) if !id.is_empty() => {
                info!("Restored session id {}", id);
                manager.current = Some(id);
            }
            Ok(_) => {
                manager.ensure();
            }
            Err(e) => {
                warn!("Failed to read stored session id: {}", e);
                manager.ensure();
            }
        }
        manager
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Returns the current id, minting and persisting one if missing
    pub fn ensure(&mut self) -> String {
        let (id, write) = self.ensure_deferred();
        if let Some(write) = write {
            write.save_blocking();
        }
        id
    }

    /// Replaces the current id with a fresh one and persists it
    pub fn regenerate(&mut self) -> String {
        let (id, write) = self.regenerate_deferred();
        write.save_blocking();
        id
    }

    /// Like [`ensure`](Self::ensure) but leaves the store write to the caller
    pub fn ensure_deferred(&mut self) -> (String, Option<PendingWrite>) {
        match &self.current {
            Some(id) => (id.clone(), None),
            None => {
                let (id, write) = self.regenerate_deferred();
                (id, Some(write))
            }
        }
    }

    /// Like [`regenerate`](Self::regenerate) but leaves the store write to the caller
    pub fn regenerate_deferred(&mut self) -> (String, PendingWrite) {
        let id = generate_session_id();
        debug!("Created session id {}", id);
        self.current = Some(id.clone());

        let write = PendingWrite {
            store: self.store.clone(),
            written: self.written.clone(),
            seq: self.next_seq,
            id: id.clone(),
        };
        self.next_seq += 1;
        (id, write)
    }
}
