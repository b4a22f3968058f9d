//! Local persistence for session credentials and reservations.
//!
//! The store is a flat string key-value mapping. Each key is written
//! independently; there are no transactions across keys. The reservation
//! list is always written in full, never appended to.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::NumberRequest;
use crate::{Error, Result};

const STORE_FILENAME: &str = "store.json";
const LOCK_FILENAME: &str = "store.lock";
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Logical slots in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Remembered account identifier.
    Username,
    /// Remembered secret key.
    ApiKey,
    /// Remember-me flag, `"true"` or `"false"`.
    Remember,
    /// Serialized reservation list.
    Requests,
}

impl StoreKey {
    /// Every key, used for bulk clearing.
    pub const ALL: [Self; 4] = [Self::Username, Self::ApiKey, Self::Remember, Self::Requests];

    /// Namespaced key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Username => "session.username",
            Self::ApiKey => "session.api_key",
            Self::Remember => "session.remember",
            Self::Requests => "tracker.requests",
        }
    }
}

/// Durable string key-value storage with injectable backing.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key was never set or was removed.
    fn get(&self, key: StoreKey) -> Result<Option<String>>;
    /// Overwrite a value.
    fn set(&self, key: StoreKey, value: &str) -> Result<()>;
    /// Delete a value. Removing an absent key is not an error.
    fn remove(&self, key: StoreKey) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: StoreKey) -> Result<()> {
        (**self).remove(key)
    }
}

/// Process-local store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(key.as_str()).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: StoreKey) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key.as_str());
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default = "default_schema_version")]
    schema_version: u32,
    #[serde(default)]
    entries: HashMap<String, String>,
}

const fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// JSON file store under the data directory.
///
/// Every operation takes an exclusive lock on a sidecar lock file so that two
/// processes never interleave a read-modify-write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Storage(format!("Failed to create data directory: {e}")))?;
        Ok(Self { dir })
    }

    /// Open the store in the default data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::data_dir()?)
    }

    /// Path of the JSON file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILENAME)
    }

    fn locked<T>(&self, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILENAME))
            .map_err(|e| Error::Storage(format!("Failed to open store lock: {e}")))?;
        lock.lock_exclusive()
            .map_err(|e| Error::Storage(format!("Failed to lock store: {e}")))?;
        let result = f(&self.path());
        if let Err(e) = FileExt::unlock(&lock) {
            warn!("failed to unlock store: {e}");
        }
        result
    }

    fn read_file(path: &Path) -> StoreFile {
        match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<StoreFile>(&bytes) {
                Ok(file) if file.schema_version == CURRENT_SCHEMA_VERSION => file,
                Ok(file) => {
                    warn!(
                        "store schema version {} unsupported; resetting store",
                        file.schema_version
                    );
                    StoreFile::default()
                },
                Err(err) => {
                    warn!("failed to parse store at {}: {err}", path.display());
                    StoreFile::default()
                },
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => {
                warn!("failed to read store at {}: {err}", path.display());
                StoreFile::default()
            },
        }
    }

    fn write_file(path: &Path, file: &StoreFile) -> Result<()> {
        let data = serde_json::to_vec_pretty(file)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .map_err(|e| Error::Storage(format!("Failed to write store: {e}")))?;
        fs::rename(&tmp, path)
            .map_err(|e| Error::Storage(format!("Failed to replace store: {e}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>> {
        self.locked(|path| Ok(Self::read_file(path).entries.remove(key.as_str())))
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        self.locked(|path| {
            let mut file = Self::read_file(path);
            file.entries
                .insert(key.as_str().to_string(), value.to_string());
            Self::write_file(path, &file)
        })
    }

    fn remove(&self, key: StoreKey) -> Result<()> {
        self.locked(|path| {
            let mut file = Self::read_file(path);
            if file.entries.remove(key.as_str()).is_some() {
                Self::write_file(path, &file)?;
            }
            Ok(())
        })
    }
}

/// Write the full reservation list.
pub fn save_requests<S: KeyValueStore + ?Sized>(store: &S, records: &[NumberRequest]) -> Result<()> {
    let json = serde_json::to_string(records)?;
    store.set(StoreKey::Requests, &json)?;
    debug!(count = records.len(), "persisted reservations");
    Ok(())
}

/// Read the reservation list, recomputing countdowns at `now_millis`.
///
/// Unreadable data is logged and treated as an empty list.
pub fn load_requests<S: KeyValueStore + ?Sized>(
    store: &S,
    now_millis: i64,
) -> Result<Vec<NumberRequest>> {
    let Some(raw) = store.get(StoreKey::Requests)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<NumberRequest>>(&raw) {
        Ok(records) => Ok(records
            .into_iter()
            .map(|record| record.restored(now_millis))
            .collect()),
        Err(err) => {
            warn!("ignoring unreadable stored reservations: {err}");
            Ok(Vec::new())
        },
    }
}
