use crate::errors::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::{env, path::Path, path::PathBuf};
use tokio::fs;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// String-keyed, string-valued persistence, the shape of browser local storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

pub fn resolve_data_path() -> Result<PathBuf, std::io::Error> {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(PathBuf::from("data/state.json"))
}

/// Decodes the JSON value under `key`. `Ok(None)` when the key is absent.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, serde_json::Error> {
    match store.get(key) {
        Some(raw) => serde_json::from_str(&raw).map(Some),
        None => Ok(None),
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let payload = serde_json::to_string(value)?;
    store.set(key, payload)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Keeps every entry in memory. Each mutation hands a snapshot of the whole
/// map to a writer task, which rewrites the JSON file through a temporary
/// file and a rename. Snapshots queued while a write is running collapse
/// into the newest one.
#[derive(Debug)]
pub struct FileStorage {
    entries: BTreeMap<String, String>,
    version: u64,
    snapshots: watch::Sender<Snapshot>,
    written: watch::Receiver<u64>,
    writer: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    version: u64,
    payload: Arc<Vec<u8>>,
}

impl FileStorage {
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let entries = match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    error!("failed to parse data file {}: {err}", path.display());
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StorageError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let (snapshots, pending) = watch::channel(Snapshot::default());
        let (done, written) = watch::channel(0);
        let writer = tokio::spawn(write_behind(path.to_path_buf(), pending, done));

        debug!("opened {} with {} keys", path.display(), entries.len());
        Ok(Self {
            entries,
            version: 0,
            snapshots,
            written,
            writer: Some(writer),
        })
    }

    /// Waits until every mutation made so far has reached the file.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let target = self.version;
        let mut written = self.written.clone();
        written
            .wait_for(|version| *version >= target)
            .await
            .map(|_| ())
            .map_err(|_| StorageError::WriterStopped)
    }

    /// Hands out the writer task. It ends once the storage is dropped and
    /// the last snapshot is on disk.
    pub fn take_writer(&mut self) -> Option<JoinHandle<()>> {
        self.writer.take()
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let payload = serde_json::to_vec_pretty(&self.entries)?;
        self.version += 1;
        self.snapshots.send_replace(Snapshot {
            version: self.version,
            payload: Arc::new(payload),
        });
        Ok(())
    }
}

async fn write_behind(
    path: PathBuf,
    mut pending: watch::Receiver<Snapshot>,
    written: watch::Sender<u64>,
) {
    while pending.changed().await.is_ok() {
        let snapshot = pending.borrow_and_update().clone();
        if let Err(err) = write_file(&path, &snapshot.payload).await {
            error!("failed to persist data file: {err}");
        }
        written.send_replace(snapshot.version);
    }
    debug!("storage writer for {} stopped", path.display());
}

async fn write_file(path: &Path, payload: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload)
        .await
        .map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
    fs::rename(&tmp, path)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
