//! File-backed state store: one JSON document per session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plank_protocol::SessionKey;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{Field, StateStore, StoreError};

type Partition = BTreeMap<Field, String>;

/// A [`StateStore`] that keeps each session in `<dir>/<session key>.json`.
///
/// Writes go to a temporary file which is then renamed over the document,
/// so a crash mid-write leaves either the old or the new document, never a
/// torn one.
pub struct FileStateStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on documents.
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Opens (and creates, if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(dir = %dir.display(), "file state store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// The directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &SessionKey) -> Result<PathBuf, StoreError> {
        let valid = !key.as_str().is_empty()
            && key
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.clone()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    async fn read_partition(&self, key: &SessionKey, path: &Path) -> Result<Partition, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Partition::new());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })
    }

    async fn write_partition(&self, path: &Path, partition: &Partition) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(partition)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    async fn get(&self, key: &SessionKey, field: Field) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        let mut partition = self.read_partition(key, &path).await?;
        Ok(partition.remove(&field))
    }

    async fn put(&self, key: &SessionKey, field: Field, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        let mut partition = self.read_partition(key, &path).await?;
        partition.insert(field, value);
        self.write_partition(&path, &partition).await?;
        tracing::trace!(session_key = %key, ?field, "field persisted");
        Ok(())
    }
}
