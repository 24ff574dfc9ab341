//! # Offline Cache
//!
//! Last known server copies of the inventory and the patient list, kept as
//! one JSON file per entity class.
//!
//! ```text
//! <data dir>/cache/
//!   ├── inventory.json   [InventoryItem, ...]
//!   └── patients.json    [PatientRecord, ...]
//! ```
//!
//! Writes go to a temp file and are renamed into place, so a crash never
//! leaves a half-written cache behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use hms_core::cache::{merge_last_write_wins, Versioned};

use crate::error::{ClientError, ClientResult};

/// Which file an entity class lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEntity {
    Inventory,
    Patients,
}

impl CacheEntity {
    pub fn file_name(&self) -> &'static str {
        match self {
            CacheEntity::Inventory => "inventory.json",
            CacheEntity::Patients => "patients.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfflineCache {
    dir: PathBuf,
    // Serializes read-merge-write cycles from clones of this cache.
    write_lock: Arc<Mutex<()>>,
}

impl OfflineCache {
    /// A cache rooted at `dir`. The directory is created on first write.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        OfflineCache {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// A cache under the platform data directory.
    pub fn default_location() -> ClientResult<Self> {
        directories::ProjectDirs::from("com", "hms", "hms")
            .map(|dirs| Self::at(dirs.data_dir().join("cache")))
            .ok_or_else(|| ClientError::Cache("no home directory for the offline cache".to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, entity: CacheEntity) -> PathBuf {
        self.dir.join(entity.file_name())
    }

    /// Reads the cached copy. A missing file is an empty cache.
    pub async fn load<T: DeserializeOwned>(&self, entity: CacheEntity) -> ClientResult<Vec<T>> {
        let path = self.path(entity);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the cached copy.
    pub async fn store<T: Serialize>(&self, entity: CacheEntity, entries: &[T]) -> ClientResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(entity, entries).await
    }

    /// Merges `remote` into the cached copy and returns the merged list.
    ///
    /// For an entity present in both, the cached copy survives only when
    /// its `updatedAt` is strictly newer.
    pub async fn merge<T>(&self, entity: CacheEntity, remote: &[T]) -> ClientResult<Vec<T>>
    where
        T: Versioned + Clone + Serialize + DeserializeOwned,
    {
        let _guard = self.write_lock.lock().await;

        let local: Vec<T> = match self.load(entity).await {
            Ok(local) => local,
            Err(e) => {
                warn!(entity = entity.file_name(), error = %e, "Discarding unreadable cache file");
                Vec::new()
            }
        };

        let merged = merge_last_write_wins(&local, remote);
        self.write(entity, &merged).await?;
        debug!(entity = entity.file_name(), entries = merged.len(), "Cache updated");
        Ok(merged)
    }

    async fn write<T: Serialize>(&self, entity: CacheEntity, entries: &[T]) -> ClientResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path(entity);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
