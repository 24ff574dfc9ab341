//! # Store Selection
//!
//! Decides once, at startup, which adapter serves the process.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mode = memory ──────────────────────────────────► MemoryStore          │
//! │                                                                         │
//! │  mode = sqlite ── try url[0], url[1], ... ─┬─ ok ─► SqliteStore         │
//! │                                            └─ none ► ConnectionFailed   │
//! │                                                                         │
//! │  mode = auto   ── try url[0], url[1], ... ─┬─ ok ─► SqliteStore         │
//! │                                            └─ none ► MemoryStore (warn) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Seeding runs right after selection when `seed_on_empty` is set. In auto
//! mode a SQLite store that cannot be seeded is abandoned for a fresh
//! memory store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{DbError, StoreResult};
use crate::memory::MemoryStore;
use crate::pool::DbConfig;
use crate::seed::seed_if_empty;
use crate::sqlite::SqliteStore;
use crate::store::Store;

/// Configured storage mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePreference {
    /// SQLite if any candidate connects, memory otherwise.
    #[default]
    Auto,
    Sqlite,
    Memory,
}

impl fmt::Display for StoragePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoragePreference::Auto => write!(f, "auto"),
            StoragePreference::Sqlite => write!(f, "sqlite"),
            StoragePreference::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoragePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(StoragePreference::Auto),
            "sqlite" => Ok(StoragePreference::Sqlite),
            "memory" => Ok(StoragePreference::Memory),
            other => Err(format!(
                "unknown storage mode '{other}' (expected auto, sqlite or memory)"
            )),
        }
    }
}

/// `[storage]` section of the server config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub mode: StoragePreference,
    /// Candidate database URLs, tried in order.
    pub database_urls: Vec<String>,
    pub connect_timeout_secs: u64,
    /// Load demo data into empty collections at startup.
    pub seed_on_empty: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            mode: StoragePreference::Auto,
            database_urls: vec!["sqlite://hms.db".to_string()],
            connect_timeout_secs: 5,
            seed_on_empty: true,
        }
    }
}

impl StorageSettings {
    /// Settings for a memory-only store.
    pub fn memory() -> Self {
        StorageSettings {
            mode: StoragePreference::Memory,
            database_urls: Vec::new(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Tries each candidate URL in order; the first that connects and
/// migrates wins.
async fn connect_first(settings: &StorageSettings) -> StoreResult<SqliteStore> {
    let mut failures = Vec::new();

    for url in &settings.database_urls {
        let config = DbConfig::new(url.as_str()).connect_timeout(settings.connect_timeout());
        match SqliteStore::connect(config).await {
            Ok(store) => {
                info!(url = %url, "Connected to database");
                return Ok(store);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Database candidate unavailable");
                failures.push(format!("{url}: {e}"));
            }
        }
    }

    if failures.is_empty() {
        return Err(DbError::ConnectionFailed("no database URLs configured".to_string()).into());
    }
    Err(DbError::ConnectionFailed(failures.join("; ")).into())
}

async fn fresh_memory(settings: &StorageSettings) -> StoreResult<Arc<dyn Store>> {
    let store = MemoryStore::new();
    if settings.seed_on_empty {
        seed_if_empty(&store, Utc::now()).await?;
    }
    Ok(Arc::new(store))
}

/// Chooses, connects and (optionally) seeds the process store.
///
/// ## Errors
/// - `ConnectionFailed` in `sqlite` mode when no candidate works
/// - Any seeding error in `sqlite` mode
pub async fn select_store(settings: &StorageSettings) -> StoreResult<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match settings.mode {
        StoragePreference::Memory => return log_mode(fresh_memory(settings).await?),

        StoragePreference::Sqlite => Arc::new(connect_first(settings).await?),

        StoragePreference::Auto => match connect_first(settings).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(error = %e, "No database reachable, falling back to in-memory store");
                return log_mode(fresh_memory(settings).await?);
            }
        },
    };

    if settings.seed_on_empty {
        if let Err(e) = seed_if_empty(store.as_ref(), Utc::now()).await {
            if settings.mode == StoragePreference::Sqlite {
                return Err(e);
            }
            error!(error = %e, "Seeding database failed, falling back to in-memory store");
            return log_mode(fresh_memory(settings).await?);
        }
    }

    log_mode(store)
}

fn log_mode(store: Arc<dyn Store>) -> StoreResult<Arc<dyn Store>> {
    info!(mode = %store.mode(), "{}", store.mode().label());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageMode;

    fn unreachable() -> String {
        "sqlite:///nonexistent-dir/definitely/missing/hms.db".to_string()
    }

    #[tokio::test]
    async fn test_memory_mode_is_seeded() {
        let store = select_store(&StorageSettings::memory()).await.unwrap();
        assert_eq!(store.mode(), StorageMode::Memory);
        assert_eq!(store.list_items().await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_first_working_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hms.db");

        let settings = StorageSettings {
            mode: StoragePreference::Sqlite,
            database_urls: vec![unreachable(), path.to_string_lossy().into_owned()],
            connect_timeout_secs: 1,
            seed_on_empty: false,
        };

        let store = select_store(&settings).await.unwrap();
        assert_eq!(store.mode(), StorageMode::Sqlite);
        assert!(store.list_items().await.unwrap().is_empty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_sqlite_mode_fails_without_candidates() {
        let settings = StorageSettings {
            mode: StoragePreference::Sqlite,
            database_urls: vec![unreachable()],
            connect_timeout_secs: 1,
            seed_on_empty: true,
        };

        let err = select_store(&settings).await.err().unwrap();
        assert!(matches!(
            err,
            crate::error::StoreError::Database(DbError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_mode_falls_back_to_memory() {
        let settings = StorageSettings {
            database_urls: vec![unreachable()],
            connect_timeout_secs: 1,
            ..StorageSettings::default()
        };

        let store = select_store(&settings).await.unwrap();
        assert_eq!(store.mode(), StorageMode::Memory);
        assert_eq!(store.list_users().await.unwrap().len(), 4);
    }

    #[test]
    fn test_preference_parsing() {
        assert_eq!("SQLite".parse::<StoragePreference>(), Ok(StoragePreference::Sqlite));
        assert_eq!(" memory ".parse::<StoragePreference>(), Ok(StoragePreference::Memory));
        assert!("mongo".parse::<StoragePreference>().is_err());
    }
}
