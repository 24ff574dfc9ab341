//! # Last-Write-Wins Merge
//!
//! Merge rule for the client's offline copies. The server copy is the
//! source of truth; the local copy only fills gaps while offline.
//!
//! ```text
//!   local  : [A@10, B@20, C@5]
//!   remote : [B@15, A@10, D@1]
//!   merged : [B@20, A@10, D@1, C@5]
//!             │     │            └── local-only, kept
//!             │     └── tie: remote wins
//!             └── local strictly newer: local wins
//! ```

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::types::{InventoryItem, PatientRecord};

/// An entity that can be merged by id and modification time.
pub trait Versioned {
    /// Stable identity key.
    fn key(&self) -> &str;

    /// Last modification time.
    fn version(&self) -> DateTime<Utc>;
}

impl Versioned for PatientRecord {
    fn key(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Versioned for InventoryItem {
    fn key(&self) -> &str {
        &self.name
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Merges `remote` into `local`.
///
/// Output keeps the remote ordering, followed by entries only present
/// locally. For a key present on both sides, the remote copy wins unless
/// the local copy is strictly newer.
pub fn merge_last_write_wins<T: Versioned + Clone>(local: &[T], remote: &[T]) -> Vec<T> {
    let local_by_key: HashMap<&str, &T> = local.iter().map(|e| (e.key(), e)).collect();

    let mut merged: Vec<T> = remote
        .iter()
        .map(|r| match local_by_key.get(r.key()) {
            Some(l) if l.version() > r.version() => (*l).clone(),
            _ => r.clone(),
        })
        .collect();

    let remote_keys: HashSet<&str> = remote.iter().map(|r| r.key()).collect();
    merged.extend(local.iter().filter(|l| !remote_keys.contains(l.key())).cloned());

    merged
}
