//! Reading store
//!
//! Persists one list of readings per category through a pluggable
//! key-value medium. The store owns the JSON encoding and keeps every saved
//! list ordered newest first.

mod file;
mod memory;
mod sqlite;

use std::cmp::Reverse;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::db::DbError;
use crate::models::{Category, Reading};

pub use file::FileMedium;
pub use memory::MemoryMedium;
pub use sqlite::SqliteMedium;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Stored readings under '{key}' are corrupted: {source}")]
    Corrupted {
        key: String,
        source: serde_json::Error,
    },

    #[error("Storage lock poisoned: {0}")]
    Lock(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Synchronous key-value backend. A successful `write` must replace the
/// previous payload in full; readers never observe a partial write.
pub trait StorageMedium: Send + Sync {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    fn write(&self, key: &str, payload: &str) -> StoreResult<()>;

    /// Removing a missing key succeeds
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Short description for status output
    fn describe(&self) -> String;
}

/// Per-category reading lists over a storage medium
#[derive(Clone)]
pub struct ReadingStore {
    medium: Arc<dyn StorageMedium>,
}

impl ReadingStore {
    pub fn new<M: StorageMedium + 'static>(medium: M) -> Self {
        Self {
            medium: Arc::new(medium),
        }
    }

    pub fn from_medium(medium: Arc<dyn StorageMedium>) -> Self {
        Self { medium }
    }

    pub fn describe(&self) -> String {
        self.medium.describe()
    }

    /// Read a category's list, reporting unreadable or corrupted data
    pub fn load<R: Reading>(&self) -> StoreResult<Vec<R>> {
        let key = R::CATEGORY.storage_key();
        match self.medium.read(key)? {
            None => Ok(Vec::new()),
            Some(payload) => serde_json::from_str(&payload).map_err(|source| StoreError::Corrupted {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Read a category's list. Missing, unreadable or corrupted data all
    /// come back as an empty list.
    pub fn get<R: Reading>(&self) -> Vec<R> {
        match self.load() {
            Ok(readings) => readings,
            Err(e) => {
                warn!(
                    category = R::CATEGORY.as_str(),
                    error = %e,
                    "Could not load readings; treating history as empty"
                );
                Vec::new()
            }
        }
    }

    /// Replace a category's list, sorted newest first
    pub fn save<R: Reading>(&self, mut readings: Vec<R>) -> StoreResult<()> {
        let category = R::CATEGORY;
        sort_newest_first(&mut readings);

        let result = serde_json::to_string(&readings)
            .map_err(StoreError::from)
            .and_then(|payload| self.medium.write(category.storage_key(), &payload));

        match &result {
            Ok(()) => debug!(
                category = category.as_str(),
                count = readings.len(),
                "Saved readings"
            ),
            Err(e) => error!(category = category.as_str(), error = %e, "Failed to save readings"),
        }
        result
    }

    /// Remove every reading in a category. Clearing an empty category succeeds.
    pub fn clear(&self, category: Category) -> StoreResult<()> {
        self.medium.remove(category.storage_key()).map_err(|e| {
            error!(category = category.as_str(), error = %e, "Failed to clear readings");
            e
        })
    }

    /// Remove the reading with `id`. Returns whether anything was removed.
    /// Unreadable history is reported rather than overwritten.
    pub fn delete<R: Reading>(&self, id: &str) -> StoreResult<bool> {
        let mut readings = self.load::<R>()?;
        let before = readings.len();
        readings.retain(|r| r.id() != id);
        if readings.len() == before {
            return Ok(false);
        }
        self.save(readings)?;
        Ok(true)
    }
}

/// Stable sort, newest first. Readings whose timestamp does not parse go
/// last, in their original relative order.
pub fn sort_newest_first<R: Reading>(readings: &mut [R]) {
    readings.sort_by_key(|r| {
        let parsed = r.parsed_timestamp();
        (parsed.is_none(), Reverse(parsed))
    });
}
