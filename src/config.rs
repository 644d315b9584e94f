//! Runtime configuration
//!
//! Read once at startup from environment variables:
//!
//! - `HEALTHLOG_STORAGE`: `sqlite` (default), `file` or `memory`
//! - `HEALTHLOG_DATABASE_PATH`: SQLite file for the `sqlite` medium
//! - `HEALTHLOG_DATA_DIR`: directory for the `file` medium
//! - `HEALTHLOG_DUPLICATE_WINDOW_MINUTES`: duplicate time window (default 1)

use std::path::PathBuf;

use tracing::warn;

use crate::duplicates::DuplicateCheckOptions;
use crate::store::{FileMedium, MemoryMedium, ReadingStore, SqliteMedium, StoreResult};

pub const ENV_STORAGE: &str = "HEALTHLOG_STORAGE";
pub const ENV_DATABASE_PATH: &str = "HEALTHLOG_DATABASE_PATH";
pub const ENV_DATA_DIR: &str = "HEALTHLOG_DATA_DIR";
pub const ENV_DUPLICATE_WINDOW: &str = "HEALTHLOG_DUPLICATE_WINDOW_MINUTES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Sqlite(PathBuf),
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub duplicate_options: DuplicateCheckOptions,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or invalid values use defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = default_data_dir();

        let storage = match lookup(ENV_STORAGE).as_deref().map(str::trim) {
            None | Some("") | Some("sqlite") => StorageConfig::Sqlite(
                lookup(ENV_DATABASE_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join("healthlog.db")),
            ),
            Some("file") => StorageConfig::File(
                lookup(ENV_DATA_DIR)
                    .map(PathBuf::from)
                    .unwrap_or(data_dir),
            ),
            Some("memory") => StorageConfig::Memory,
            Some(other) => {
                warn!(value = other, "Unknown {}; using sqlite", ENV_STORAGE);
                StorageConfig::Sqlite(data_dir.join("healthlog.db"))
            }
        };

        let duplicate_options = match lookup(ENV_DUPLICATE_WINDOW) {
            None => DuplicateCheckOptions::default(),
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(minutes) if minutes.is_finite() && minutes >= 0.0 => {
                    DuplicateCheckOptions::with_time_window_minutes(minutes)
                }
                _ => {
                    warn!(value = %raw, "Invalid {}; using default", ENV_DUPLICATE_WINDOW);
                    DuplicateCheckOptions::default()
                }
            },
        };

        Self {
            storage,
            duplicate_options,
        }
    }

    /// Open the configured reading store, creating directories as needed
    pub fn open_store(&self) -> StoreResult<ReadingStore> {
        match &self.storage {
            StorageConfig::Sqlite(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(ReadingStore::new(SqliteMedium::open(path)?))
            }
            StorageConfig::File(dir) => Ok(ReadingStore::new(FileMedium::new(dir))),
            StorageConfig::Memory => Ok(ReadingStore::new(MemoryMedium::new())),
        }
    }

    /// Database file, when SQLite backs the store
    pub fn database_path(&self) -> Option<&PathBuf> {
        match &self.storage {
            StorageConfig::Sqlite(path) => Some(path),
            _ => None,
        }
    }
}

/// `data/` next to the project root when run from `target/{debug,release}`,
/// otherwise next to the executable
fn default_data_dir() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(project_root) = path.parent().and_then(|target| target.parent()) {
            path = project_root.to_path_buf();
        }
    }

    path.join("data")
}
