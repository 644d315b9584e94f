//! SQLite medium: each key is a row in `reading_lists`

use std::path::Path;

use rusqlite::{params, OptionalExtension};

use super::{StorageMedium, StoreResult};
use crate::db::{migrations, Database, DbError};

#[derive(Clone)]
pub struct SqliteMedium {
    database: Database,
}

impl SqliteMedium {
    /// Wrap an already migrated database
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Open the database file and run migrations
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let database = Database::new(path)?;
        database.with_conn(migrations::run_migrations)?;
        Ok(Self::new(database))
    }
}

impl StorageMedium for SqliteMedium {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let payload = self.database.with_conn(|conn| {
            conn.query_row(
                "SELECT payload FROM reading_lists WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(DbError::from)
        })?;
        Ok(payload)
    }

    fn write(&self, key: &str, payload: &str) -> StoreResult<()> {
        self.database.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO reading_lists (key, payload, updated_at)
                VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
                "#,
                params![key, payload],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.database.with_conn(|conn| {
            conn.execute("DELETE FROM reading_lists WHERE key = ?1", [key])?;
            Ok(())
        })?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite ({})", self.database.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodPressureReading, Category};
    use crate::store::ReadingStore;

    fn bp(id: &str, timestamp: &str, systolic: u16) -> BloodPressureReading {
        BloodPressureReading {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            systolic,
            diastolic: 80,
            pulse: None,
            notes: None,
            medication: Some("Amlodipine 5mg".into()),
            symptoms: None,
            location: None,
        }
    }

    #[test]
    fn test_sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthlog.db");
        let store = ReadingStore::new(SqliteMedium::open(&path).unwrap());

        store
            .save(vec![
                bp("t", "2024-05-01T08:00:00Z", 120),
                bp("t_plus_1h", "2024-05-01T09:00:00Z", 125),
                bp("t_minus_1h", "2024-05-01T07:00:00Z", 130),
            ])
            .unwrap();

        let reopened = ReadingStore::new(SqliteMedium::open(&path).unwrap());
        let ids: Vec<String> = reopened
            .get::<BloodPressureReading>()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["t_plus_1h", "t", "t_minus_1h"]);
    }

    #[test]
    fn test_sqlite_overwrite_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let medium = SqliteMedium::open(dir.path().join("healthlog.db")).unwrap();

        medium.write("bp_readings", "[]").unwrap();
        medium.write("bp_readings", "[1]").unwrap();
        assert_eq!(medium.read("bp_readings").unwrap().as_deref(), Some("[1]"));

        let store = ReadingStore::new(medium.clone());
        store.clear(Category::BloodPressure).unwrap();
        store.clear(Category::BloodPressure).unwrap();
        assert_eq!(medium.read("bp_readings").unwrap(), None);
    }
}
