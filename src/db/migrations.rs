//! Schema migrations

use rusqlite::Connection;
use tracing::info;

use super::connection::DbResult;

const SCHEMA_VERSION: i32 = 1;

/// Bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        info!(version = 1, "Applied schema migration");
    }

    Ok(())
}

/// Migration v1: one JSON list per category key
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE reading_lists (
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,         -- JSON array, newest first
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

pub fn is_current(conn: &Connection) -> DbResult<bool> {
    Ok(get_schema_version(conn)? >= SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(is_current(&conn).unwrap());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM reading_lists", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
