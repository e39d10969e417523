// src/db/mod.rs

//! Database layer for the package cache
//!
//! Parsing every index file on each scan is slow on systems with many
//! sources. `build-cache` stores the parsed index records in SQLite once;
//! a scan pointed at the cache loads them back and adds the live dpkg status.

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use crate::repository::PackageRecord;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Create (or upgrade) a cache database at the specified path
///
/// This is idempotent - calling it on an existing database is safe.
pub fn init(db_path: &Path) -> Result<Connection> {
    debug!("Initializing database at: {}", db_path.display());

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::InitError(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open an existing cache database
pub fn open(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(Error::DatabaseNotFound(db_path.display().to_string()));
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

    let version = schema::get_schema_version(&conn)?;
    if version != schema::SCHEMA_VERSION {
        return Err(Error::InitError(format!(
            "Cache {} has schema version {}, expected {}; rebuild it",
            db_path.display(),
            version,
            schema::SCHEMA_VERSION
        )));
    }

    Ok(conn)
}

/// Replace the cache content with `records` in one transaction
pub fn store_records(conn: &mut Connection, records: &[PackageRecord]) -> Result<usize> {
    let tx = conn.transaction()?;

    let removed = PackageRecord::delete_all(&tx)?;
    debug!("Dropped {} stale records", removed);
    for record in records {
        record.insert(&tx)?;
    }

    tx.commit()?;
    info!("Stored {} package records", records.len());
    Ok(records.len())
}

/// Every record in the cache
pub fn load_records(conn: &Connection) -> Result<Vec<PackageRecord>> {
    let records = PackageRecord::list_all(conn)?;
    debug!("Loaded {} package records from cache", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("cache.db");

        assert!(init(&db_path).is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn test_open_existing_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("cache.db");

        init(&db_path).unwrap();
        assert!(open(&db_path).is_ok());
    }

    #[test]
    fn test_open_nonexistent_database() {
        let result = open(Path::new("/nonexistent/path/db.sqlite"));
        assert!(matches!(result.unwrap_err(), Error::DatabaseNotFound(_)));
    }

    #[test]
    fn test_store_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("cache.db");
        let mut conn = init(&db_path).unwrap();

        store_records(&mut conn, &[PackageRecord::new("old", "1")]).unwrap();
        let stored = store_records(
            &mut conn,
            &[PackageRecord::new("bash", "5.2-1"), PackageRecord::new("dash", "0.5-1")],
        )
        .unwrap();
        assert_eq!(stored, 2);

        let names: Vec<String> = load_records(&open(&db_path).unwrap())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["bash", "dash"]);
    }
}
