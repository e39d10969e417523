// src/db/models.rs

//! Row mapping for cached package records

use crate::error::Result;
use crate::repository::PackageRecord;
use rusqlite::{Connection, Row, params};

const COLUMNS: &str = "name, version, architecture, priority, pre_depends, depends, \
                       recommends, suggests, conflicts, breaks, provides, installed";

impl PackageRecord {
    /// Insert this record into the cache
    pub fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute(
            &format!(
                "INSERT INTO package_records ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                COLUMNS
            ),
            params![
                &self.name,
                &self.version,
                &self.architecture,
                &self.priority,
                &self.pre_depends,
                &self.depends,
                &self.recommends,
                &self.suggests,
                &self.conflicts,
                &self.breaks,
                &self.provides,
                self.installed,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All cached records in insertion order
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM package_records ORDER BY id",
            COLUMNS
        ))?;

        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Drop every cached record
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM package_records", [])?)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            version: row.get(1)?,
            architecture: row.get(2)?,
            priority: row.get(3)?,
            pre_depends: row.get(4)?,
            depends: row.get(5)?,
            recommends: row.get(6)?,
            suggests: row.get(7)?,
            conflicts: row.get(8)?,
            breaks: row.get(9)?,
            provides: row.get(10)?,
            installed: row.get(11)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        schema::migrate(&conn).unwrap();
        (temp_file, conn)
    }

    #[test]
    fn test_record_insert_and_list() {
        let (_temp, conn) = create_test_db();

        let mut record = PackageRecord::new("coreutils", "9.1-1");
        record.priority = Some("required".to_string());
        record.pre_depends = Some("libc6 (>= 2.34)".to_string());
        record.installed = true;
        record.insert(&conn).unwrap();
        PackageRecord::new("hello", "2.10-3").insert(&conn).unwrap();

        let records = PackageRecord::list_all(&conn).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record);
        assert!(!records[1].installed);
        assert!(records[1].depends.is_none());
    }

    #[test]
    fn test_delete_all() {
        let (_temp, conn) = create_test_db();
        PackageRecord::new("hello", "2.10-3").insert(&conn).unwrap();

        assert_eq!(PackageRecord::delete_all(&conn).unwrap(), 1);
        assert!(PackageRecord::list_all(&conn).unwrap().is_empty());
    }
}
