use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use super::scan::Scan;

/// Open (or create) the SQLite database at `path`.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("Failed to set database pragmas")?;

    init_schema(&conn)?;
    Ok(conn)
}

/// Create tables if they don't exist. Idempotent.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS scans (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            image_url TEXT NOT NULL,
            product_name TEXT,
            analysis_result TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS scans_user_created
            ON scans (user_id, created_at DESC);",
    )
    .context("Failed to initialize database schema")?;

    Ok(())
}

// Fixed-width UTC timestamps sort lexicographically in time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<Scan> {
    let created: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Scan {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image_url: row.get(2)?,
        product_name: row.get(3)?,
        analysis_result: row.get(4)?,
        created_at,
    })
}

const SELECT_SCAN: &str =
    "SELECT id, user_id, image_url, product_name, analysis_result, created_at FROM scans";

pub fn insert_scan(conn: &Connection, scan: &Scan) -> Result<()> {
    conn.execute(
        "INSERT INTO scans (id, user_id, image_url, product_name, analysis_result, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            scan.id,
            scan.user_id,
            scan.image_url,
            scan.product_name,
            scan.analysis_result,
            format_timestamp(&scan.created_at),
        ],
    )
    .with_context(|| format!("Failed to insert scan {}", scan.id))?;

    Ok(())
}

/// All scans owned by `user_id`, newest first.
pub fn list_scans(conn: &Connection, user_id: &str) -> Result<Vec<Scan>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_SCAN} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .context("Failed to prepare scan listing")?;

    let scans = stmt
        .query_map([user_id], scan_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list scans")?;

    Ok(scans)
}

pub fn get_scan(conn: &Connection, id: &str) -> Result<Option<Scan>> {
    conn.query_row(&format!("{SELECT_SCAN} WHERE id = ?1"), [id], scan_from_row)
        .optional()
        .with_context(|| format!("Failed to load scan {id}"))
}

/// Remove a scan. Returns whether a row was deleted.
pub fn delete_scan(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM scans WHERE id = ?1", [id])
        .with_context(|| format!("Failed to delete scan {id}"))?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scan::PLACEHOLDER_IMAGE;
    use chrono::Duration;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn sample_scan(user: &str, text: &str) -> Scan {
        Scan::new(user, PLACEHOLDER_IMAGE, text.to_string())
    }

    #[test]
    fn insert_and_get() {
        let conn = test_db();
        let scan = sample_scan("user_a", "HEADLINE: Granola\nVERDICT: buy");
        insert_scan(&conn, &scan).unwrap();

        let loaded = get_scan(&conn, &scan.id).unwrap().unwrap();
        assert_eq!(loaded.user_id, "user_a");
        assert_eq!(loaded.product_name.as_deref(), Some("Granola"));
        assert_eq!(loaded.analysis_result, scan.analysis_result);
        // Stored at microsecond precision
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            scan.created_at.timestamp_micros()
        );
    }

    #[test]
    fn get_missing_is_none() {
        let conn = test_db();
        assert!(get_scan(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_id_rejected() {
        let conn = test_db();
        let scan = sample_scan("u", "x");
        insert_scan(&conn, &scan).unwrap();
        assert!(insert_scan(&conn, &scan).is_err());
    }

    #[test]
    fn list_newest_first_and_scoped_to_user() {
        let conn = test_db();
        let now = Utc::now();

        for (i, name) in ["First", "Second", "Third"].iter().enumerate() {
            let mut scan = sample_scan("user_a", &format!("HEADLINE: {name}"));
            scan.created_at = now + Duration::seconds(i as i64);
            insert_scan(&conn, &scan).unwrap();
        }
        insert_scan(&conn, &sample_scan("user_b", "HEADLINE: Other")).unwrap();

        let listed = list_scans(&conn, "user_a").unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.display_name()).collect();
        assert_eq!(names, vec!["Third", "Second", "First"]);

        assert_eq!(list_scans(&conn, "user_b").unwrap().len(), 1);
        assert!(list_scans(&conn, "user_c").unwrap().is_empty());
    }

    #[test]
    fn delete_reports_removal() {
        let conn = test_db();
        let scan = sample_scan("u", "x");
        insert_scan(&conn, &scan).unwrap();

        assert!(delete_scan(&conn, &scan.id).unwrap());
        assert!(get_scan(&conn, &scan.id).unwrap().is_none());
        assert!(!delete_scan(&conn, &scan.id).unwrap());
    }

    #[test]
    fn open_creates_parent_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/quickpick.db");
        let conn = open_db(&path).unwrap();
        insert_scan(&conn, &sample_scan("u", "x")).unwrap();
        drop(conn);

        // Reopening keeps the data and the schema init stays idempotent
        let conn = open_db(&path).unwrap();
        assert_eq!(list_scans(&conn, "u").unwrap().len(), 1);
    }
}
