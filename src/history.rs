//! Local scan history commands, run directly against the database file.

use anyhow::{bail, Result};
use rusqlite::Connection;

use crate::storage::{db, Scan, ScanSummary};

pub fn list(conn: &Connection, user_id: &str) -> Result<Vec<ScanSummary>> {
    let scans = db::list_scans(conn, user_id)?;
    Ok(scans.iter().map(ScanSummary::from).collect())
}

/// Fetch one of `user_id`'s scans. Other users' scans read as missing.
pub fn show(conn: &Connection, user_id: &str, id: &str) -> Result<Scan> {
    match db::get_scan(conn, id)? {
        Some(scan) if scan.is_owned_by(user_id) => Ok(scan),
        _ => bail!("Scan not found: {id}"),
    }
}

/// Delete with the same ownership rule as the HTTP endpoint.
pub fn delete(conn: &Connection, user_id: &str, id: &str) -> Result<Scan> {
    let Some(scan) = db::get_scan(conn, id)? else {
        bail!("Scan not found: {id}");
    };
    if !scan.is_owned_by(user_id) {
        bail!("Scan {id} belongs to another user");
    }
    db::delete_scan(conn, id)?;
    Ok(scan)
}
