use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;

use super::db;
use super::scan::Scan;

/// Shared handle to the scan database.
///
/// SQLite calls block, so each operation runs on the blocking pool while
/// holding the connection lock.
#[derive(Clone)]
pub struct ScanStore {
    conn: Arc<Mutex<Connection>>,
}

impl ScanStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(db::open_db(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        db::init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("database lock poisoned"))?;
            f(&guard)
        })
        .await
        .context("database task failed")?
    }

    pub async fn insert(&self, scan: Scan) -> Result<()> {
        self.with_conn(move |conn| db::insert_scan(conn, &scan)).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Scan>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| db::list_scans(conn, &user_id)).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Scan>> {
        let id = id.to_string();
        self.with_conn(move |conn| db::get_scan(conn, &id)).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| db::delete_scan(conn, &id)).await
    }
}
