use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::scan::Scan;
use super::store::ScanStore;

/// Save a finished scan in the background.
///
/// Failures and timeouts are logged and dropped; the caller never waits on
/// the write. The handle is returned so tests can await completion.
pub fn spawn_save(store: ScanStore, scan: Scan, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = scan.id.clone();
        let user = scan.user_id.clone();

        match tokio::time::timeout(timeout, store.insert(scan)).await {
            Ok(Ok(())) => info!(scan_id = %id, user = %user, "scan saved"),
            Ok(Err(e)) => error!(
                scan_id = %id,
                user = %user,
                error = %format!("{e:#}"),
                "failed to save scan"
            ),
            Err(_) => error!(
                scan_id = %id,
                user = %user,
                ?timeout,
                "timed out saving scan"
            ),
        }
    })
}
