//! Cache Reclaim Task
//!
//! Background task that periodically evicts stale resolutions, independent
//! of request traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::ResolutionCache;
use crate::host::EventLog;

/// Spawns the reclaimer.
///
/// Every `interval` the task scans the cache and removes entries older than
/// `lifetime`, using the two-pass re-checking eviction of
/// [`ResolutionCache::reclaim`].
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ResolutionCache::new());
/// let handle = spawn_reclaim_task(cache.clone(), lifetime, interval, EventLog::Tracing);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_reclaim_task(
    cache: Arc<ResolutionCache>,
    lifetime: Duration,
    interval: Duration,
    log: EventLog,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        log.info(format_args!(
            "Starting cache reclaim task with interval of {:?}",
            interval
        ));

        loop {
            tokio::time::sleep(interval).await;

            let items = cache.len().await;
            log.debug(format_args!("Cleaning cache (items: {})", items));
            let removed = cache.reclaim(lifetime).await;

            if removed > 0 {
                log.info(format_args!("Removed from cache: {}", removed));
            }
        }
    })
}
