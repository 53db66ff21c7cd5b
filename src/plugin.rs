//! Host Plugin Entry
//!
//! Lifecycle hook for gateway processes that embed the avatar endpoint in
//! their own router.

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;

use crate::api::{attach, AppState};
use crate::config::Config;
use crate::host::Gateway;
use crate::lookup::AccountStore;
use crate::tasks::spawn_reclaim_task;

/// Starts the service inside a host.
///
/// Origin decisions and logging are delegated to `gateway`. Returns the
/// host router extended with the avatar endpoint, and the reclaimer handle
/// the host should abort on shutdown.
pub fn start_embedded(
    router: Router,
    config: Config,
    store: Arc<dyn AccountStore>,
    gateway: Arc<dyn Gateway>,
) -> (Router, JoinHandle<()>) {
    let state = AppState::embedded(config, store, gateway);
    state.log.info("Starting");

    let reclaimer = spawn_reclaim_task(
        state.cache.clone(),
        state.config.cache_life,
        state.config.cache_interval,
        state.log.clone(),
    );

    (attach(router, state), reclaimer)
}
