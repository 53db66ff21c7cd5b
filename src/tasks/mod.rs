//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the service.
//!
//! # Tasks
//! - Cache reclaim: evicts resolutions older than the cache lifetime

mod reclaim;

pub use reclaim::spawn_reclaim_task;
