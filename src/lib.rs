//! Gravatar Gateway - account to avatar redirect service
//!
//! Resolves account names to avatar redirects through a relational lookup,
//! with a time-bounded in-memory cache and salted hashing for unknown
//! accounts.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod hasher;
pub mod host;
pub mod lookup;
pub mod origin;
pub mod plugin;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use plugin::start_embedded;
pub use tasks::spawn_reclaim_task;
