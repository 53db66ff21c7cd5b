//! Cache Module
//!
//! Time-bounded, in-memory resolution cache shared by request handlers and
//! the background reclaimer.

mod entry;
mod store;


// Re-export public types
pub use entry::ResolvedIdentity;
pub use store::ResolutionCache;
