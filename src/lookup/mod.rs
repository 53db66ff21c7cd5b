//! Lookup Store
//!
//! Resolves a normalized account key to its canonical name and email.
//!
//! A missing account is a legitimate outcome (`Ok(None)`) and is kept apart
//! from backend failures (`Err`). Callers apply the fallback email policy to
//! the former and abort on the latter.

mod memory;
mod sql;

pub use memory::MemoryStore;
pub use sql::SqlAccountStore;

use async_trait::async_trait;
use thiserror::Error;

// == Account Record ==
/// Row returned by a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    /// Canonical account name, may differ in case from the key
    pub account: String,
    pub email: String,
}

impl AccountRecord {
    pub fn new(account: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            email: email.into(),
        }
    }
}

// == Store Error ==
/// Backend failures. Never cached, surfaced to clients as a bare 500.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("lookup timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("lookup backend unavailable: {0}")]
    Unavailable(String),
}

// == Account Store ==
/// Query-by-key backend trait.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Looks up exactly one account by its lowercased key.
    async fn lookup(&self, key: &str) -> Result<Option<AccountRecord>, StoreError>;
}
