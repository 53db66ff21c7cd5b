//! In-memory fixture backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{AccountRecord, AccountStore, StoreError};

/// Fixed account table that counts queries and can be switched into a
/// failing state. Used to exercise the resolution pipeline without a
/// database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, AccountRecord>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account reachable under the lowercase form of `account`.
    pub fn with_account(self, account: &str, email: &str) -> Self {
        self.insert(account, email);
        self
    }

    pub fn insert(&self, account: &str, email: &str) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(account.to_lowercase(), AccountRecord::new(account, email));
        }
    }

    /// Makes every following lookup fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of lookups performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn lookup(&self, key: &str) -> Result<Option<AccountRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }

        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Unavailable("poisoned account table".to_string()))?;
        Ok(accounts.get(key).cloned())
    }
}
