//! Resolution Cache Module
//!
//! Concurrent map from account key to its last resolution. Readers share the
//! lock; writers and the reclaimer's delete pass hold it exclusively. The
//! cache never expires entries on read, callers decide staleness.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::ResolvedIdentity;

// == Resolution Cache ==
/// Unbounded resolution cache keyed by lowercase account key.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, ResolvedIdentity>>,
}

impl ResolutionCache {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns a copy of the entry for `key`, stale or not.
    pub async fn get(&self, key: &str) -> Option<ResolvedIdentity> {
        self.entries.read().await.get(key).cloned()
    }

    // == Insert ==
    /// Stores `identity` under its account key, replacing any previous entry.
    /// Concurrent writers for the same key resolve as last writer wins.
    pub async fn insert(&self, identity: ResolvedIdentity) {
        let key = identity.account_key.clone();
        self.entries.write().await.insert(key, identity);
    }

    // == Reclaim ==
    /// Removes entries older than `lifetime` and returns how many were removed.
    pub async fn reclaim(&self, lifetime: Duration) -> usize {
        let stale = self.scan_stale(lifetime).await;
        if stale.is_empty() {
            return 0;
        }
        self.evict_stale(stale, lifetime).await
    }

    /// First reclaim pass: collects stale keys under the shared lock.
    pub async fn scan_stale(&self, lifetime: Duration) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, identity)| identity.is_stale(lifetime))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Second reclaim pass: removes `candidates` under the exclusive lock.
    ///
    /// Each candidate is re-checked right before removal. A request may have
    /// refreshed it since the scan, and a fresh entry must survive.
    pub async fn evict_stale(&self, candidates: Vec<String>, lifetime: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in candidates {
            let still_stale = entries
                .get(&key)
                .is_some_and(|identity| identity.is_stale(lifetime));
            if still_stale {
                entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    // == Length ==
    /// Returns the current number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
