//! Resolved Identity Module
//!
//! The value stored per account key, stamped with its resolution time.

use std::time::Duration;

use tokio::time::Instant;

use crate::hasher::avatar_hash;
use crate::lookup::AccountRecord;

// == Resolved Identity ==
/// Result of resolving one account key.
///
/// Entries for unknown accounts carry the same fields as entries for real
/// ones, so the cache never reveals which accounts exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Lowercased account key, unique per cache
    pub account_key: String,
    /// Canonical account name from the lookup, empty for unknown accounts
    pub display_account: String,
    /// Real email, or the key with the salt appended
    pub email_or_fallback: String,
    /// Hash of `email_or_fallback`
    pub avatar_token: String,
    /// When this resolution happened
    pub resolved_at: Instant,
}

impl ResolvedIdentity {
    // == Constructors ==
    /// Resolution for an account found by the lookup.
    pub fn found(account_key: impl Into<String>, record: AccountRecord) -> Self {
        Self::resolve(account_key.into(), record.account, record.email)
    }

    /// Resolution for an account the lookup does not know about.
    pub fn fallback(account_key: impl Into<String>, salt: &str) -> Self {
        let account_key = account_key.into();
        let email = fallback_email(&account_key, salt);
        Self::resolve(account_key, String::new(), email)
    }

    fn resolve(account_key: String, display_account: String, email_or_fallback: String) -> Self {
        let avatar_token = avatar_hash(&email_or_fallback);
        Self {
            account_key,
            display_account,
            email_or_fallback,
            avatar_token,
            resolved_at: Instant::now(),
        }
    }

    // == Staleness ==
    /// Time elapsed since this entry was resolved.
    pub fn age(&self) -> Duration {
        self.resolved_at.elapsed()
    }

    /// True once the entry has outlived `lifetime`.
    pub fn is_stale(&self, lifetime: Duration) -> bool {
        self.age() > lifetime
    }
}

/// Deterministic stand-in email for accounts without a record.
pub fn fallback_email(account_key: &str, salt: &str) -> String {
    format!("{}{}", account_key, salt)
}
