//! SQL lookup backend over a MySQL pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;

use super::{AccountRecord, AccountStore, StoreError};
use crate::config::Config;

/// Runs the configured query template against a MySQL database.
///
/// The template takes one bound parameter (the account key) and returns two
/// columns: display name and email.
#[derive(Debug, Clone)]
pub struct SqlAccountStore {
    pool: MySqlPool,
    query: String,
    timeout: Duration,
}

impl SqlAccountStore {
    /// Creates a lazily connecting pool from the configured DSN.
    ///
    /// The pool waits twice the lookup timeout for a connection, so a stalled
    /// server surfaces as `StoreError::Timeout` from `lookup`.
    pub fn connect_lazy(config: &Config) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(config.lookup_timeout * 2)
            .connect_lazy(&config.dsn)?;

        Ok(Self {
            pool,
            query: config.query.clone(),
            timeout: config.lookup_timeout,
        })
    }

    /// Round-trips a trivial statement to check connectivity.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for SqlAccountStore {
    async fn lookup(&self, key: &str) -> Result<Option<AccountRecord>, StoreError> {
        let query = sqlx::query(&self.query).bind(key).fetch_optional(&self.pool);

        let row = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;

        match row {
            Some(row) => Ok(Some(AccountRecord {
                account: row.try_get(0)?,
                email: row.try_get(1)?,
            })),
            None => Ok(None),
        }
    }
}
