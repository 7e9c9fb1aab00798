//! In-memory history store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::{DataCache, ScopeKey};

use super::{HistoryQuery, HistoryStore};

/// One historical event, reduced to the fields history queries need
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    /// Debtor pseudonym id
    pub dbtr_id: String,
    /// Creditor pseudonym id
    pub cdtr_id: String,
    /// Debtor account pseudonym id
    pub dbtr_acct_id: String,
    /// Creditor account pseudonym id
    pub cdtr_acct_id: String,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Record an event for the identifiers in a data cache
    pub fn from_cache(cache: &DataCache, created_at: DateTime<Utc>) -> Self {
        Self {
            dbtr_id: cache.dbtr_id.clone(),
            cdtr_id: cache.cdtr_id.clone(),
            dbtr_acct_id: cache.dbtr_acct_id.clone(),
            cdtr_acct_id: cache.cdtr_acct_id.clone(),
            created_at,
        }
    }

    fn scope_id(&self, scope: ScopeKey) -> &str {
        match scope {
            ScopeKey::Debtor => &self.dbtr_id,
            ScopeKey::Creditor => &self.cdtr_id,
            ScopeKey::DebtorAccount => &self.dbtr_acct_id,
            ScopeKey::CreditorAccount => &self.cdtr_acct_id,
        }
    }
}

/// History store held in memory, with optional latency and failure injection
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
    latency: Option<Duration>,
    failure: Option<String>,
    queries: AtomicUsize,
}

impl InMemoryHistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with records
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Delay every query by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every query with `message`
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Append a record
    pub async fn insert(&self, record: HistoryRecord) {
        self.records.write().await.push(record);
    }

    /// Number of queries issued so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn aggregate(&self, query: &HistoryQuery) -> Result<Vec<i64>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.failure {
            return Err(Error::query(message.clone()));
        }

        let records = self.records.read().await;
        let count = records
            .iter()
            .filter(|r| r.scope_id(query.scope) == query.scope_id && query.covers(r.created_at))
            .count();

        Ok(vec![i64::try_from(count).unwrap_or(i64::MAX)])
    }
}
