//! Storage layer for Bandrule
//!
//! The historical store sits behind [`HistoryStore`] so rule evaluation never
//! depends on a concrete database client. PostgreSQL and in-memory
//! implementations are provided, plus a Redis publisher for resolved results.

mod memory;
mod postgres;
mod redis;

pub use memory::{HistoryRecord, InMemoryHistoryStore};
pub use postgres::{PostgresHistoryStore, PostgresPool};
pub use redis::{RedisPool, RedisResultPublisher, ResultEnvelope};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::Result;
use crate::models::ScopeKey;

/// A read-only aggregation over historical events for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Which cache identifier scopes the query
    pub scope: ScopeKey,
    /// Value of that identifier
    pub scope_id: String,
    /// Inclusive start of the window, unbounded when absent
    pub from: Option<DateTime<Utc>>,
    /// Exclusive end of the window
    pub until: DateTime<Utc>,
}

impl HistoryQuery {
    /// Check if a timestamp falls inside the window
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && at < self.until
    }
}

/// Fallible, read-only access to historical events.
///
/// Implementations must tolerate concurrent independent queries.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Run a count aggregation, returning zero or more aggregate rows
    async fn aggregate(&self, query: &HistoryQuery) -> Result<Vec<i64>>;
}

/// Database connections bundle
#[derive(Clone)]
pub struct Database {
    /// PostgreSQL connection pool
    pub postgres: PostgresPool,
    /// Redis connection pool
    pub redis: RedisPool,
}

impl Database {
    /// Create a new database connection bundle
    pub async fn new(config: &Config) -> Result<Self> {
        let postgres = PostgresPool::new(&config.database).await?;
        let redis = RedisPool::new(&config.redis)?;

        Ok(Self { postgres, redis })
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        self.postgres.health_check().await?;
        self.redis.health_check().await?;
        Ok(())
    }
}
