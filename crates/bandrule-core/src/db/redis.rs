//! Redis connection and result publishing

use chrono::{DateTime, Utc};
use deadpool_redis::{Config as RedisConfig, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::RedisConfig as AppRedisConfig;
use crate::error::{Error, Result};
use crate::models::RuleResult;

/// Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Create a new Redis connection pool
    pub fn new(config: &AppRedisConfig) -> Result<Self> {
        let mut cfg = RedisConfig::from_url(&config.url);
        cfg.pool = Some(PoolConfig::new(config.max_connections as usize));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Redis(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| Error::Redis(e.to_string()))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Redis(e.to_string()))?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

/// A resolved result as published downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    /// Unique id of this evaluation
    pub evaluation_id: Uuid,
    /// Correlation id of the evaluated message
    pub msg_id: String,
    /// The rule result
    pub result: RuleResult,
    /// Whether the result differs from the caller's default outcome
    pub alert: bool,
    /// When the result was published
    pub published_at: DateTime<Utc>,
}

impl ResultEnvelope {
    /// Wrap a result for publishing; `default` is the result the
    /// evaluation started from
    pub fn new(msg_id: impl Into<String>, result: RuleResult, default: &RuleResult) -> Self {
        let alert = result.sub_rule_ref != default.sub_rule_ref;
        Self {
            evaluation_id: Uuid::new_v4(),
            msg_id: msg_id.into(),
            result,
            alert,
            published_at: Utc::now(),
        }
    }

    /// Whether the result raised an alert
    pub fn is_alert(&self) -> bool {
        self.alert
    }
}

/// Publishes resolved rule results on Redis channels
#[derive(Clone)]
pub struct RedisResultPublisher {
    pool: Pool,
    prefix: String,
}

impl RedisResultPublisher {
    /// Create a new publisher using `<prefix>:results` and `<prefix>:alerts`
    pub fn new(pool: &RedisPool, prefix: impl Into<String>) -> Self {
        Self {
            pool: pool.pool.clone(),
            prefix: prefix.into(),
        }
    }

    /// Channel receiving every result
    pub fn results_channel(&self) -> String {
        format!("{}:results", self.prefix)
    }

    /// Channel receiving only alerting results
    pub fn alerts_channel(&self) -> String {
        format!("{}:alerts", self.prefix)
    }

    /// Publish a result envelope
    pub async fn publish(&self, envelope: &ResultEnvelope) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| Error::Redis(e.to_string()))?;
        let payload = serde_json::to_string(envelope)?;

        let _: () = conn
            .publish(self.results_channel(), &payload)
            .await
            .map_err(|e| Error::Redis(e.to_string()))?;

        if envelope.is_alert() {
            let _: () = conn
                .publish(self.alerts_channel(), &payload)
                .await
                .map_err(|e| Error::Redis(e.to_string()))?;
        }

        debug!(
            msg_id = %envelope.msg_id,
            sub_rule_ref = %envelope.result.sub_rule_ref,
            "Published rule result"
        );

        Ok(())
    }
}
