//! PostgreSQL connection and history queries

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

use super::{HistoryQuery, HistoryStore};

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// History store backed by a table of payment-status events.
///
/// The table needs the four pseudonym columns (`dbtr_id`, `cdtr_id`,
/// `dbtr_acct_id`, `cdtr_acct_id`) and a `cre_dt_tm` timestamp.
#[derive(Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
    table: String,
}

impl PostgresHistoryStore {
    /// Create a history store over `table`
    pub fn new(pool: &PostgresPool, table: &str) -> Result<Self> {
        Ok(Self {
            pool: pool.pool.clone(),
            table: checked_table_name(table)?,
        })
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn aggregate(&self, query: &HistoryQuery) -> Result<Vec<i64>> {
        let sql = count_sql(&self.table, query);
        debug!(scope = ?query.scope, from = ?query.from, until = %query.until, "Counting history");

        let mut statement = sqlx::query(&sql).bind(&query.scope_id).bind(query.until);
        if let Some(from) = query.from {
            statement = statement.bind(from);
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::query(e.to_string()))?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("cnt").map_err(|e| Error::query(e.to_string())))
            .collect()
    }
}

fn count_sql(table: &str, query: &HistoryQuery) -> String {
    let mut sql = format!(
        "SELECT COUNT(*) AS cnt FROM {} WHERE {} = $1 AND cre_dt_tm < $2",
        table,
        query.scope.column()
    );
    if query.from.is_some() {
        sql.push_str(" AND cre_dt_tm >= $3");
    }
    sql
}

/// Table names are interpolated, so only plain (optionally schema-qualified) identifiers pass
fn checked_table_name(table: &str) -> Result<String> {
    let valid = !table.is_empty()
        && table.split('.').all(|part| {
            !part.is_empty()
                && !part.starts_with(|c: char| c.is_ascii_digit())
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(table.to_string())
    } else {
        Err(Error::config(format!("invalid history table name: {table:?}")))
    }
}
