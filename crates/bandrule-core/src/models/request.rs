//! Rule request envelope and pre-fetched data cache

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionEvent;

/// Identifiers and reference values resolved before the rule runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCache {
    /// Debtor pseudonym id
    #[serde(default)]
    pub dbtr_id: String,
    /// Creditor pseudonym id
    #[serde(default)]
    pub cdtr_id: String,
    /// Debtor account pseudonym id
    #[serde(default)]
    pub dbtr_acct_id: String,
    /// Creditor account pseudonym id
    #[serde(default)]
    pub cdtr_acct_id: String,
    /// Originating event id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evt_id: Option<String>,
    /// Reference amount of the originating transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amt: Option<CacheAmount>,
    /// Reference timestamp of the originating transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cre_dt_tm: Option<DateTime<Utc>>,
}

/// Reference amount carried in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheAmount {
    /// Amount value
    pub amt: Decimal,
    /// ISO 4217 currency code
    pub ccy: String,
}

/// Everything a rule receives for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRequest {
    /// The payment-status event under evaluation
    pub transaction: TransactionEvent,

    /// Pre-fetched identifiers for history queries
    #[serde(rename = "DataCache", default)]
    pub data_cache: DataCache,

    /// Routing metadata, carried but not interpreted
    #[serde(rename = "networkMap", default, skip_serializing_if = "serde_json::Value::is_null")]
    pub network_map: serde_json::Value,

    /// Processing timestamps, carried but not interpreted
    #[serde(rename = "metaData", default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta_data: serde_json::Value,
}

impl RuleRequest {
    /// Build a request without routing metadata
    pub fn new(transaction: TransactionEvent, data_cache: DataCache) -> Self {
        Self {
            transaction,
            data_cache,
            network_map: serde_json::Value::Null,
            meta_data: serde_json::Value::Null,
        }
    }
}
