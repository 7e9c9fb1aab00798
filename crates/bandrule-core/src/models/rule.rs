//! Rule configuration and rule result models

use std::collections::{BTreeMap, HashSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Parameter holding the history window length in milliseconds
pub const MAX_QUERY_RANGE: &str = "maxQueryRange";

/// Parameter holding the amount above which `.x01` exits
pub const AMOUNT_THRESHOLD: &str = "amountThreshold";

/// Sub-rule reference of a result that raised no alert
pub const DEFAULT_SUB_RULE_REF: &str = ".00";

/// A versioned rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Rule identifier, e.g. `901@1.0.0`
    pub id: String,

    /// Configuration version
    pub cfg: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Tunables, exit conditions and bands
    pub config: RuleBody,
}

/// The decision table of a rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBody {
    /// Named numeric tunables
    #[serde(default)]
    pub parameters: BTreeMap<String, Decimal>,

    /// Disqualifying outcomes, checked in order before banding
    #[serde(default)]
    pub exit_conditions: Vec<ExitCondition>,

    /// Ordered half-open bands, first match wins
    #[serde(default)]
    pub bands: Vec<Band>,

    /// What the rule measures
    #[serde(default)]
    pub measurement: MeasurementKind,
}

/// A disqualifying outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitCondition {
    /// Outcome reference, which also selects the exit predicate
    pub sub_rule_ref: String,
    /// Reason reported when the exit fires
    pub reason: String,
}

/// A half-open interval `[lower_limit, upper_limit)` mapped to an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    /// Outcome reference reported for values in this band
    pub sub_rule_ref: String,

    /// Inclusive lower bound, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<Decimal>,

    /// Exclusive upper bound, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_limit: Option<Decimal>,

    /// Reason reported for values in this band
    pub reason: String,
}

impl Band {
    /// Check if a value falls inside this band
    pub fn contains(&self, value: Decimal) -> bool {
        self.lower_limit.map_or(true, |lower| value >= lower)
            && self.upper_limit.map_or(true, |upper| value < upper)
    }

    fn overlaps(&self, other: &Band) -> bool {
        let lower = match (self.lower_limit, other.lower_limit) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let upper = match (self.upper_limit, other.upper_limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        match (lower, upper) {
            (Some(l), Some(u)) => l < u,
            _ => true,
        }
    }
}

/// Identifier in the data cache that scopes a history query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeKey {
    /// Debtor pseudonym
    Debtor,
    /// Creditor pseudonym
    Creditor,
    /// Debtor account pseudonym
    DebtorAccount,
    /// Creditor account pseudonym
    CreditorAccount,
}

impl ScopeKey {
    /// Column holding this identifier in the history table
    pub fn column(self) -> &'static str {
        match self {
            Self::Debtor => "dbtr_id",
            Self::Creditor => "cdtr_id",
            Self::DebtorAccount => "dbtr_acct_id",
            Self::CreditorAccount => "cdtr_acct_id",
        }
    }
}

/// How a rule derives its measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementKind {
    /// The first charge amount on the event
    #[default]
    Amount,
    /// Number of historical transactions for a cache identifier
    TransactionCount {
        /// Identifier to count for
        scope: ScopeKey,
    },
    /// First charge amount relative to the cache reference amount
    AmountRatio,
}

impl RuleConfig {
    /// Look up a numeric parameter
    pub fn parameter(&self, name: &str) -> Option<Decimal> {
        self.config.parameters.get(name).copied()
    }

    /// History window length, if configured.
    ///
    /// The range must be a whole, non-negative number of milliseconds that
    /// fits a `TimeDelta`.
    pub fn max_query_range(&self) -> Result<Option<chrono::TimeDelta>> {
        let Some(ms) = self.parameter(MAX_QUERY_RANGE) else {
            return Ok(None);
        };
        if ms < Decimal::ZERO || !ms.fract().is_zero() {
            return Err(Error::validation(format!(
                "{MAX_QUERY_RANGE} must be a whole, non-negative number of milliseconds, got {ms}"
            )));
        }

        ms.to_i64()
            .and_then(chrono::TimeDelta::try_milliseconds)
            .map(Some)
            .ok_or_else(|| Error::validation(format!("{MAX_QUERY_RANGE} {ms} is out of range")))
    }

    /// Logging context label
    pub fn context(&self) -> String {
        format!("Rule-{} handleTransaction()", self.id)
    }

    /// Check the configuration is well formed.
    ///
    /// Overlapping bands are accepted; evaluation resolves them by
    /// declaration order.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("rule id is empty"));
        }
        if self.cfg.trim().is_empty() {
            return Err(Error::validation(format!("rule {} has an empty cfg", self.id)));
        }

        self.max_query_range()?;

        let mut seen = HashSet::new();
        let refs = self
            .config
            .exit_conditions
            .iter()
            .map(|e| &e.sub_rule_ref)
            .chain(self.config.bands.iter().map(|b| &b.sub_rule_ref));

        for sub_rule_ref in refs {
            if sub_rule_ref.trim().is_empty() {
                return Err(Error::validation(format!(
                    "rule {} has an outcome with an empty subRuleRef",
                    self.id
                )));
            }
            if !seen.insert(sub_rule_ref.as_str()) {
                return Err(Error::validation(format!(
                    "rule {} declares subRuleRef {} more than once",
                    self.id, sub_rule_ref
                )));
            }
        }

        for band in &self.config.bands {
            if let (Some(lower), Some(upper)) = (band.lower_limit, band.upper_limit) {
                if lower >= upper {
                    return Err(Error::validation(format!(
                        "band {} has lowerLimit {} not below upperLimit {}",
                        band.sub_rule_ref, lower, upper
                    )));
                }
            }
        }

        for (i, band) in self.config.bands.iter().enumerate() {
            for later in &self.config.bands[i + 1..] {
                if band.overlaps(later) {
                    warn!(
                        rule_id = %self.id,
                        first = %band.sub_rule_ref,
                        second = %later.sub_rule_ref,
                        "Bands overlap, earlier band wins"
                    );
                }
            }
        }

        Ok(())
    }
}

/// Outcome of evaluating one event against one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    /// Rule identifier
    pub id: String,
    /// Configuration version
    pub cfg: String,
    /// Selected outcome reference
    #[serde(default)]
    pub sub_rule_ref: String,
    /// Selected outcome reason
    #[serde(default)]
    pub reason: String,
}

impl RuleResult {
    /// The no-alert result for a rule
    pub fn for_rule(rule: &RuleConfig) -> Self {
        Self {
            id: rule.id.clone(),
            cfg: rule.cfg.clone(),
            sub_rule_ref: DEFAULT_SUB_RULE_REF.to_string(),
            reason: String::new(),
        }
    }

    /// Replace the outcome, keeping the rule identity
    pub fn resolve(mut self, sub_rule_ref: &str, reason: &str) -> Self {
        self.sub_rule_ref = sub_rule_ref.to_string();
        self.reason = reason.to_string();
        self
    }
}
