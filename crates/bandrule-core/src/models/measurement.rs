//! Measurement values produced by the extractor

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The single numeric value a rule classifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Measurement {
    /// A monetary amount
    Amount(Decimal),
    /// A count of historical events
    Count(u64),
    /// A ratio between two amounts
    Ratio(Decimal),
}

impl Measurement {
    /// The value as a decimal, exact for every variant
    pub fn as_decimal(&self) -> Decimal {
        match self {
            Self::Amount(v) | Self::Ratio(v) => *v,
            Self::Count(n) => Decimal::from(*n),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount(v) | Self::Ratio(v) => write!(f, "{v}"),
            Self::Count(n) => write!(f, "{n}"),
        }
    }
}
