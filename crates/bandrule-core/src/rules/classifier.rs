//! Outcome classification
//!
//! Exit conditions are checked first, in declared order; the first match
//! resolves the result and banding never runs. Otherwise the measurement is
//! matched against the bands in declared order, first match wins. A
//! measurement outside every band leaves the caller's default untouched.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::models::{Band, Measurement, RuleConfig, RuleResult, TransactionEvent};

use super::exit::first_exit;

/// Maps a measurement and event to a final rule result
#[derive(Debug, Clone, Copy)]
pub struct OutcomeClassifier<'a> {
    rule: &'a RuleConfig,
}

impl<'a> OutcomeClassifier<'a> {
    /// Create a classifier for a rule
    pub fn new(rule: &'a RuleConfig) -> Self {
        Self { rule }
    }

    /// Resolve against the exit conditions only.
    ///
    /// Returns `None` when no exit condition matched.
    pub fn exit_outcome(&self, event: &TransactionEvent, result: &RuleResult) -> Result<Option<RuleResult>> {
        let outcome = first_exit(self.rule, event)?.map(|exit| {
            debug!(rule_id = %self.rule.id, sub_rule_ref = %exit.sub_rule_ref, "Exit condition matched");
            result.clone().resolve(&exit.sub_rule_ref, &exit.reason)
        });
        Ok(outcome)
    }

    /// Resolve against the bands only
    pub fn band_outcome(&self, value: Option<Measurement>, result: RuleResult) -> Result<RuleResult> {
        determine_outcome(value, self.rule, result)
    }

    /// Run the full classification: exit conditions, then bands
    pub fn classify(
        &self,
        event: &TransactionEvent,
        value: Option<Measurement>,
        result: RuleResult,
    ) -> Result<RuleResult> {
        if value.is_none() {
            return Err(Error::UndefinedMeasurement);
        }

        match self.exit_outcome(event, &result)? {
            Some(resolved) => Ok(resolved),
            None => self.band_outcome(value, result),
        }
    }
}

/// The first band, in declared order, containing `value`
pub fn select_band(bands: &[Band], value: Measurement) -> Option<&Band> {
    let value = value.as_decimal();
    bands.iter().find(|band| band.contains(value))
}

/// Resolve a result from the rule's bands.
///
/// Fails with [`Error::UndefinedMeasurement`] when no value is given.
pub fn determine_outcome(value: Option<Measurement>, rule: &RuleConfig, result: RuleResult) -> Result<RuleResult> {
    let value = value.ok_or(Error::UndefinedMeasurement)?;

    match select_band(&rule.config.bands, value) {
        Some(band) => {
            debug!(rule_id = %rule.id, %value, sub_rule_ref = %band.sub_rule_ref, "Band matched");
            Ok(result.resolve(&band.sub_rule_ref, &band.reason))
        }
        None => {
            trace!(rule_id = %rule.id, %value, "No band matched");
            Ok(result)
        }
    }
}
