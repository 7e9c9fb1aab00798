//! Event-level predicates behind exit conditions

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ExitCondition, RuleConfig, TransactionEvent, AMOUNT_THRESHOLD};

/// The check an exit condition performs, keyed by its sub-rule reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCheck {
    /// `.x00`: the original transaction did not succeed
    UnsuccessfulStatus,
    /// `.x01`: the first charge amount exceeds `amountThreshold`
    AmountAboveThreshold,
}

impl ExitCheck {
    /// Resolve the check for a sub-rule reference
    pub fn for_ref(sub_rule_ref: &str) -> Option<Self> {
        match sub_rule_ref {
            ".x00" => Some(Self::UnsuccessfulStatus),
            ".x01" => Some(Self::AmountAboveThreshold),
            _ => None,
        }
    }

    /// Check if the event triggers this exit
    pub fn matches(self, event: &TransactionEvent, rule: &RuleConfig) -> Result<bool> {
        match self {
            Self::UnsuccessfulStatus => Ok(!event.is_successful()),
            Self::AmountAboveThreshold => {
                let Some(threshold) = rule.parameter(AMOUNT_THRESHOLD) else {
                    return Ok(false);
                };
                let amount = event.first_charge_amount().ok_or_else(|| {
                    Error::unavailable("transaction has no charge amount to compare with amountThreshold")
                })?;
                Ok(amount > threshold)
            }
        }
    }
}

/// Find the first exit condition, in declared order, the event triggers
pub fn first_exit<'a>(
    rule: &'a RuleConfig,
    event: &TransactionEvent,
) -> Result<Option<&'a ExitCondition>> {
    for condition in &rule.config.exit_conditions {
        let Some(check) = ExitCheck::for_ref(&condition.sub_rule_ref) else {
            debug!(sub_rule_ref = %condition.sub_rule_ref, "No event-level check for exit condition");
            continue;
        };

        if check.matches(event, rule)? {
            return Ok(Some(condition));
        }
    }

    Ok(None)
}
