//! Rule evaluation for one event

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info_span, trace, Instrument};

use crate::config::EvaluatorConfig;
use crate::db::HistoryStore;
use crate::error::Result;
use crate::models::{RuleConfig, RuleRequest, RuleResult};

use super::classifier::OutcomeClassifier;
use super::extractor::MeasurementExtractor;

/// Evaluates events against a rule configuration.
///
/// Holds no per-event state, so one evaluator can serve many concurrent
/// evaluations.
#[derive(Clone)]
pub struct RuleEvaluator {
    extractor: MeasurementExtractor,
}

impl RuleEvaluator {
    /// Create an evaluator over a history store
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            extractor: MeasurementExtractor::new(store),
        }
    }

    /// Create an evaluator using the configured query timeout
    pub fn from_config(store: Arc<dyn HistoryStore>, config: &EvaluatorConfig) -> Self {
        Self {
            extractor: MeasurementExtractor::new(store).with_timeout(config.query_timeout()),
        }
    }

    /// Evaluate one event, starting from the caller's default result
    pub async fn evaluate(&self, request: &RuleRequest, rule: &RuleConfig, result: RuleResult) -> Result<RuleResult> {
        self.evaluate_with_cancel(request, rule, result, None).await
    }

    /// Evaluate one event; cancelling `cancel` aborts a pending history query
    pub async fn evaluate_with_cancel(
        &self,
        request: &RuleRequest,
        rule: &RuleConfig,
        result: RuleResult,
        cancel: Option<&CancellationToken>,
    ) -> Result<RuleResult> {
        let span = info_span!("rule", context = %rule.context(), msg_id = %request.transaction.msg_id());

        async move {
            trace!("Start - handle transaction");
            let classifier = OutcomeClassifier::new(rule);

            trace!("Step 1 - Check exit conditions");
            if let Some(resolved) = classifier.exit_outcome(&request.transaction, &result)? {
                trace!(sub_rule_ref = %resolved.sub_rule_ref, "End - exit condition");
                return Ok(resolved);
            }

            trace!("Step 2 - Extract measurement");
            let measurement = self.extractor.extract(request, rule, cancel).await?;

            trace!(%measurement, "Step 3 - Determine outcome");
            let resolved = classifier.band_outcome(Some(measurement), result)?;

            trace!(sub_rule_ref = %resolved.sub_rule_ref, "End - handle transaction");
            Ok(resolved)
        }
        .instrument(span)
        .await
    }
}
