//! Measurement extraction
//!
//! Derives the single numeric value a rule classifies, either straight from
//! the event or from one aggregation query against the historical store.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::db::{HistoryQuery, HistoryStore};
use crate::error::{Error, Result};
use crate::models::{DataCache, Measurement, MeasurementKind, RuleConfig, RuleRequest, ScopeKey};

/// Extracts measurements, issuing at most one history query per call
#[derive(Clone)]
pub struct MeasurementExtractor {
    store: Arc<dyn HistoryStore>,
    timeout: Option<Duration>,
}

impl MeasurementExtractor {
    /// Create an extractor over a history store
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bound every history query by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract the measurement a rule classifies
    pub async fn extract(
        &self,
        request: &RuleRequest,
        rule: &RuleConfig,
        cancel: Option<&CancellationToken>,
    ) -> Result<Measurement> {
        match rule.config.measurement {
            MeasurementKind::Amount => amount(request).map(Measurement::Amount),
            MeasurementKind::AmountRatio => amount_ratio(request).map(Measurement::Ratio),
            MeasurementKind::TransactionCount { scope } => {
                let query = history_query(request, rule, scope)?;
                let rows = self.run(&query, cancel).await?;
                let count = reduce_rows(&rows)?;
                debug!(scope = ?scope, rows = rows.len(), count, "History count");
                Ok(Measurement::Count(count))
            }
        }
    }

    async fn run(&self, query: &HistoryQuery, cancel: Option<&CancellationToken>) -> Result<Vec<i64>> {
        trace!(scope = ?query.scope, "Querying history");

        let timed = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, self.store.aggregate(query)).await {
                    Ok(rows) => rows,
                    Err(_) => Err(Error::query(format!(
                        "history query timed out after {}ms",
                        limit.as_millis()
                    ))),
                },
                None => self.store.aggregate(query).await,
            }
        };

        match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::query("history query cancelled")),
                rows = timed => rows,
            },
            None => timed.await,
        }
    }
}

fn amount(request: &RuleRequest) -> Result<rust_decimal::Decimal> {
    request
        .transaction
        .first_charge_amount()
        .ok_or_else(|| Error::unavailable("transaction has no charge amount"))
}

fn amount_ratio(request: &RuleRequest) -> Result<rust_decimal::Decimal> {
    let numerator = amount(request)?;
    let reference = request
        .data_cache
        .amt
        .as_ref()
        .map(|a| a.amt)
        .filter(|a| !a.is_zero())
        .ok_or_else(|| Error::unavailable("data cache has no non-zero reference amount"))?;

    numerator
        .checked_div(reference)
        .ok_or_else(|| Error::unavailable("amount ratio is not representable"))
}

fn scope_id(cache: &DataCache, scope: ScopeKey) -> &str {
    match scope {
        ScopeKey::Debtor => &cache.dbtr_id,
        ScopeKey::Creditor => &cache.cdtr_id,
        ScopeKey::DebtorAccount => &cache.dbtr_acct_id,
        ScopeKey::CreditorAccount => &cache.cdtr_acct_id,
    }
}

/// Build the window `[eventTime - maxQueryRange, eventTime)` for a scope
pub fn history_query(request: &RuleRequest, rule: &RuleConfig, scope: ScopeKey) -> Result<HistoryQuery> {
    let scope_id = scope_id(&request.data_cache, scope);
    if scope_id.is_empty() {
        return Err(Error::unavailable(format!("data cache has no {} identifier", scope.column())));
    }

    let until = request
        .transaction
        .created_at()
        .ok_or_else(|| Error::unavailable("transaction has no creation time"))?;

    let from = match rule.max_query_range()? {
        Some(range) => Some(
            until
                .checked_sub_signed(range)
                .ok_or_else(|| Error::unavailable("history window starts before the representable range"))?,
        ),
        None => None,
    };

    Ok(HistoryQuery {
        scope,
        scope_id: scope_id.to_string(),
        from,
        until,
    })
}

/// Reduce aggregate rows to one count: the first row, or 0 when there are none
pub fn reduce_rows(rows: &[i64]) -> Result<u64> {
    match rows.first() {
        None => Ok(0),
        Some(&n) => u64::try_from(n).map_err(|_| Error::query(format!("history store returned negative count {n}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{HistoryRecord, InMemoryHistoryStore};
    use crate::rules::fixtures::{amount_threshold_rule, debtor_count_rule, event_time, request};
    use crate::models::MAX_QUERY_RANGE;
    use chrono::Duration as ChronoDuration;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn extractor(store: InMemoryHistoryStore) -> MeasurementExtractor {
        MeasurementExtractor::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_amount_needs_no_query() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let extractor = MeasurementExtractor::new(store.clone());

        let m = extractor
            .extract(&request(dec!(150)), &amount_threshold_rule(), None)
            .await
            .unwrap();

        assert_eq!(m, Measurement::Amount(dec!(150)));
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_amount_missing() {
        let mut req = request(dec!(150));
        req.transaction.payment_status.tx_info.charges.clear();

        let result = extractor(InMemoryHistoryStore::new())
            .extract(&req, &amount_threshold_rule(), None)
            .await;

        assert!(matches!(result, Err(Error::MeasurementUnavailable(_))));
    }

    #[tokio::test]
    async fn test_count_within_window() {
        let req = request(dec!(150));
        let store = InMemoryHistoryStore::with_records(vec![
            HistoryRecord::from_cache(&req.data_cache, event_time() - ChronoDuration::hours(2)),
            HistoryRecord::from_cache(&req.data_cache, event_time() - ChronoDuration::days(2)),
        ]);

        let m = extractor(store)
            .extract(&req, &debtor_count_rule(), None)
            .await
            .unwrap();

        assert_eq!(m, Measurement::Count(1));
    }

    #[tokio::test]
    async fn test_empty_store_counts_zero() {
        let m = extractor(InMemoryHistoryStore::new())
            .extract(&request(dec!(150)), &debtor_count_rule(), None)
            .await
            .unwrap();

        assert_eq!(m, Measurement::Count(0));
    }

    #[test]
    fn test_history_query_window() {
        let query = history_query(&request(dec!(1)), &debtor_count_rule(), ScopeKey::Debtor).unwrap();

        assert_eq!(query.until, event_time());
        assert_eq!(query.from, Some(event_time() - ChronoDuration::days(1)));
        assert_eq!(query.scope_id, "dbtr_516c7065d75b4fcea6fffb52a9539357");
    }

    #[test]
    fn test_history_query_without_range_is_to_date() {
        let mut rule = debtor_count_rule();
        rule.config.parameters.clear();

        let query = history_query(&request(dec!(1)), &rule, ScopeKey::Creditor).unwrap();

        assert_eq!(query.from, None);
        assert_eq!(query.scope_id, "cdtr_b086a1e193794192b32c8af8550d721d");
    }

    #[rstest]
    #[case(dec!(-1))]
    #[case(Decimal::from(i64::MIN))]
    fn test_history_query_rejects_negative_range(#[case] range: Decimal) {
        let mut rule = debtor_count_rule();
        rule.config.parameters.insert(MAX_QUERY_RANGE.to_string(), range);

        assert!(matches!(
            history_query(&request(dec!(1)), &rule, ScopeKey::Debtor),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_history_query_window_overflow() {
        let mut rule = debtor_count_rule();
        rule.config
            .parameters
            .insert(MAX_QUERY_RANGE.to_string(), Decimal::from(i64::MAX));

        assert!(matches!(
            history_query(&request(dec!(1)), &rule, ScopeKey::Debtor),
            Err(Error::MeasurementUnavailable(_))
        ));
    }

    #[test]
    fn test_history_query_missing_identifier() {
        let mut req = request(dec!(1));
        req.data_cache.dbtr_id.clear();

        assert!(matches!(
            history_query(&req, &debtor_count_rule(), ScopeKey::Debtor),
            Err(Error::MeasurementUnavailable(_))
        ));
    }

    #[test]
    fn test_history_query_missing_time() {
        let mut req = request(dec!(1));
        req.transaction.payment_status.group_header.created_at = None;

        assert!(history_query(&req, &debtor_count_rule(), ScopeKey::Debtor).is_err());
    }

    #[test]
    fn test_reduce_rows() {
        assert_eq!(reduce_rows(&[]).unwrap(), 0);
        assert_eq!(reduce_rows(&[1]).unwrap(), 1);
        assert_eq!(reduce_rows(&[3, 9]).unwrap(), 3);
        assert!(matches!(reduce_rows(&[-1]), Err(Error::QueryFailure(_))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let result = extractor(InMemoryHistoryStore::new().failing("connection refused"))
            .extract(&request(dec!(150)), &debtor_count_rule(), None)
            .await;

        assert!(matches!(result, Err(Error::QueryFailure(msg)) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_timeout_is_query_failure() {
        let store = InMemoryHistoryStore::new().with_latency(Duration::from_secs(10));
        let result = extractor(store)
            .with_timeout(Some(Duration::from_millis(50)))
            .extract(&request(dec!(150)), &debtor_count_rule(), None)
            .await;

        assert!(matches!(result, Err(Error::QueryFailure(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_cancellation_is_query_failure() {
        let token = CancellationToken::new();
        token.cancel();

        let store = InMemoryHistoryStore::new().with_latency(Duration::from_secs(10));
        let result = extractor(store)
            .extract(&request(dec!(150)), &debtor_count_rule(), Some(&token))
            .await;

        assert!(matches!(result, Err(Error::QueryFailure(msg)) if msg.contains("cancelled")));
    }

    #[tokio::test]
    async fn test_amount_ratio() {
        let mut rule = amount_threshold_rule();
        rule.config.measurement = MeasurementKind::AmountRatio;

        let m = extractor(InMemoryHistoryStore::new())
            .extract(&request(dec!(617.28)), &rule, None)
            .await
            .unwrap();

        assert_eq!(m, Measurement::Ratio(dec!(0.5)));
    }

    #[tokio::test]
    async fn test_amount_ratio_without_reference() {
        let mut rule = amount_threshold_rule();
        rule.config.measurement = MeasurementKind::AmountRatio;
        let mut req = request(dec!(10));
        req.data_cache.amt = None;

        let result = extractor(InMemoryHistoryStore::new()).extract(&req, &rule, None).await;

        assert!(matches!(result, Err(Error::MeasurementUnavailable(_))));
    }
}
