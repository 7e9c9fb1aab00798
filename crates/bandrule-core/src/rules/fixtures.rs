//! Shared test fixtures

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{
    Agent, Band, CacheAmount, Charge, CurrencyAmount, DataCache, ExitCondition, GroupHeader,
    MeasurementKind, PaymentStatus, RuleBody, RuleConfig, RuleRequest, RuleResult, ScopeKey,
    TransactionEvent, TransactionInfo, AMOUNT_THRESHOLD, MAX_QUERY_RANGE,
};

pub fn event_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 12, 3, 9, 24, 48).unwrap()
}

fn charge(amount: Decimal, member: &str) -> Charge {
    Charge {
        amount: CurrencyAmount {
            value: amount,
            currency: "USD".to_string(),
        },
        agent: Some(Agent::new(member)),
    }
}

pub fn event(amount: Decimal) -> TransactionEvent {
    TransactionEvent {
        tx_type: "pacs.002.001.12".to_string(),
        payment_status: PaymentStatus {
            group_header: GroupHeader {
                msg_id: "6b444365119746c5be7dfb5516ba67c4".to_string(),
                created_at: Some(event_time()),
            },
            tx_info: TransactionInfo {
                original_instruction_id: "5ab4fc7355de4ef8a75b78b00a681ed2".to_string(),
                original_end_to_end_id: "2c516801007642dfb892944dde1cf845".to_string(),
                status: "ACCC".to_string(),
                charges: vec![
                    charge(amount, "dfsp001"),
                    charge(dec!(153.57), "dfsp001"),
                    charge(dec!(30.71), "dfsp002"),
                ],
                accepted_at: Some(Utc.with_ymd_and_hms(2021, 12, 3, 15, 36, 16).unwrap()),
                instructing_agent: Some(Agent::new("dfsp001")),
                instructed_agent: Some(Agent::new("dfsp002")),
            },
        },
    }
}

pub fn cache() -> DataCache {
    DataCache {
        dbtr_id: "dbtr_516c7065d75b4fcea6fffb52a9539357".to_string(),
        cdtr_id: "cdtr_b086a1e193794192b32c8af8550d721d".to_string(),
        dbtr_acct_id: "dbtrAcct_1fd08e408c184dd28cbaeef03bff1af5".to_string(),
        cdtr_acct_id: "cdtrAcct_d531e1ba4ed84a248fe26617e79fcb64".to_string(),
        evt_id: Some("eventId".to_string()),
        amt: Some(CacheAmount {
            amt: dec!(1234.56),
            ccy: "XTS".to_string(),
        }),
        cre_dt_tm: Some(event_time()),
    }
}

pub fn request(amount: Decimal) -> RuleRequest {
    RuleRequest::new(event(amount), cache())
}

pub fn band(sub_rule_ref: &str, lower: Option<Decimal>, upper: Option<Decimal>, reason: &str) -> Band {
    Band {
        sub_rule_ref: sub_rule_ref.to_string(),
        lower_limit: lower,
        upper_limit: upper,
        reason: reason.to_string(),
    }
}

fn exit(sub_rule_ref: &str, reason: &str) -> ExitCondition {
    ExitCondition {
        sub_rule_ref: sub_rule_ref.to_string(),
        reason: reason.to_string(),
    }
}

/// Outgoing transaction count for the debtor, exits above 200
pub fn debtor_count_rule() -> RuleConfig {
    RuleConfig {
        id: "901@1.0.0".to_string(),
        cfg: "1.0.0".to_string(),
        desc: Some("Number of outgoing transactions - debtor".to_string()),
        config: RuleBody {
            parameters: [
                (MAX_QUERY_RANGE.to_string(), dec!(86400000)),
                (AMOUNT_THRESHOLD.to_string(), dec!(200)),
            ]
            .into_iter()
            .collect(),
            exit_conditions: vec![
                exit(".x00", "Incoming transaction is unsuccessful"),
                exit(".x01", "Transaction amount exceeds 200"),
            ],
            bands: vec![
                band(".01", None, Some(dec!(2)), "The debtor has performed one transaction to date"),
                band(
                    ".02",
                    Some(dec!(2)),
                    Some(dec!(4)),
                    "The debtor has performed two or three transactions to date",
                ),
                band(".03", Some(dec!(4)), None, "The debtor has performed 4 or more transactions to date"),
            ],
            measurement: MeasurementKind::TransactionCount {
                scope: ScopeKey::Debtor,
            },
        },
    }
}

/// Simple amount alert, exits above 100 and has no bands
pub fn amount_threshold_rule() -> RuleConfig {
    RuleConfig {
        id: "756@1.0.0".to_string(),
        cfg: "1.0.0".to_string(),
        desc: Some("Transaction amount exceeds threshold".to_string()),
        config: RuleBody {
            parameters: [(AMOUNT_THRESHOLD.to_string(), dec!(100))].into_iter().collect(),
            exit_conditions: vec![exit(".x01", "Transaction amount exceeds 100")],
            bands: vec![],
            measurement: MeasurementKind::Amount,
        },
    }
}

pub fn default_result(rule: &RuleConfig) -> RuleResult {
    RuleResult::for_rule(rule)
}
