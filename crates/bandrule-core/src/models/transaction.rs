//! Payment-status (pacs.002) transaction event

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status code reported for an accepted, settled transaction
pub const SUCCESS_STATUS: &str = "ACCC";

/// A single normalized payment-status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Message type, e.g. `pacs.002.001.12`
    #[serde(rename = "TxTp")]
    pub tx_type: String,

    /// Payment status report body
    #[serde(rename = "FIToFIPmtSts")]
    pub payment_status: PaymentStatus,
}

/// FI-to-FI payment status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// Group header
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,

    /// Status of the original transaction
    #[serde(rename = "TxInfAndSts")]
    pub tx_info: TransactionInfo,
}

/// Message-level header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHeader {
    /// Message identifier, used as the correlation id
    #[serde(rename = "MsgId")]
    pub msg_id: String,

    /// Creation time of the message
    #[serde(rename = "CreDtTm", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Transaction information and status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// Instruction id of the original transfer
    #[serde(rename = "OrgnlInstrId", default)]
    pub original_instruction_id: String,

    /// End-to-end id of the original transfer
    #[serde(rename = "OrgnlEndToEndId", default)]
    pub original_end_to_end_id: String,

    /// Transaction status code
    #[serde(rename = "TxSts")]
    pub status: String,

    /// Charges information, first entry is the primary charge
    #[serde(rename = "ChrgsInf", default)]
    pub charges: Vec<Charge>,

    /// Acceptance time
    #[serde(rename = "AccptncDtTm", default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,

    /// Instructing agent
    #[serde(rename = "InstgAgt", default, skip_serializing_if = "Option::is_none")]
    pub instructing_agent: Option<Agent>,

    /// Instructed agent
    #[serde(rename = "InstdAgt", default, skip_serializing_if = "Option::is_none")]
    pub instructed_agent: Option<Agent>,
}

/// One charge entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    /// Charged amount
    #[serde(rename = "Amt")]
    pub amount: CurrencyAmount,

    /// Agent taking the charge
    #[serde(rename = "Agt", default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
}

/// A currency-tagged amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    /// Amount value
    #[serde(rename = "Amt")]
    pub value: Decimal,

    /// ISO 4217 currency code
    #[serde(rename = "Ccy")]
    pub currency: String,
}

/// A financial institution participating in the transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Institution identification
    #[serde(rename = "FinInstnId")]
    pub institution: FinancialInstitution,
}

/// Financial institution identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialInstitution {
    /// Clearing system membership
    #[serde(rename = "ClrSysMmbId")]
    pub clearing_member: ClearingMember,
}

/// Clearing system member identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingMember {
    /// Member id, e.g. `dfsp001`
    #[serde(rename = "MmbId")]
    pub member_id: String,
}

impl Agent {
    /// Create an agent from its clearing system member id
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            institution: FinancialInstitution {
                clearing_member: ClearingMember {
                    member_id: member_id.into(),
                },
            },
        }
    }

    /// Clearing system member id
    pub fn member_id(&self) -> &str {
        &self.institution.clearing_member.member_id
    }
}

impl TransactionEvent {
    /// Correlation id for logging
    pub fn msg_id(&self) -> &str {
        &self.payment_status.group_header.msg_id
    }

    /// Message creation time
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.payment_status.group_header.created_at
    }

    /// The first charge amount, if the event carries any charges
    pub fn first_charge_amount(&self) -> Option<Decimal> {
        self.payment_status
            .tx_info
            .charges
            .first()
            .map(|c| c.amount.value)
    }

    /// Status code of the original transaction
    pub fn status(&self) -> &str {
        &self.payment_status.tx_info.status
    }

    /// Whether the original transaction completed successfully
    pub fn is_successful(&self) -> bool {
        self.status() == SUCCESS_STATUS
    }
}
