use crate::finance::error::{FinanceError, FinanceResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Backend ids arrive as integers or UUID strings depending on the resource.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(value) => Ok(value),
        JsonValue::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(value)) => Ok(Some(value)),
        Some(JsonValue::Number(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "user_id", deserialize_with = "string_or_number")]
    pub user: String,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debit => "DEBIT",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerStatus {
    Pending,
    Completed,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "PENDING",
            LedgerStatus::Completed => "COMPLETED",
            LedgerStatus::Failed => "FAILED",
        }
    }
}

/// Append-only ledger entry. The console only reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "wallet_id", deserialize_with = "string_or_number")]
    pub wallet: String,
    pub amount: Decimal,
    pub transaction_type: TransactionKind,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub performed_by: Option<String>,
    pub status: LedgerStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// The amount may be signed either way on the wire; the kind decides direction.
    pub fn expected_balance_after(&self) -> Decimal {
        match self.transaction_type {
            TransactionKind::Credit => self.balance_before + self.amount.abs(),
            TransactionKind::Debit => self.balance_before - self.amount.abs(),
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.expected_balance_after() == self.balance_after
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Error,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Error => "ERROR",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn valid_transitions(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[
                PaymentStatus::Success,
                PaymentStatus::Failed,
                PaymentStatus::Error,
                PaymentStatus::Cancelled,
            ],
            // Terminal states
            PaymentStatus::Success
            | PaymentStatus::Failed
            | PaymentStatus::Error
            | PaymentStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PaymentStatus::Success)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One external-gateway payment attempt, as finalized by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentTransaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "user_id", deserialize_with = "opt_string_or_number")]
    pub user: Option<String>,
    #[serde(default, alias = "wallet_id", deserialize_with = "opt_string_or_number")]
    pub wallet: Option<String>,
    pub txn_id: String,
    #[serde(default)]
    pub reference_id: Option<String>,
    pub amount: Decimal,
    pub amount_paisa: Decimal,
    pub status: PaymentStatus,
    #[serde(default)]
    pub gateway_transaction_id: Option<String>,
    #[serde(default)]
    pub gateway_batch_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentTransaction {
    /// `amount` and `amount_paisa` must describe the same value at two scales.
    pub fn check_amount_scale(&self) -> FinanceResult<()> {
        let scaled = self.amount.checked_mul(Decimal::ONE_HUNDRED);
        if scaled != Some(self.amount_paisa) {
            return Err(FinanceError::AmountMismatch {
                amount: self.amount.to_string(),
                amount_minor: self.amount_paisa.to_string(),
            });
        }
        Ok(())
    }
}

/// `{ success, data?, message? }` wrapper used by every finance endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiatePaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particulars: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatePaymentRequest {
    pub txn_id: String,
}
