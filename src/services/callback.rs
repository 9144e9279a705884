//! Callback validation state machine
//!
//! Driven once per load of the gateway return route. The gateway appends
//! `txn_id` and `status` to the return URL; only `txn_id` is used, and the
//! outcome comes from the backend validate endpoint.

use crate::finance::backend::{Caller, FinanceBackend};
use crate::finance::error::FinanceError;
use crate::finance::types::{PaymentStatus, PaymentTransaction, ValidatePaymentRequest};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MISSING_TXN_ID_MESSAGE: &str = "Transaction ID is missing from callback URL";
pub const UNEXPECTED_ERROR_PREFIX: &str = "An unexpected error occurred: ";
pub const NO_TRANSACTION_DATA_MESSAGE: &str = "Payment validation returned no transaction data";
const VALIDATION_FAILED_MESSAGE: &str = "Payment validation failed";

/// Query string of the gateway return URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub txn_id: Option<String>,
    pub status: Option<String>,
}

/// What the redirect URL claims happened. Attacker-controllable.
///
/// Has no conversion to or comparison with `PaymentStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryStatus(String);

impl AdvisoryStatus {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| AdvisoryStatus(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the hint and the backend verdict tell different stories.
    pub fn disagrees_with(&self, verified: &VerifiedPayment) -> bool {
        let hint = self.0.to_ascii_lowercase();
        let hint_success = matches!(hint.as_str(), "success" | "successful" | "completed");
        hint_success != verified.status().is_success()
    }
}

impl fmt::Display for AdvisoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment record as returned by the validate endpoint and checked for
/// internal consistency. The only source of truth for the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment(PaymentTransaction);

impl VerifiedPayment {
    pub fn verify(payment: PaymentTransaction) -> Result<Self, FinanceError> {
        payment.check_amount_scale()?;
        Ok(VerifiedPayment(payment))
    }

    pub fn status(&self) -> PaymentStatus {
        self.0.status
    }

    pub fn transaction(&self) -> &PaymentTransaction {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackState {
    AwaitingParams,
    Validating { txn_id: String },
    Resolved(VerifiedPayment),
    Failed(String),
}

impl CallbackState {
    pub fn is_settled(&self) -> bool {
        matches!(self, CallbackState::Resolved(_) | CallbackState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallbackState::AwaitingParams => "awaiting_params",
            CallbackState::Validating { .. } => "validating",
            CallbackState::Resolved(_) => "resolved",
            CallbackState::Failed(_) => "failed",
        }
    }
}

/// Failure message for the callback page.
///
/// Backend answers are shown verbatim; anything else is wrapped.
fn failure_message(err: &FinanceError) -> String {
    match err {
        FinanceError::Application { message, .. } => message.clone(),
        FinanceError::AmountMismatch { .. } => err.to_string(),
        other => format!("{}{}", UNEXPECTED_ERROR_PREFIX, other.detail()),
    }
}

pub struct CallbackValidator {
    backend: Arc<dyn FinanceBackend>,
    caller: Caller,
}

impl CallbackValidator {
    pub fn new(backend: Arc<dyn FinanceBackend>, caller: Caller) -> Self {
        Self { backend, caller }
    }

    /// Drives the machine to a settled state. Issues at most one validate call.
    pub async fn run(&self, query: CallbackQuery) -> CallbackState {
        let advisory = AdvisoryStatus::parse(query.status.as_deref());
        let mut state = CallbackState::AwaitingParams;

        loop {
            debug!(state = state.name(), "callback validator step");
            state = match state {
                CallbackState::AwaitingParams => {
                    match query.txn_id.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                        Some(txn_id) => CallbackState::Validating {
                            txn_id: txn_id.to_string(),
                        },
                        None => {
                            warn!("Gateway callback arrived without txn_id");
                            CallbackState::Failed(MISSING_TXN_ID_MESSAGE.to_string())
                        }
                    }
                }
                CallbackState::Validating { txn_id } => {
                    self.validate(&txn_id, advisory.as_ref()).await
                }
                settled => return settled,
            };
        }
    }

    async fn validate(&self, txn_id: &str, advisory: Option<&AdvisoryStatus>) -> CallbackState {
        info!(txn_id = %txn_id, advisory_status = ?advisory.map(AdvisoryStatus::as_str), "Validating gateway callback");

        let result = self
            .backend
            .validate_payment(
                &self.caller,
                ValidatePaymentRequest {
                    txn_id: txn_id.to_string(),
                },
            )
            .await;

        let envelope = match result {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(txn_id = %txn_id, error = %e, "Payment validation request failed");
                return CallbackState::Failed(failure_message(&e));
            }
        };

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| VALIDATION_FAILED_MESSAGE.to_string());
            warn!(txn_id = %txn_id, message = %message, "Payment validation rejected");
            return CallbackState::Failed(message);
        }

        let Some(payment) = envelope.data else {
            warn!(txn_id = %txn_id, "Payment validation returned no data");
            return CallbackState::Failed(NO_TRANSACTION_DATA_MESSAGE.to_string());
        };

        if payment.txn_id != txn_id {
            warn!(
                requested = %txn_id,
                returned = %payment.txn_id,
                "Validated transaction id differs from callback txn_id"
            );
        }

        let verified = match VerifiedPayment::verify(payment) {
            Ok(verified) => verified,
            Err(e) => {
                warn!(txn_id = %txn_id, error = %e, "Validated payment is inconsistent");
                return CallbackState::Failed(failure_message(&e));
            }
        };

        if let Some(hint) = advisory {
            if hint.disagrees_with(&verified) {
                warn!(
                    txn_id = %txn_id,
                    advisory_status = %hint,
                    verified_status = %verified.status(),
                    "Callback status hint disagrees with backend; using backend status"
                );
            }
        }

        info!(txn_id = %txn_id, status = %verified.status(), "Payment validated");
        CallbackState::Resolved(verified)
    }
}
