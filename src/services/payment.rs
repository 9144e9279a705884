use crate::finance::backend::{Caller, FinanceBackend};
use crate::finance::error::{FinanceError, FinanceResult};
use crate::finance::types::InitiatePaymentRequest;
use crate::gateway::form::ValidatedPaymentForm;
use crate::services::balance::CurrencyFormatter;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub const INVALID_AMOUNT_MESSAGE: &str = "Please enter a valid amount greater than 0";
const INITIATE_FAILED_MESSAGE: &str = "Failed to initiate payment";

/// Checks a raw amount and rounds it to paisa precision.
///
/// Runs before any network call. The backend validates again; this is only
/// there so a bad amount never leaves the console.
pub fn validate_amount(amount: f64) -> FinanceResult<Decimal> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(FinanceError::validation(INVALID_AMOUNT_MESSAGE, Some("amount")));
    }
    let value = Decimal::from_f64(amount)
        .ok_or_else(|| FinanceError::validation(INVALID_AMOUNT_MESSAGE, Some("amount")))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if value <= Decimal::ZERO {
        return Err(FinanceError::validation(INVALID_AMOUNT_MESSAGE, Some("amount")));
    }
    Ok(value)
}

/// Parses the amount typed into the top-up form.
pub fn parse_amount(raw: &str) -> FinanceResult<f64> {
    let trimmed = raw.trim().replace(',', "");
    if trimmed.is_empty() {
        return Err(FinanceError::validation(INVALID_AMOUNT_MESSAGE, Some("amount")));
    }
    f64::from_str(&trimmed)
        .map_err(|_| FinanceError::validation(INVALID_AMOUNT_MESSAGE, Some("amount")))
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Submits a top-up to the backend and returns a descriptor that is safe to
/// hand to the gateway redirector.
pub struct PaymentInitiator {
    backend: Arc<dyn FinanceBackend>,
    max_amount: Option<Decimal>,
    formatter: CurrencyFormatter,
}

impl PaymentInitiator {
    pub fn new(backend: Arc<dyn FinanceBackend>) -> Self {
        Self {
            backend,
            max_amount: None,
            formatter: CurrencyFormatter::default(),
        }
    }

    pub fn with_max_amount(mut self, max_amount: Option<Decimal>) -> Self {
        self.max_amount = max_amount;
        self
    }

    pub fn with_formatter(mut self, formatter: CurrencyFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub async fn initiate_payment(
        &self,
        caller: &Caller,
        amount: f64,
        remarks: Option<String>,
        particulars: Option<String>,
    ) -> FinanceResult<ValidatedPaymentForm> {
        let amount = validate_amount(amount)?;
        if let Some(max) = self.max_amount {
            if amount > max {
                return Err(FinanceError::validation(
                    format!(
                        "Top-up amount cannot exceed {}",
                        self.formatter.format_decimal(max)
                    ),
                    Some("amount"),
                ));
            }
        }

        let request = InitiatePaymentRequest {
            amount,
            remarks: clean_text(remarks),
            particulars: clean_text(particulars),
        };

        info!(user_id = %caller.user_id, amount = %amount, "Initiating wallet top-up");

        let envelope = self.backend.initiate_payment(caller, request).await?;
        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| INITIATE_FAILED_MESSAGE.to_string());
            warn!(user_id = %caller.user_id, message = %message, "Top-up initiation rejected");
            return Err(FinanceError::Application {
                message,
                status: None,
            });
        }

        let descriptor = envelope.data.ok_or_else(|| FinanceError::InvalidResponse {
            message: "initiate response carried no payment form".to_string(),
        })?;

        let form = descriptor.validate().map_err(|e| {
            warn!(user_id = %caller.user_id, error = %e, "Gateway descriptor failed schema check");
            e
        })?;

        info!(
            user_id = %caller.user_id,
            txn_id = %form.txn_id(),
            field_count = form.field_count(),
            "Top-up initiated"
        );
        Ok(form)
    }
}
