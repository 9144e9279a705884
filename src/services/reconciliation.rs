use crate::finance::types::PaymentStatus;
use crate::pages;
use crate::services::balance::CurrencyFormatter;
use crate::services::callback::CallbackState;
use maud::{html, Markup};

pub const PROCESSING_MESSAGE: &str = "Processing your payment…";
pub const SUCCESS_MESSAGE: &str = "Your wallet has been topped up";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Your payment could not be completed. No amount has been added to your wallet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Processing,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Processing => "processing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSummary {
    pub txn_id: String,
    pub amount: String,
    pub status: PaymentStatus,
    pub completed_at: Option<String>,
}

/// View model for the page the gateway returns to.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationView {
    pub outcome: Outcome,
    pub heading: &'static str,
    pub message: String,
    pub summary: Option<PaymentSummary>,
    pub wallet_path: String,
}

impl ReconciliationView {
    /// Success is decided from the verified backend status only.
    pub fn from_state(
        state: &CallbackState,
        formatter: &CurrencyFormatter,
        wallet_path: &str,
    ) -> Self {
        let (outcome, message, summary) = match state {
            CallbackState::AwaitingParams | CallbackState::Validating { .. } => {
                (Outcome::Processing, PROCESSING_MESSAGE.to_string(), None)
            }
            CallbackState::Failed(error) => (Outcome::Failure, error.clone(), None),
            CallbackState::Resolved(verified) => {
                let payment = verified.transaction();
                let summary = PaymentSummary {
                    txn_id: payment.txn_id.clone(),
                    amount: formatter.format_decimal(payment.amount),
                    status: payment.status,
                    completed_at: payment
                        .completed_at
                        .map(|t| t.format("%d %b %Y, %H:%M UTC").to_string()),
                };
                match payment.status {
                    PaymentStatus::Success => {
                        (Outcome::Success, SUCCESS_MESSAGE.to_string(), Some(summary))
                    }
                    PaymentStatus::Pending => {
                        (Outcome::Processing, PROCESSING_MESSAGE.to_string(), Some(summary))
                    }
                    PaymentStatus::Failed | PaymentStatus::Error | PaymentStatus::Cancelled => {
                        let message = payment
                            .error_message
                            .as_deref()
                            .map(str::trim)
                            .filter(|m| !m.is_empty())
                            .unwrap_or(GENERIC_FAILURE_MESSAGE)
                            .to_string();
                        (Outcome::Failure, message, Some(summary))
                    }
                }
            }
        };

        let heading = match outcome {
            Outcome::Success => "Payment Successful",
            Outcome::Failure => "Payment Failed",
            Outcome::Processing => "Processing Payment",
        };

        Self {
            outcome,
            heading,
            message,
            summary,
            wallet_path: wallet_path.to_string(),
        }
    }

    pub fn offers_retry(&self) -> bool {
        self.outcome != Outcome::Success
    }

    pub fn render(&self) -> Markup {
        let body = html! {
            section class="reconciliation" data-outcome=(self.outcome.as_str()) {
                @match self.outcome {
                    Outcome::Success => {
                        div class="icon icon-success" aria-hidden="true" { "✓" }
                    }
                    Outcome::Failure => {
                        div class="icon icon-failure" aria-hidden="true" { "✕" }
                    }
                    Outcome::Processing => {
                        div class="spinner" role="status" aria-live="polite" {}
                    }
                }
                h1 { (self.heading) }
                p class="message" { (self.message) }
                @if let Some(summary) = &self.summary {
                    dl class="summary" {
                        dt { "Transaction ID" }
                        dd { (summary.txn_id) }
                        dt { "Amount" }
                        dd { (summary.amount) }
                        dt { "Status" }
                        dd { (summary.status.as_str()) }
                        @if let Some(completed_at) = &summary.completed_at {
                            dt { "Completed" }
                            dd { (completed_at) }
                        }
                    }
                }
                div class="actions" {
                    a class="button button-primary" href=(self.wallet_path) { "Go to Wallet" }
                    @if self.offers_retry() {
                        a class="button button-secondary" href=(self.wallet_path) { "Try Again" }
                    }
                }
            }
        };
        pages::layout(self.heading, body)
    }
}
