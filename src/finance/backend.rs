use crate::finance::error::FinanceResult;
use crate::finance::types::{
    ApiEnvelope, InitiatePaymentRequest, PageRequest, Paginated, PaymentTransaction, Transaction,
    ValidatePaymentRequest, Wallet,
};
use crate::gateway::form::PaymentFormData;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Who the console is acting for when it talks to the finance API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub bearer_token: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            bearer_token: None,
        }
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    /// Gateway callbacks can land without a forwarded session.
    pub fn anonymous() -> Self {
        Self::new("")
    }
}

/// The finance REST API, as consumed by the top-up flow.
#[async_trait]
pub trait FinanceBackend: Send + Sync {
    /// `POST /api/finance/payment/initiate/`
    async fn initiate_payment(
        &self,
        caller: &Caller,
        request: InitiatePaymentRequest,
    ) -> FinanceResult<ApiEnvelope<PaymentFormData>>;

    /// `POST /api/finance/payment/validate/`. Assumed idempotent per `txn_id`.
    async fn validate_payment(
        &self,
        caller: &Caller,
        request: ValidatePaymentRequest,
    ) -> FinanceResult<ApiEnvelope<PaymentTransaction>>;

    /// `GET /api/finance/payment/callback/?txn_id&status`
    ///
    /// Informational mirror of the gateway return. Never used to decide the
    /// outcome of a payment; `validate_payment` is authoritative.
    async fn payment_callback(
        &self,
        caller: &Caller,
        txn_id: &str,
        status: Option<&str>,
    ) -> FinanceResult<ApiEnvelope<JsonValue>>;

    /// `GET /api/finance/wallet/user/{userId}/`
    async fn wallet_for_user(&self, caller: &Caller) -> FinanceResult<ApiEnvelope<Wallet>>;

    /// `GET /api/finance/transaction/user/{userId}/transactions`
    async fn user_transactions(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> FinanceResult<Paginated<Transaction>>;
}
