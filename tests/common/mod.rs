//! Shared in-memory finance backend for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, response::Response, Router};
use http::Request;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use wallet_console::api::{self, ConsoleState};
use wallet_console::config::ConsoleConfig;
use wallet_console::finance::backend::{Caller, FinanceBackend};
use wallet_console::finance::error::{FinanceError, FinanceResult};
use wallet_console::finance::types::{
    ApiEnvelope, InitiatePaymentRequest, PageRequest, Paginated, PaymentTransaction, Transaction,
    ValidatePaymentRequest, Wallet,
};
use wallet_console::gateway::form::PaymentFormData;

pub const TXN_ID: &str = "TXN-20260118-0001";

pub fn descriptor_json() -> JsonValue {
    json!({
        "MERCHANTID": 1042,
        "APPID": "MER-1042-APP-1",
        "APPNAME": "Console Wallet",
        "TXNID": TXN_ID,
        "TXNDATE": "18-01-2026",
        "TXNCRNCY": "NPR",
        "TXNAMT": "500.00",
        "REFERENCEID": "REF-0001",
        "REMARKS": "Wallet top-up",
        "PARTICULARS": "Top-up",
        "TOKEN": "c2lnbmVkLXRva2VuLXZhbHVl",
        "gateway_url": "https://gateway.example.com/connectips/loginpage",
        "success_url": "https://console.example.com/payment/callback?status=success",
        "failure_url": "https://console.example.com/payment/callback?status=failure"
    })
}

pub fn descriptor() -> PaymentFormData {
    serde_json::from_value(descriptor_json()).expect("descriptor fixture should deserialize")
}

pub fn payment(status: &str) -> PaymentTransaction {
    serde_json::from_value(json!({
        "id": 91,
        "user": 42,
        "wallet": 3,
        "txn_id": TXN_ID,
        "reference_id": "REF-0001",
        "amount": "500.00",
        "amount_paisa": 50000,
        "status": status,
        "completed_at": "2026-01-18T09:30:00Z"
    }))
    .expect("payment fixture should deserialize")
}

pub fn wallet(balance: &str) -> Wallet {
    serde_json::from_value(json!({
        "id": 3,
        "user": 42,
        "balance": balance,
        "created_at": "2025-11-02T10:00:00Z"
    }))
    .expect("wallet fixture should deserialize")
}

pub fn ledger() -> Paginated<Transaction> {
    serde_json::from_value(json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            {
                "id": 501,
                "wallet": 3,
                "amount": "500.00",
                "transaction_type": "CREDIT",
                "balance_before": "750.50",
                "balance_after": "1250.50",
                "description": "Wallet top-up TXN-20260118-0001",
                "status": "COMPLETED",
                "created_at": "2026-01-18T09:30:05Z"
            },
            {
                "id": 500,
                "wallet": 3,
                "amount": "-49.50",
                "transaction_type": "DEBIT",
                "balance_before": "800.00",
                "balance_after": "750.50",
                "description": "SMS campaign",
                "performed_by": 7,
                "status": "COMPLETED",
                "created_at": "2026-01-17T14:00:00Z"
            }
        ]
    }))
    .expect("ledger fixture should deserialize")
}

pub struct MockFinance {
    pub initiate_response: Mutex<FinanceResult<ApiEnvelope<PaymentFormData>>>,
    pub validate_response: Mutex<FinanceResult<ApiEnvelope<PaymentTransaction>>>,
    pub wallet_response: Mutex<FinanceResult<ApiEnvelope<Wallet>>>,
    pub transactions_response: Mutex<FinanceResult<Paginated<Transaction>>>,
    pub initiate_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub callback_calls: AtomicUsize,
    pub wallet_calls: AtomicUsize,
    pub transactions_calls: AtomicUsize,
    pub last_initiate: Mutex<Option<InitiatePaymentRequest>>,
    pub last_validate: Mutex<Option<String>>,
    pub last_page: Mutex<Option<PageRequest>>,
}

impl MockFinance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            initiate_response: Mutex::new(Ok(ApiEnvelope::ok(descriptor()))),
            validate_response: Mutex::new(Ok(ApiEnvelope::ok(payment("SUCCESS")))),
            wallet_response: Mutex::new(Ok(ApiEnvelope::ok(wallet("1250.50")))),
            transactions_response: Mutex::new(Ok(ledger())),
            initiate_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            callback_calls: AtomicUsize::new(0),
            wallet_calls: AtomicUsize::new(0),
            transactions_calls: AtomicUsize::new(0),
            last_initiate: Mutex::new(None),
            last_validate: Mutex::new(None),
            last_page: Mutex::new(None),
        })
    }

    pub fn set_initiate(&self, response: FinanceResult<ApiEnvelope<PaymentFormData>>) {
        *self.initiate_response.lock().unwrap() = response;
    }

    pub fn set_validate(&self, response: FinanceResult<ApiEnvelope<PaymentTransaction>>) {
        *self.validate_response.lock().unwrap() = response;
    }

    pub fn set_wallet(&self, response: FinanceResult<ApiEnvelope<Wallet>>) {
        *self.wallet_response.lock().unwrap() = response;
    }

    pub fn set_transactions(&self, response: FinanceResult<Paginated<Transaction>>) {
        *self.transactions_response.lock().unwrap() = response;
    }

    pub fn initiate_count(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn validate_count(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn wallet_count(&self) -> usize {
        self.wallet_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FinanceBackend for MockFinance {
    async fn initiate_payment(
        &self,
        _caller: &Caller,
        request: InitiatePaymentRequest,
    ) -> FinanceResult<ApiEnvelope<PaymentFormData>> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_initiate.lock().unwrap() = Some(request);
        self.initiate_response.lock().unwrap().clone()
    }

    async fn validate_payment(
        &self,
        _caller: &Caller,
        request: ValidatePaymentRequest,
    ) -> FinanceResult<ApiEnvelope<PaymentTransaction>> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_validate.lock().unwrap() = Some(request.txn_id);
        self.validate_response.lock().unwrap().clone()
    }

    async fn payment_callback(
        &self,
        _caller: &Caller,
        txn_id: &str,
        status: Option<&str>,
    ) -> FinanceResult<ApiEnvelope<JsonValue>> {
        self.callback_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ApiEnvelope::ok(json!({ "txn_id": txn_id, "status": status })))
    }

    async fn wallet_for_user(&self, caller: &Caller) -> FinanceResult<ApiEnvelope<Wallet>> {
        self.wallet_calls.fetch_add(1, Ordering::SeqCst);
        if caller.user_id.is_empty() {
            return Err(FinanceError::validation("user id is required", Some("user_id")));
        }
        self.wallet_response.lock().unwrap().clone()
    }

    async fn user_transactions(
        &self,
        _caller: &Caller,
        page: PageRequest,
    ) -> FinanceResult<Paginated<Transaction>> {
        self.transactions_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_page.lock().unwrap() = Some(page);
        self.transactions_response.lock().unwrap().clone()
    }
}

pub fn app(backend: &Arc<MockFinance>) -> Router {
    app_with_config(backend, ConsoleConfig::default())
}

pub fn app_with_config(backend: &Arc<MockFinance>, config: ConsoleConfig) -> Router {
    let backend: Arc<dyn FinanceBackend> = backend.clone();
    api::router(ConsoleState::new(backend, config))
}

pub fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", "42")
        .header("x-user-role", "admin")
        .body(Body::empty())
        .unwrap()
}

pub fn topup_request(role: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/wallet/topup")
        .header("content-type", "application/x-www-form-urlencoded")
        .header("x-user-id", "42")
        .header("x-user-role", role)
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (http::StatusCode, http::HeaderMap, String) {
    let response: Response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn network_error(message: &str) -> FinanceError {
    FinanceError::Network {
        message: message.to_string(),
    }
}
