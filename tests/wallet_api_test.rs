//! Integration tests for the wallet page and the JSON wallet/payment routes

mod common;

use axum::body::Body;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::*;
use http::{Request, StatusCode};
use serde_json::{json, Value as JsonValue};
use wallet_console::finance::types::{ApiEnvelope, PageRequest};

fn balance_request(wallet_header: Option<&str>, uri: &str) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header("x-user-id", "42");
    if let Some(snapshot) = wallet_header {
        builder = builder.header("x-session-wallet", snapshot);
    }
    builder.body(Body::empty()).unwrap()
}

fn session_wallet(user: u64, balance: &str) -> String {
    STANDARD.encode(
        json!({ "id": 3, "user": user, "balance": balance })
            .to_string()
            .as_bytes(),
    )
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let backend = MockFinance::new();
    let request = Request::builder()
        .uri("/api/wallet/balance")
        .header("x-request-id", "req-77")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "SESSION_REQUIRED");
    assert_eq!(body["request_id"], "req-77");
    assert_eq!(backend.wallet_count(), 0);
}

#[tokio::test]
async fn test_dot_segment_user_id_never_reaches_backend() {
    let backend = MockFinance::new();
    let request = Request::builder()
        .uri("/api/wallet/balance")
        .header("x-user-id", "..")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "SESSION_REQUIRED");
    assert_eq!(backend.wallet_count(), 0);
}

#[tokio::test]
async fn test_balance_is_fetched_and_formatted() {
    let backend = MockFinance::new();

    let (status, _, body) = send(app(&backend), balance_request(None, "/api/wallet/balance")).await;

    assert_eq!(status, StatusCode::OK);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["formatted_balance"], "₹1,250.50");
    assert_eq!(body["data"]["balance"], json!(1250.5));
    assert_eq!(body["data"]["source"], "fetched");
    assert_eq!(body["data"]["loading"], false);
    assert_eq!(backend.wallet_count(), 1);
}

#[tokio::test]
async fn test_failed_lookup_formats_zero() {
    let backend = MockFinance::new();
    backend.set_wallet(Err(network_error("connection refused")));

    let (status, _, body) = send(app(&backend), balance_request(None, "/api/wallet/balance")).await;

    assert_eq!(status, StatusCode::OK);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["formatted_balance"], "₹0.00");
    assert_eq!(body["data"]["balance"], json!(0.0));
    assert!(body["data"]["wallet"].is_null());
    assert_eq!(
        body["data"]["error"],
        "Network error. Please check your connection and try again."
    );
}

#[tokio::test]
async fn test_session_wallet_is_used_until_refresh() {
    let backend = MockFinance::new();
    let snapshot = session_wallet(42, "100.00");

    let (_, _, body) = send(
        app(&backend),
        balance_request(Some(&snapshot), "/api/wallet/balance"),
    )
    .await;
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["source"], "session");
    assert_eq!(body["data"]["formatted_balance"], "₹100.00");
    assert_eq!(backend.wallet_count(), 0);

    let (_, _, body) = send(
        app(&backend),
        balance_request(Some(&snapshot), "/api/wallet/balance?refresh=true"),
    )
    .await;
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["source"], "fetched");
    assert_eq!(body["data"]["formatted_balance"], "₹1,250.50");
    assert_eq!(backend.wallet_count(), 1);
}

#[tokio::test]
async fn test_session_wallet_of_another_user_is_ignored() {
    let backend = MockFinance::new();
    let snapshot = session_wallet(7, "99999.00");

    let (_, _, body) = send(
        app(&backend),
        balance_request(Some(&snapshot), "/api/wallet/balance"),
    )
    .await;

    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["source"], "fetched");
    assert_eq!(backend.wallet_count(), 1);
}

#[tokio::test]
async fn test_wallet_page_renders_balance_form_and_ledger() {
    let backend = MockFinance::new();

    let (status, headers, page) = send(app(&backend), admin_get("/wallet")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert!(page.contains("₹1,250.50"));
    assert!(page.contains(r#"action="/wallet/topup""#));
    assert!(page.contains("Wallet top-up TXN-20260118-0001"));
    assert!(page.contains("SMS campaign"));
    assert!(page.contains("₹49.50"));
    assert_eq!(
        *backend.last_page.lock().unwrap(),
        Some(PageRequest::new(1, 10))
    );
}

#[tokio::test]
async fn test_wallet_page_hides_form_for_viewers() {
    let backend = MockFinance::new();
    let request = Request::builder()
        .uri("/wallet")
        .header("x-user-id", "42")
        .header("x-user-role", "viewer")
        .body(Body::empty())
        .unwrap();

    let (status, _, page) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("₹1,250.50"));
    assert!(!page.contains(r#"class="topup""#));
}

#[tokio::test]
async fn test_ledger_failure_does_not_block_wallet_page() {
    let backend = MockFinance::new();
    backend.set_transactions(Err(network_error("timeout")));

    let (status, _, page) = send(app(&backend), admin_get("/wallet?page=3")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("₹1,250.50"));
    assert!(page.contains(r#"class="topup""#));
    assert!(page.contains("Network error. Please check your connection and try again."));
    assert_eq!(
        *backend.last_page.lock().unwrap(),
        Some(PageRequest::new(3, 10))
    );
}

#[tokio::test]
async fn test_json_initiate_returns_descriptor() {
    let backend = MockFinance::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/initiate")
        .header("content-type", "application/json")
        .header("x-user-id", "42")
        .header("x-user-role", "institute_admin")
        .body(Body::from(json!({ "amount": 500, "remarks": "Term fees" }).to_string()))
        .unwrap();

    let (status, _, body) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::OK);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["TXNAMT"], "500.00");
    assert_eq!(body["data"]["MERCHANTID"], "1042");
    assert_eq!(
        body["data"]["gateway_url"],
        "https://gateway.example.com/connectips/loginpage"
    );
    assert_eq!(
        backend
            .last_initiate
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|r| r.remarks.clone())
            .as_deref(),
        Some("Term fees")
    );
}

#[tokio::test]
async fn test_json_initiate_rejects_invalid_amount() {
    let backend = MockFinance::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/initiate")
        .header("content-type", "application/json")
        .header("x-user-id", "42")
        .header("x-user-role", "admin")
        .header("x-request-id", "req-9")
        .body(Body::from(json!({ "amount": -10 }).to_string()))
        .unwrap();

    let (status, _, body) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "INVALID_AMOUNT");
    assert_eq!(body["message"], "Please enter a valid amount greater than 0");
    assert_eq!(body["request_id"], "req-9");
    assert_eq!(backend.initiate_count(), 0);
}

#[tokio::test]
async fn test_json_initiate_requires_topup_role() {
    let backend = MockFinance::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/initiate")
        .header("content-type", "application/json")
        .header("x-user-id", "42")
        .body(Body::from(json!({ "amount": 500 }).to_string()))
        .unwrap();

    let (status, _, body) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "FORBIDDEN");
    assert_eq!(backend.initiate_count(), 0);
}

#[tokio::test]
async fn test_json_initiate_surfaces_field_errors() {
    let backend = MockFinance::new();
    backend.set_initiate(Ok(ApiEnvelope::failure(
        "Amount: Ensure this value is less than or equal to 100000.",
    )));
    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/initiate")
        .header("content-type", "application/json")
        .header("x-user-id", "42")
        .header("x-user-role", "admin")
        .body(Body::from(json!({ "amount": 500 }).to_string()))
        .unwrap();

    let (status, _, body) = send(app(&backend), request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "FINANCE_API_ERROR");
    assert_eq!(
        body["message"],
        "Amount: Ensure this value is less than or equal to 100000."
    );
}
