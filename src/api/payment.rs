use crate::api::session::SessionContext;
use crate::api::ConsoleState;
use crate::finance::backend::Caller;
use crate::services::balance::CurrencyFormatter;
use crate::services::callback::{CallbackQuery, CallbackValidator};
use crate::services::reconciliation::ReconciliationView;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::info;

/// `GET /payment/callback?txn_id&status`
///
/// The gateway sends the browser here after a payment attempt. The session may
/// not be forwarded on this hop, so the validate call falls back to the
/// service credentials.
pub async fn payment_callback(
    State(state): State<ConsoleState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let caller = SessionContext::from_headers(&headers)
        .map(|session| session.caller())
        .unwrap_or_else(|_| Caller::anonymous());

    info!(
        user_id = %caller.user_id,
        has_txn_id = query.txn_id.is_some(),
        "Gateway callback received"
    );

    let outcome = CallbackValidator::new(state.backend.clone(), caller)
        .run(query)
        .await;

    let view = ReconciliationView::from_state(
        &outcome,
        &CurrencyFormatter::new(state.config.currency_symbol.clone()),
        &state.config.wallet_page_path,
    );

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Html(view.render().into_string()),
    )
        .into_response()
}
