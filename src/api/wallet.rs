use crate::api::session::SessionContext;
use crate::api::{topup_path, ConsoleState};
use crate::error::{AppError, AppErrorKind, SessionError};
use crate::finance::error::FinanceError;
use crate::finance::types::{PageRequest, Transaction};
use crate::gateway::redirect::redirect_to_gateway;
use crate::middleware::error::success_response;
use crate::pages;
use crate::services::balance::{BalanceReader, BalanceSnapshot, CurrencyFormatter};
use crate::services::payment::{parse_amount, PaymentInitiator};
use crate::services::transactions::{load_recent_transactions, RecentTransactions};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use maud::{html, Markup};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct WalletPageQuery {
    #[serde(default)]
    pub refresh: bool,
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopUpForm {
    #[serde(default)]
    pub amount: String,
    pub remarks: Option<String>,
    pub particulars: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InitiateBody {
    pub amount: f64,
    pub remarks: Option<String>,
    pub particulars: Option<String>,
}

fn formatter(state: &ConsoleState) -> CurrencyFormatter {
    CurrencyFormatter::new(state.config.currency_symbol.clone())
}

fn initiator(state: &ConsoleState) -> PaymentInitiator {
    PaymentInitiator::new(state.backend.clone())
        .with_max_amount(state.config.max_topup_amount)
        .with_formatter(formatter(state))
}

async fn read_balance(state: &ConsoleState, session: &SessionContext, refresh: bool) -> BalanceReader {
    let mut reader = BalanceReader::new(state.backend.clone(), session.caller(), formatter(state))
        .with_session_wallet(session.wallet.clone());
    if refresh {
        reader.refresh_balance().await;
    } else {
        reader.load().await;
    }
    reader
}

struct WalletPage<'a> {
    balance: BalanceSnapshot,
    transactions: RecentTransactions,
    formatter: &'a CurrencyFormatter,
    can_top_up: bool,
    topup_action: String,
    form: &'a TopUpForm,
    form_error: Option<String>,
}

fn transaction_row(row: &Transaction, formatter: &CurrencyFormatter) -> Markup {
    html! {
        tr data-balanced=(if row.is_balanced() { "true" } else { "false" }) {
            td { (row.created_at.map(|t| t.format("%d %b %Y").to_string()).unwrap_or_default()) }
            td { (row.description) }
            td { (row.transaction_type.as_str()) }
            td class="amount" { (formatter.format_decimal(row.amount.abs())) }
            td class="amount" { (formatter.format_decimal(row.balance_after)) }
            td { (row.status.as_str()) }
        }
    }
}

fn render_wallet_page(page: &WalletPage<'_>) -> Markup {
    let body = html! {
        section class="wallet" {
            h1 { "Wallet" }
            div class="balance-card" data-source=(page.balance.source.unwrap_or("none")) {
                span class="label" { "Available balance" }
                strong class="balance" { (page.balance.formatted_balance) }
                @if let Some(error) = &page.balance.error {
                    p class="alert alert-warning" { (error) }
                }
                a class="button button-link" href="?refresh=true" { "Refresh" }
            }

            @if page.can_top_up {
                form class="topup" method="post" action=(page.topup_action) {
                    h2 { "Top up wallet" }
                    (pages::error_banner(page.form_error.as_deref()))
                    label for="amount" { "Amount" }
                    input id="amount" name="amount" type="number" min="0.01" step="0.01"
                        required value=(page.form.amount);
                    label for="remarks" { "Remarks" }
                    input id="remarks" name="remarks" type="text" maxlength="50"
                        value=(page.form.remarks.as_deref().unwrap_or_default());
                    label for="particulars" { "Particulars" }
                    input id="particulars" name="particulars" type="text" maxlength="100"
                        value=(page.form.particulars.as_deref().unwrap_or_default());
                    button type="submit" class="button button-primary" { "Proceed to Payment" }
                }
            } @else {
                (pages::error_banner(page.form_error.as_deref()))
            }

            section class="transactions" {
                h2 { "Recent transactions" }
                @if let Some(error) = &page.transactions.error {
                    p class="alert alert-warning" { (error) }
                } @else if page.transactions.rows.is_empty() {
                    p class="empty" { "No transactions yet" }
                } @else {
                    table {
                        thead {
                            tr {
                                th { "Date" }
                                th { "Description" }
                                th { "Type" }
                                th { "Amount" }
                                th { "Balance" }
                                th { "Status" }
                            }
                        }
                        tbody {
                            @for row in &page.transactions.rows {
                                (transaction_row(row, page.formatter))
                            }
                        }
                    }
                }
            }
        }
    };
    pages::layout("Wallet", body)
}

async fn wallet_response(
    state: &ConsoleState,
    session: &SessionContext,
    status: StatusCode,
    refresh: bool,
    page: u32,
    form: &TopUpForm,
    form_error: Option<String>,
) -> Response {
    let reader = read_balance(state, session, refresh).await;
    let transactions = load_recent_transactions(
        &state.backend,
        &session.caller(),
        PageRequest::new(page, state.config.recent_transactions_page_size),
    )
    .await;

    let view = WalletPage {
        balance: reader.snapshot(),
        transactions,
        formatter: reader.formatter(),
        can_top_up: state.config.can_top_up(session.role()),
        topup_action: topup_path(&state.config),
        form,
        form_error,
    };

    (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Html(render_wallet_page(&view).into_string()),
    )
        .into_response()
}

/// `GET /wallet`
pub async fn wallet_page(
    State(state): State<ConsoleState>,
    session: SessionContext,
    Query(query): Query<WalletPageQuery>,
) -> Response {
    info!(user_id = %session.user_id, refresh = query.refresh, "Wallet page requested");
    wallet_response(
        &state,
        &session,
        StatusCode::OK,
        query.refresh,
        query.page.unwrap_or(1),
        &TopUpForm::default(),
        None,
    )
    .await
}

fn topup_failure_status(err: &FinanceError) -> StatusCode {
    match err {
        FinanceError::Validation { field, .. } if field.as_deref() == Some("amount") => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// `POST /wallet/topup`
///
/// Success hands the browser to the gateway; any failure re-renders the wallet
/// page with the error above the form.
pub async fn submit_topup(
    State(state): State<ConsoleState>,
    session: SessionContext,
    Form(form): Form<TopUpForm>,
) -> Response {
    if !state.config.can_top_up(session.role()) {
        warn!(user_id = %session.user_id, role = ?session.role(), "Top-up attempted without permission");
        let err = AppError::new(AppErrorKind::Session(SessionError::RoleNotAllowed {
            role: session.role.clone(),
        }));
        return wallet_response(
            &state,
            &session,
            StatusCode::FORBIDDEN,
            false,
            1,
            &form,
            Some(err.user_message()),
        )
        .await;
    }

    let result = match parse_amount(&form.amount) {
        Ok(amount) => {
            initiator(&state)
                .initiate_payment(
                    &session.caller(),
                    amount,
                    form.remarks.clone(),
                    form.particulars.clone(),
                )
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(descriptor) => redirect_to_gateway(descriptor).into_response(),
        Err(e) => {
            warn!(
                user_id = %session.user_id,
                error = %e,
                client_side = e.is_client_side(),
                retryable = e.is_retryable(),
                "Top-up initiation failed"
            );
            wallet_response(
                &state,
                &session,
                topup_failure_status(&e),
                false,
                1,
                &form,
                Some(e.user_message()),
            )
            .await
        }
    }
}

/// `GET /api/wallet/balance`
pub async fn get_balance(
    State(state): State<ConsoleState>,
    session: SessionContext,
    Query(query): Query<WalletPageQuery>,
) -> impl IntoResponse {
    let reader = read_balance(&state, &session, query.refresh).await;
    success_response(reader.snapshot())
}

/// `POST /api/payment/initiate`
pub async fn initiate_payment_json(
    State(state): State<ConsoleState>,
    session: SessionContext,
    Json(body): Json<InitiateBody>,
) -> Result<impl IntoResponse, AppError> {
    let with_request_id = |err: AppError| match &session.request_id {
        Some(id) => err.with_request_id(id.clone()),
        None => err,
    };

    if !state.config.can_top_up(session.role()) {
        return Err(with_request_id(AppError::new(AppErrorKind::Session(
            SessionError::RoleNotAllowed {
                role: session.role.clone(),
            },
        ))));
    }

    let descriptor = initiator(&state)
        .initiate_payment(&session.caller(), body.amount, body.remarks, body.particulars)
        .await
        .map_err(|e| with_request_id(AppError::from(e)))?;

    Ok(success_response(descriptor))
}
