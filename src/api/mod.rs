//! Console HTTP surface

pub mod payment;
pub mod session;
pub mod wallet;

use crate::config::ConsoleConfig;
use crate::finance::backend::FinanceBackend;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Shared, read-only state for every console route.
#[derive(Clone)]
pub struct ConsoleState {
    pub backend: Arc<dyn FinanceBackend>,
    pub config: Arc<ConsoleConfig>,
}

impl ConsoleState {
    pub fn new(backend: Arc<dyn FinanceBackend>, config: ConsoleConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }
}

pub const CALLBACK_PATH: &str = "/payment/callback";

pub fn topup_path(config: &ConsoleConfig) -> String {
    format!("{}/topup", config.wallet_page_path.trim_end_matches('/'))
}

/// Wallet page, top-up, gateway callback and their JSON variants.
pub fn router(state: ConsoleState) -> Router {
    let wallet_path = state.config.wallet_page_path.clone();
    let topup = topup_path(&state.config);

    Router::new()
        .route(&wallet_path, get(wallet::wallet_page))
        .route(&topup, post(wallet::submit_topup))
        .route(CALLBACK_PATH, get(payment::payment_callback))
        .route("/api/wallet/balance", get(wallet::get_balance))
        .route("/api/payment/initiate", post(wallet::initiate_payment_json))
        .with_state(state)
}
