use crate::finance::backend::{Caller, FinanceBackend};
use crate::finance::error::{FinanceError, FinanceResult};
use crate::finance::types::Wallet;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const WALLET_LOAD_FAILED: &str = "Failed to load wallet";
const WALLET_NOT_FOUND: &str = "Wallet not found";

/// Where the wallet currently on screen came from.
///
/// The session snapshot is only a head start: it is shown straight away and is
/// replaced as soon as a fetch completes.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletSource {
    Session(Wallet),
    Fetched(Wallet),
}

impl WalletSource {
    pub fn wallet(&self) -> &Wallet {
        match self {
            WalletSource::Session(wallet) | WalletSource::Fetched(wallet) => wallet,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WalletSource::Session(_) => "session",
            WalletSource::Fetched(_) => "fetched",
        }
    }
}

/// Currency rendering with Indian digit grouping (`₹1,00,000.00`).
#[derive(Debug, Clone)]
pub struct CurrencyFormatter {
    symbol: String,
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::new("₹")
    }
}

impl CurrencyFormatter {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    pub fn format_decimal(&self, amount: Decimal) -> String {
        let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        rounded = rounded.abs();
        rounded.rescale(2);

        let text = rounded.to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        format!(
            "{}{}{}.{}",
            if negative { "-" } else { "" },
            self.symbol,
            group_indian(whole),
            fraction
        )
    }

    /// Non-finite or unrepresentable input formats as zero.
    pub fn format_f64(&self, amount: Option<f64>) -> String {
        let value = match amount {
            Some(v) if v.is_finite() => Decimal::from_f64(v).unwrap_or_else(|| {
                warn!(amount = v, "Amount out of range for display; showing zero");
                Decimal::ZERO
            }),
            Some(v) => {
                warn!(amount = %v, "Non-finite amount; showing zero");
                Decimal::ZERO
            }
            None => Decimal::ZERO,
        };
        self.format_decimal(value)
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// What the wallet page and `/api/wallet/balance` show.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSnapshot {
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub formatted_balance: String,
    pub wallet: Option<Wallet>,
    pub loading: bool,
    pub error: Option<String>,
    pub source: Option<&'static str>,
}

/// Resolves the caller's wallet and exposes a formatted balance.
///
/// One backend attempt per call; the caller decides whether to call again.
pub struct BalanceReader {
    backend: Arc<dyn FinanceBackend>,
    caller: Caller,
    formatter: CurrencyFormatter,
    source: Option<WalletSource>,
    loading: bool,
    error: Option<String>,
}

impl BalanceReader {
    pub fn new(
        backend: Arc<dyn FinanceBackend>,
        caller: Caller,
        formatter: CurrencyFormatter,
    ) -> Self {
        Self {
            backend,
            caller,
            formatter,
            source: None,
            loading: false,
            error: None,
        }
    }

    /// Installs the wallet embedded in the session, if it belongs to the caller.
    pub fn with_session_wallet(mut self, wallet: Option<Wallet>) -> Self {
        match wallet {
            Some(wallet) if wallet.user == self.caller.user_id => {
                debug!(user_id = %self.caller.user_id, wallet_id = %wallet.id, "Using session wallet snapshot");
                self.source = Some(WalletSource::Session(wallet));
            }
            Some(wallet) => {
                warn!(
                    user_id = %self.caller.user_id,
                    wallet_user = %wallet.user,
                    "Ignoring session wallet snapshot owned by another user"
                );
            }
            None => {}
        }
        self
    }

    /// Fetches only when nothing is installed yet.
    pub async fn load(&mut self) {
        if self.source.is_none() {
            self.refresh_balance().await;
        }
    }

    /// Fresh lookup. On failure the error is recorded; a session snapshot
    /// stays on screen, otherwise the wallet stays empty.
    pub async fn refresh_balance(&mut self) {
        self.loading = true;
        let result = self.fetch_wallet().await;
        self.loading = false;

        match result {
            Ok(wallet) => {
                debug!(user_id = %self.caller.user_id, wallet_id = %wallet.id, "Wallet fetched");
                self.error = None;
                self.source = Some(WalletSource::Fetched(wallet));
            }
            Err(e) => {
                warn!(user_id = %self.caller.user_id, error = %e, "Wallet lookup failed");
                self.error = Some(e.user_message());
            }
        }
    }

    async fn fetch_wallet(&self) -> FinanceResult<Wallet> {
        let envelope = self.backend.wallet_for_user(&self.caller).await?;
        if !envelope.success {
            return Err(FinanceError::Application {
                message: envelope
                    .message
                    .unwrap_or_else(|| WALLET_LOAD_FAILED.to_string()),
                status: None,
            });
        }
        envelope.data.ok_or_else(|| FinanceError::Application {
            message: WALLET_NOT_FOUND.to_string(),
            status: None,
        })
    }

    pub fn source(&self) -> Option<&WalletSource> {
        self.source.as_ref()
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.source.as_ref().map(WalletSource::wallet)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Zero while no wallet is installed.
    pub fn balance(&self) -> Decimal {
        self.wallet().map(|w| w.balance).unwrap_or(Decimal::ZERO)
    }

    pub fn format_balance(&self, amount: Option<f64>) -> String {
        match amount {
            Some(value) => self.formatter.format_f64(Some(value)),
            None => self.formatter.format_decimal(self.balance()),
        }
    }

    pub fn formatter(&self) -> &CurrencyFormatter {
        &self.formatter
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            balance: self.balance(),
            formatted_balance: self.format_balance(None),
            wallet: self.wallet().cloned(),
            loading: self.loading,
            error: self.error.clone(),
            source: self.source.as_ref().map(WalletSource::label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::types::{
        ApiEnvelope, InitiatePaymentRequest, PageRequest, Paginated, PaymentTransaction,
        Transaction, ValidatePaymentRequest,
    };
    use crate::gateway::form::PaymentFormData;
    use async_trait::async_trait;
    use serde_json::Value as JsonValue;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wallet(user: &str, balance: &str) -> Wallet {
        Wallet {
            id: format!("wallet-{}", user),
            user: user.to_string(),
            balance: Decimal::from_str(balance).unwrap(),
            created_at: None,
            updated_at: None,
        }
    }

    struct WalletBackend {
        response: FinanceResult<ApiEnvelope<Wallet>>,
        lookups: AtomicUsize,
    }

    impl WalletBackend {
        fn new(response: FinanceResult<ApiEnvelope<Wallet>>) -> Arc<Self> {
            Arc::new(Self {
                response,
                lookups: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FinanceBackend for WalletBackend {
        async fn initiate_payment(
            &self,
            _caller: &Caller,
            _request: InitiatePaymentRequest,
        ) -> FinanceResult<ApiEnvelope<PaymentFormData>> {
            unreachable!("balance reader never initiates")
        }

        async fn validate_payment(
            &self,
            _caller: &Caller,
            _request: ValidatePaymentRequest,
        ) -> FinanceResult<ApiEnvelope<PaymentTransaction>> {
            unreachable!("balance reader never validates")
        }

        async fn payment_callback(
            &self,
            _caller: &Caller,
            _txn_id: &str,
            _status: Option<&str>,
        ) -> FinanceResult<ApiEnvelope<JsonValue>> {
            unreachable!("balance reader never reads callbacks")
        }

        async fn wallet_for_user(&self, _caller: &Caller) -> FinanceResult<ApiEnvelope<Wallet>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }

        async fn user_transactions(
            &self,
            _caller: &Caller,
            _page: PageRequest,
        ) -> FinanceResult<Paginated<Transaction>> {
            unreachable!("balance reader never lists transactions")
        }
    }

    fn reader(backend: Arc<WalletBackend>) -> BalanceReader {
        BalanceReader::new(backend, Caller::new("42"), CurrencyFormatter::default())
    }

    #[test]
    fn formats_with_indian_grouping() {
        let f = CurrencyFormatter::default();
        assert_eq!(f.format_decimal(Decimal::from(500)), "₹500.00");
        assert_eq!(f.format_decimal(Decimal::from(1250)), "₹1,250.00");
        assert_eq!(f.format_decimal(Decimal::from(100000)), "₹1,00,000.00");
        assert_eq!(f.format_decimal(Decimal::from(12345678)), "₹1,23,45,678.00");
        assert_eq!(
            f.format_decimal(Decimal::from_str("1234.565").unwrap()),
            "₹1,234.57"
        );
        assert_eq!(f.format_decimal(Decimal::from(-50)), "-₹50.00");
    }

    #[test]
    fn non_finite_amounts_format_as_zero() {
        let f = CurrencyFormatter::default();
        assert_eq!(f.format_f64(None), "₹0.00");
        assert_eq!(f.format_f64(Some(f64::NAN)), "₹0.00");
        assert_eq!(f.format_f64(Some(f64::INFINITY)), "₹0.00");
        assert_eq!(f.format_f64(Some(-0.0)), "₹0.00");
        assert_eq!(f.format_f64(Some(99.5)), "₹99.50");
        // Finite but beyond what Decimal can hold.
        assert_eq!(f.format_f64(Some(1e30)), "₹0.00");
    }

    #[test]
    fn format_balance_without_wallet_is_zero() {
        let reader = reader(WalletBackend::new(Ok(ApiEnvelope::failure("unused"))));
        assert_eq!(reader.format_balance(None), "₹0.00");
        assert_eq!(reader.balance(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn session_snapshot_is_installed_without_fetching() {
        let backend = WalletBackend::new(Ok(ApiEnvelope::ok(wallet("42", "900"))));
        let mut reader = reader(backend.clone()).with_session_wallet(Some(wallet("42", "100")));

        assert_eq!(reader.balance(), Decimal::from(100));
        reader.load().await;
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(reader.snapshot().source, Some("session"));
    }

    #[tokio::test]
    async fn fetch_replaces_session_snapshot() {
        let backend = WalletBackend::new(Ok(ApiEnvelope::ok(wallet("42", "900"))));
        let mut reader = reader(backend.clone()).with_session_wallet(Some(wallet("42", "100")));

        reader.refresh_balance().await;
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 1);
        assert!(matches!(reader.source(), Some(WalletSource::Fetched(_))));
        assert_eq!(reader.format_balance(None), "₹900.00");
    }

    #[tokio::test]
    async fn foreign_session_wallet_is_ignored() {
        let backend = WalletBackend::new(Ok(ApiEnvelope::ok(wallet("42", "900"))));
        let mut reader = reader(backend.clone()).with_session_wallet(Some(wallet("7", "100")));

        assert!(reader.wallet().is_none());
        reader.load().await;
        assert_eq!(backend.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(reader.balance(), Decimal::from(900));
    }

    #[tokio::test]
    async fn failed_lookup_leaves_wallet_empty() {
        let backend = WalletBackend::new(Err(FinanceError::Network {
            message: "connection refused".to_string(),
        }));
        let mut reader = reader(backend);

        reader.load().await;
        let snapshot = reader.snapshot();
        assert!(snapshot.wallet.is_none());
        assert_eq!(snapshot.balance, Decimal::ZERO);
        assert_eq!(snapshot.formatted_balance, "₹0.00");
        assert!(!snapshot.loading);
        assert_eq!(
            snapshot.error.as_deref(),
            Some(crate::finance::error::NETWORK_ERROR_MESSAGE)
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_session_snapshot() {
        let backend = WalletBackend::new(Ok(ApiEnvelope::failure("Wallet service offline")));
        let mut reader = reader(backend).with_session_wallet(Some(wallet("42", "100")));

        reader.refresh_balance().await;
        assert_eq!(reader.balance(), Decimal::from(100));
        assert_eq!(reader.error(), Some("Wallet service offline"));
    }
}
