//! Top-up flow components

pub mod balance;
pub mod callback;
pub mod payment;
pub mod reconciliation;
pub mod transactions;

pub use balance::{BalanceReader, BalanceSnapshot, CurrencyFormatter, WalletSource};
pub use callback::{AdvisoryStatus, CallbackQuery, CallbackState, CallbackValidator};
pub use payment::PaymentInitiator;
pub use reconciliation::{Outcome, ReconciliationView};
