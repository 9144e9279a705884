use crate::finance::backend::{Caller, FinanceBackend};
use crate::finance::types::{PageRequest, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

/// One page of the caller's ledger for the wallet page.
///
/// A failed lookup is carried as `error` so the balance and top-up form still
/// render.
#[derive(Debug, Clone, Default)]
pub struct RecentTransactions {
    pub rows: Vec<Transaction>,
    pub total: u64,
    pub has_more: bool,
    pub error: Option<String>,
}

pub async fn load_recent_transactions(
    backend: &Arc<dyn FinanceBackend>,
    caller: &Caller,
    page: PageRequest,
) -> RecentTransactions {
    match backend.user_transactions(caller, page).await {
        Ok(list) => {
            for row in list.results.iter().filter(|row| !row.is_balanced()) {
                warn!(
                    transaction_id = %row.id,
                    kind = row.transaction_type.as_str(),
                    balance_before = %row.balance_before,
                    amount = %row.amount,
                    balance_after = %row.balance_after,
                    "Ledger row does not balance"
                );
            }
            debug!(user_id = %caller.user_id, count = list.results.len(), "Loaded recent transactions");
            RecentTransactions {
                total: list.count,
                has_more: list.next.is_some(),
                rows: list.results,
                error: None,
            }
        }
        Err(e) => {
            warn!(user_id = %caller.user_id, error = %e, "Recent transactions lookup failed");
            RecentTransactions {
                error: Some(e.user_message()),
                ..Default::default()
            }
        }
    }
}
