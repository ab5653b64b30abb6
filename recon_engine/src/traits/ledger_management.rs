use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, OrderId, PayoutDestination, Points, UserAccount, WithdrawalStatus},
    recon_api::ledger_objects::{LedgerQuery, LedgerTotals},
    traits::data_objects::CreditResult,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Insufficient balance. Requested {requested}, but only {available} is available")]
    InsufficientBalance { requested: Points, available: Points },
    #[error("A withdrawal cannot move from {from} to {to}")]
    InvalidTransition { from: WithdrawalStatus, to: WithdrawalStatus },
    #[error("Withdrawal {0} does not exist")]
    WithdrawalNotFound(i64),
    #[error("The transaction for order {0} does not exist")]
    TransactionNotFound(OrderId),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// Management of the rewards points ledger.
///
/// The ledger is the source of truth for balances. The `reward_points` field on a user's account is a cache that
/// [`LedgerManagement::recompute_balance`] can always rebuild.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Credits points for the order if its transaction is in a reward-eligible status and has not been credited before.
    ///
    /// Safe to call any number of times, including concurrently. At most one earned entry is ever written per
    /// transaction.
    async fn credit_if_eligible(&self, order_id: &OrderId) -> Result<CreditResult, LedgerError>;

    /// Requests a withdrawal of `points` to the given destination.
    ///
    /// The balance is recomputed from the ledger and checked while the user's row is locked, so concurrent
    /// withdrawals can never overdraw the account. The new entry is `pending`.
    async fn request_withdrawal(
        &self,
        user_id: &str,
        points: Points,
        destination: PayoutDestination,
    ) -> Result<LedgerEntry, LedgerError>;

    /// Moves a pending withdrawal to `completed` or `failed`. Failed withdrawals return their points to the balance.
    async fn update_withdrawal_status(
        &self,
        entry_id: i64,
        status: WithdrawalStatus,
    ) -> Result<LedgerEntry, LedgerError>;

    /// Rebuilds the user's balance from the ledger, writes it to the cache and returns it.
    ///
    /// Eligible transactions that are missing an earned entry are credited first.
    async fn recompute_balance(&self, user_id: &str) -> Result<Points, LedgerError>;

    async fn fetch_user_account(&self, user_id: &str) -> Result<Option<UserAccount>, LedgerError>;

    /// Returns a page of ledger entries, newest first, along with the total number of matching entries.
    async fn fetch_ledger_entries(&self, query: LedgerQuery) -> Result<(Vec<LedgerEntry>, i64), LedgerError>;

    async fn fetch_ledger_totals(&self, user_id: &str) -> Result<LedgerTotals, LedgerError>;
}
