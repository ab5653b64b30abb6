use std::fmt::Debug;

use crate::{
    db_types::{Observation, OrderId, Transaction},
    traits::{TransactionApiError, TransactionManagement},
};

/// Read-only queries over transactions and their observation history.
pub struct TransactionsApi<B> {
    db: B,
}

impl<B> Debug for TransactionsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionsApi")
    }
}

impl<B> TransactionsApi<B>
where B: TransactionManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn transaction(&self, order_id: &OrderId) -> Result<Option<Transaction>, TransactionApiError> {
        self.db.fetch_transaction(order_id).await
    }

    /// All of the user's transactions, newest first.
    pub async fn transactions_for_user(&self, user_id: &str) -> Result<Vec<Transaction>, TransactionApiError> {
        self.db.fetch_transactions_for_user(user_id).await
    }

    pub async fn observations(&self, order_id: &OrderId) -> Result<Vec<Observation>, TransactionApiError> {
        self.db.fetch_observations(order_id).await
    }
}
