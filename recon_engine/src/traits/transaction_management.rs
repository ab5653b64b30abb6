use thiserror::Error;

use crate::db_types::{Observation, OrderId, Transaction};

#[derive(Debug, Clone, Error)]
pub enum TransactionApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Invalid query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for TransactionApiError {
    fn from(e: sqlx::Error) -> Self {
        TransactionApiError::DatabaseError(e.to_string())
    }
}

/// Read-only access to transactions and their observation log.
#[allow(async_fn_in_trait)]
pub trait TransactionManagement {
    /// Fetches the transaction for the given provider order id, if it exists.
    async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<Transaction>, TransactionApiError>;

    /// Fetches all transactions belonging to `user_id`, newest first.
    async fn fetch_transactions_for_user(&self, user_id: &str) -> Result<Vec<Transaction>, TransactionApiError>;

    /// Fetches up to `limit` transactions that are not yet in a terminal status.
    ///
    /// Transactions that have never been polled come first, followed by those polled least recently.
    async fn fetch_open_transactions(&self, limit: i64) -> Result<Vec<Transaction>, TransactionApiError>;

    /// Fetches the full observation history for an order, oldest first.
    async fn fetch_observations(&self, order_id: &OrderId) -> Result<Vec<Observation>, TransactionApiError>;
}
