use thiserror::Error;

use crate::{
    db_types::{NewObservation, NewTransaction, OrderId, Transaction},
    traits::{data_objects::ObservationResult, LedgerError, TransactionApiError, TransactionManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the reconciliation engine.
///
/// This behaviour includes:
/// * Registering new payment orders for users
/// * Applying status observations, from either the webhook or the poller, under the monotonic-rank rule
/// * Crediting (and clawing back) reward points as a side effect of status changes
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone + TransactionManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new transaction, creating the user's account if necessary.
    ///
    /// This call is idempotent. Returns the stored transaction and true if it was inserted, or the existing
    /// transaction and false if the order id was already known.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<(Transaction, bool), ReconciliationError>;

    /// Applies a status observation to its transaction in a single atomic database transaction:
    ///
    /// * The origin-specific audit fields (`last_webhook_*` or `last_polled_*`) are always updated.
    /// * The status is only written if the transition rule says the observation advances the transaction.
    /// * The observation is appended to the observation log along with its outcome.
    /// * If the resulting status is reward-eligible, points are credited (at most once per transaction).
    /// * If the transaction moved from a reward-eligible status to a non-eligible one, the earned points are removed
    ///   from the cached balance.
    ///
    /// If the order is unknown, [`ReconciliationError::TransactionNotFound`] is returned and nothing is written.
    async fn apply_observation(&self, observation: NewObservation) -> Result<ObservationResult, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The transaction for order {0} does not exist")]
    TransactionNotFound(OrderId),
    #[error("Invalid transaction. {0}")]
    InvalidTransaction(String),
    #[error("Could not fetch the order status from the provider. {0}")]
    Provider(String),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

impl From<TransactionApiError> for ReconciliationError {
    fn from(e: TransactionApiError) -> Self {
        match e {
            TransactionApiError::DatabaseError(s) => ReconciliationError::DatabaseError(s),
            TransactionApiError::QueryError(s) => ReconciliationError::InvalidTransaction(s),
        }
    }
}
