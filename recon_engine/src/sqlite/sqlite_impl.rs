//! `SqliteDatabase` is a concrete implementation of a reconciliation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, ledger, new_pool, observations, transactions, users};
use crate::{
    db_types::{
        LedgerEntry,
        NewObservation,
        NewTransaction,
        Observation,
        OrderId,
        PayoutDestination,
        Points,
        Transaction,
        UserAccount,
        WithdrawalStatus,
    },
    helpers::{decide, ObservationOutcome},
    recon_api::ledger_objects::{LedgerQuery, LedgerTotals},
    traits::{
        CreditResult,
        LedgerError,
        LedgerManagement,
        ObservationResult,
        ReconciliationDatabase,
        ReconciliationError,
        TransactionApiError,
        TransactionManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<(Transaction, bool), ReconciliationError> {
        if transaction.order_id.as_str().trim().is_empty() {
            return Err(ReconciliationError::InvalidTransaction("The order id cannot be empty".into()));
        }
        if transaction.user_id.trim().is_empty() {
            return Err(ReconciliationError::InvalidTransaction("The user id cannot be empty".into()));
        }
        if !transaction.amount.is_finite() || transaction.amount < 0.0 {
            return Err(ReconciliationError::InvalidTransaction(format!("{} is not a valid amount", transaction.amount)));
        }
        let mut tx = self.pool.begin().await?;
        users::lock_user(&transaction.user_id, &mut tx).await?;
        let result = transactions::idempotent_insert(transaction, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn apply_observation(&self, observation: NewObservation) -> Result<ObservationResult, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        // The audit write comes first. It takes the write lock, and tells us whether the order exists at all.
        let Some(txn) = transactions::record_observation_audit(&observation, &mut tx).await? else {
            tx.rollback().await?;
            return Err(ReconciliationError::TransactionNotFound(observation.order_id));
        };
        let previous = txn.status;
        let outcome = decide(previous, observation.status);
        let txn = match outcome {
            ObservationOutcome::Advanced { to, .. } => transactions::update_status(&txn.order_id, to, &mut tx).await?,
            _ => txn,
        };
        observations::insert_observation(&observation, &outcome, &mut tx).await?;
        trace!("🗃️ {} observation of '{}' for {}: {outcome}", observation.origin, observation.raw_status, txn.order_id);
        let mut result = ObservationResult::new(txn, outcome);
        if outcome.status_changed() {
            let credit = ledger::credit_for_transaction(&result.transaction, &mut tx).await?;
            result = result.with_credit(credit);
            if let Some(points) = ledger::claw_back(&result.transaction, previous, &mut tx).await? {
                result = result.with_clawback(points);
            }
        } else if result.transaction.status.is_reward_eligible() {
            // Repeat deliveries of an eligible status are credited if a previous attempt was missed
            let credit = ledger::credit_for_transaction(&result.transaction, &mut tx).await?;
            result = result.with_credit(credit);
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}

impl TransactionManagement for SqliteDatabase {
    async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<Transaction>, TransactionApiError> {
        let mut conn = self.pool.acquire().await?;
        let txn = transactions::fetch_transaction(order_id, &mut conn).await?;
        Ok(txn)
    }

    async fn fetch_transactions_for_user(&self, user_id: &str) -> Result<Vec<Transaction>, TransactionApiError> {
        let mut conn = self.pool.acquire().await?;
        let txns = transactions::fetch_transactions_for_user(user_id, &mut conn).await?;
        Ok(txns)
    }

    async fn fetch_open_transactions(&self, limit: i64) -> Result<Vec<Transaction>, TransactionApiError> {
        if limit < 1 {
            return Err(TransactionApiError::QueryError(format!("Batch size must be positive, not {limit}")));
        }
        let mut conn = self.pool.acquire().await?;
        let txns = transactions::fetch_open_transactions(limit, &mut conn).await?;
        Ok(txns)
    }

    async fn fetch_observations(&self, order_id: &OrderId) -> Result<Vec<Observation>, TransactionApiError> {
        let mut conn = self.pool.acquire().await?;
        let observations = observations::fetch_observations(order_id, &mut conn).await?;
        Ok(observations)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn credit_if_eligible(&self, order_id: &OrderId) -> Result<CreditResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let txn = transactions::lock_transaction(order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(order_id.clone()))?;
        let result = ledger::credit_for_transaction(&txn, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn request_withdrawal(
        &self,
        user_id: &str,
        points: Points,
        destination: PayoutDestination,
    ) -> Result<LedgerEntry, LedgerError> {
        if !points.is_positive() {
            return Err(LedgerError::ValidationError(format!("Cannot withdraw {points}")));
        }
        if !destination.is_complete() {
            return Err(LedgerError::ValidationError("An account number and bank name are required".into()));
        }
        let mut tx = self.pool.begin().await?;
        users::lock_user(user_id, &mut tx).await?;
        let available = ledger::recompute_balance(user_id, &mut tx).await?;
        if points > available {
            tx.rollback().await?;
            debug!("🗃️ Withdrawal of {points} for {user_id} rejected. Balance is {available}");
            return Err(LedgerError::InsufficientBalance { requested: points, available });
        }
        let entry = ledger::insert_withdrawal(user_id, points, &destination, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Withdrawal #{} of {points} requested by {user_id}", entry.id);
        Ok(entry)
    }

    async fn update_withdrawal_status(
        &self,
        entry_id: i64,
        status: WithdrawalStatus,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let entry = ledger::lock_withdrawal(entry_id, &mut tx).await?.ok_or(LedgerError::WithdrawalNotFound(entry_id))?;
        let current = entry.withdrawal_status.unwrap_or(WithdrawalStatus::Pending);
        match (current, status) {
            (WithdrawalStatus::Pending, WithdrawalStatus::Completed) | (WithdrawalStatus::Pending, WithdrawalStatus::Failed) => {},
            (from, to) => {
                tx.rollback().await?;
                return Err(LedgerError::InvalidTransition { from, to });
            },
        }
        let updated = ledger::set_withdrawal_status(entry_id, status, &mut tx).await?;
        if status == WithdrawalStatus::Failed {
            let refund = updated.points.abs();
            users::adjust_reward_points(&updated.user_id, refund, &mut tx).await?;
            debug!("🗃️ Withdrawal #{entry_id} failed. {refund} returned to {}", updated.user_id);
        }
        tx.commit().await?;
        info!("🗃️ Withdrawal #{entry_id} is now {status}");
        Ok(updated)
    }

    async fn recompute_balance(&self, user_id: &str) -> Result<Points, LedgerError> {
        let mut tx = self.pool.begin().await?;
        users::lock_user(user_id, &mut tx).await?;
        let balance = ledger::recompute_balance(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn fetch_user_account(&self, user_id: &str) -> Result<Option<UserAccount>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let account = users::fetch_user(user_id, &mut conn).await?;
        Ok(account)
    }

    async fn fetch_ledger_entries(&self, query: LedgerQuery) -> Result<(Vec<LedgerEntry>, i64), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = ledger::fetch_entries(query, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_ledger_totals(&self, user_id: &str) -> Result<LedgerTotals, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let totals = ledger::fetch_totals(user_id, &mut conn).await?;
        Ok(totals)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
