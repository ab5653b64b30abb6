//! Ledger entries and balance arithmetic.
//!
//! The balance of a user is
//!
//! ```text
//!    Σ earned entries whose transaction is still reward-eligible
//!  + Σ withdrawn entries that have not failed (these are negative)
//! ```
//!
//! Callers must hold the write lock (see [`super::users::lock_user`]) before calling anything here that reads a balance
//! and then acts on it.
use log::{debug, trace, warn};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        LedgerEntry,
        OrderId,
        PayoutDestination,
        Points,
        Transaction,
        TransactionStatus,
        WithdrawalStatus,
    },
    recon_api::ledger_objects::{LedgerQuery, LedgerTotals},
    sqlite::db::{transactions, transactions::status_list, users},
    traits::{CreditResult, LedgerError},
};

/// Writes an earned entry for the transaction and adds the points to the owner's cached balance.
///
/// Nothing is written if the transaction is not reward-eligible, if its amount is worth zero points, or if it has
/// already been credited. The partial unique index on earned entries makes the last check safe even without a lock.
pub async fn credit_for_transaction(
    txn: &Transaction,
    conn: &mut SqliteConnection,
) -> Result<CreditResult, LedgerError> {
    if !txn.status.is_reward_eligible() {
        trace!("🗃️ Order {} is {} and is not eligible for rewards", txn.order_id, txn.status);
        return Ok(CreditResult::not_credited());
    }
    let points = Points::try_from(txn.amount).map_err(|e| LedgerError::ValidationError(e.to_string()))?;
    if !points.is_positive() {
        debug!("🗃️ Order {} amount of {} earns no points", txn.order_id, txn.amount);
        return Ok(CreditResult::not_credited());
    }
    let description = format!("Earned {points} for order {}", txn.order_id);
    let entry: Option<LedgerEntry> = sqlx::query_as(
        r#"INSERT INTO ledger_entries (user_id, entry_type, points, transaction_id, description)
        VALUES ($1, 'earned', $2, $3, $4)
        ON CONFLICT (transaction_id) WHERE entry_type = 'earned' DO NOTHING
        RETURNING *"#,
    )
    .bind(&txn.user_id)
    .bind(points)
    .bind(&txn.order_id)
    .bind(description)
    .fetch_optional(&mut *conn)
    .await?;
    match entry {
        Some(entry) => {
            users::adjust_reward_points(&txn.user_id, entry.points, conn).await?;
            debug!("🗃️ Credited {} to {} for order {}", entry.points, txn.user_id, txn.order_id);
            Ok(CreditResult::credited(entry.points))
        },
        None => {
            trace!("🗃️ Order {} has already been credited", txn.order_id);
            Ok(CreditResult::not_credited())
        },
    }
}

pub async fn fetch_earned_entry(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE transaction_id = $1 AND entry_type = 'earned'")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

/// Removes previously earned points from the cached balance when a transaction leaves a reward-eligible status.
/// The earned entry itself is kept; it no longer counts towards the balance because of its transaction's status.
///
/// If the points were already withdrawn, the cached balance goes negative. That is the same figure
/// [`recompute_balance`] arrives at, and it blocks further withdrawals until new points cover the debt.
pub async fn claw_back(
    txn: &Transaction,
    previous: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Points>, LedgerError> {
    if !previous.is_reward_eligible() || txn.status.is_reward_eligible() {
        return Ok(None);
    }
    let Some(entry) = fetch_earned_entry(&txn.order_id, conn).await? else {
        return Ok(None);
    };
    users::adjust_reward_points(&txn.user_id, -entry.points, conn).await?;
    warn!(
        "🗃️ Order {} moved from {previous} to {}. {} clawed back from {}",
        txn.order_id, txn.status, entry.points, txn.user_id
    );
    Ok(Some(entry.points))
}

pub async fn fetch_totals(user_id: &str, conn: &mut SqliteConnection) -> Result<LedgerTotals, sqlx::Error> {
    let q = format!(
        r#"SELECT
        COALESCE((
            SELECT SUM(l.points) FROM ledger_entries l JOIN transactions t ON t.order_id = l.transaction_id
            WHERE l.user_id = $1 AND l.entry_type = 'earned' AND t.status IN {}
        ), 0) AS total_earned,
        COALESCE((
            SELECT -SUM(points) FROM ledger_entries
            WHERE user_id = $1 AND entry_type = 'withdrawn' AND withdrawal_status <> 'failed'
        ), 0) AS total_withdrawn"#,
        status_list(TransactionStatus::is_reward_eligible)
    );
    let (total_earned, total_withdrawn): (Points, Points) = sqlx::query_as(&q).bind(user_id).fetch_one(conn).await?;
    Ok(LedgerTotals { total_earned, total_withdrawn })
}

/// Credits any eligible transactions that were missed, then rebuilds the cached balance from the ledger.
pub async fn recompute_balance(user_id: &str, conn: &mut SqliteConnection) -> Result<Points, LedgerError> {
    let missing = transactions::fetch_uncredited_eligible(user_id, conn).await?;
    for txn in &missing {
        let credit = credit_for_transaction(txn, conn).await?;
        if credit.credited {
            warn!("🗃️ Order {} was eligible but had not been credited. Backfilled {}", txn.order_id, credit.points);
        }
    }
    let balance = fetch_totals(user_id, conn).await?.balance();
    users::set_reward_points(user_id, balance, conn).await?;
    trace!("🗃️ Balance for {user_id} recomputed as {balance}");
    Ok(balance)
}

/// Inserts a pending withdrawal of `points` (a positive amount) and deducts it from the cached balance.
pub async fn insert_withdrawal(
    user_id: &str,
    points: Points,
    destination: &PayoutDestination,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, sqlx::Error> {
    let description = format!("Withdrawal of {points} to {}", destination.bank_name.trim());
    let entry: LedgerEntry = sqlx::query_as(
        r#"INSERT INTO ledger_entries
        (user_id, entry_type, points, withdrawal_status, account_number, bank_name, account_name, description)
        VALUES ($1, 'withdrawn', $2, 'pending', $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(-points)
    .bind(destination.account_number.trim())
    .bind(destination.bank_name.trim())
    .bind(destination.account_name.as_deref().map(str::trim))
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;
    users::adjust_reward_points(user_id, entry.points, conn).await?;
    Ok(entry)
}

/// Touches the withdrawal row, taking the database write lock. Returns `None` if there is no withdrawal with this id.
pub async fn lock_withdrawal(entry_id: i64, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE ledger_entries SET updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND entry_type = 'withdrawn' RETURNING *",
    )
    .bind(entry_id)
    .fetch_optional(conn)
    .await
}

pub async fn set_withdrawal_status(
    entry_id: i64,
    status: WithdrawalStatus,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE ledger_entries SET withdrawal_status = $1, processed_at = CURRENT_TIMESTAMP,
        updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 RETURNING *"#,
    )
    .bind(status)
    .bind(entry_id)
    .fetch_one(conn)
    .await
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: &LedgerQuery) {
    builder.push(" WHERE user_id = ");
    builder.push_bind(query.user_id.clone());
    if let Some(entry_type) = query.entry_type {
        builder.push(" AND entry_type = ");
        builder.push_bind(entry_type);
    }
}

/// Returns the requested page of entries, newest first, and the total number of entries matching the filter.
pub async fn fetch_entries(
    query: LedgerQuery,
    conn: &mut SqliteConnection,
) -> Result<(Vec<LedgerEntry>, i64), sqlx::Error> {
    let pagination = query.pagination.normalized();
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM ledger_entries");
    push_filter(&mut count, &query);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM ledger_entries");
    push_filter(&mut builder, &query);
    builder.push(" ORDER BY id DESC LIMIT ");
    builder.push_bind(pagination.limit);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let entries = builder.build_query_as::<LedgerEntry>().fetch_all(conn).await?;
    Ok((entries, total))
}
