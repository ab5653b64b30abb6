use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{NewObservation, NewTransaction, ObservationOrigin, OrderId, Transaction, TransactionStatus};

/// A SQL list literal, e.g. `('fulfilled','validated','settled')`, of all statuses matching `f`.
pub(crate) fn status_list<F: Fn(&TransactionStatus) -> bool>(f: F) -> String {
    let statuses = TransactionStatus::ALL.iter().filter(|s| f(*s)).map(|s| format!("'{s}'")).collect::<Vec<_>>();
    format!("({})", statuses.join(","))
}

/// Inserts the transaction if the order id is new. Otherwise, the existing record is returned unchanged.
///
/// Returns the transaction and `true` if it was inserted.
pub async fn idempotent_insert(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<(Transaction, bool), sqlx::Error> {
    let inserted: Option<Transaction> = sqlx::query_as(
        r#"INSERT INTO transactions (order_id, user_id, amount, currency, network, receive_address, reference, valid_until)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (order_id) DO NOTHING
        RETURNING *"#,
    )
    .bind(&transaction.order_id)
    .bind(&transaction.user_id)
    .bind(transaction.amount)
    .bind(&transaction.currency)
    .bind(&transaction.network)
    .bind(&transaction.receive_address)
    .bind(&transaction.reference)
    .bind(transaction.valid_until)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(txn) => {
            debug!("🗃️ Transaction for order {} saved with id {}", txn.order_id, txn.id);
            Ok((txn, true))
        },
        None => {
            debug!("🗃️ Transaction for order {} already exists", transaction.order_id);
            let existing = fetch_transaction(&transaction.order_id, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            Ok((existing, false))
        },
    }
}

pub async fn fetch_transaction(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1").bind(order_id).fetch_optional(conn).await
}

/// Touches the transaction row without changing it, taking the database write lock.
pub async fn lock_transaction(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("UPDATE transactions SET updated_at = updated_at WHERE order_id = $1 RETURNING *")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_transactions_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Non-terminal transactions, least recently polled first. Never-polled transactions sort ahead of everything else.
pub async fn fetch_open_transactions(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Transaction>, sqlx::Error> {
    let q = format!(
        r#"SELECT * FROM transactions WHERE status NOT IN {}
        ORDER BY last_polled_at IS NOT NULL, last_polled_at ASC, id ASC
        LIMIT $1"#,
        status_list(TransactionStatus::is_terminal)
    );
    trace!("🗃️ Executing query: {q}");
    sqlx::query_as(&q).bind(limit).fetch_all(conn).await
}

/// Reward-eligible transactions for the user that have no earned ledger entry.
pub async fn fetch_uncredited_eligible(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let q = format!(
        r#"SELECT * FROM transactions t WHERE t.user_id = $1 AND t.status IN {}
        AND NOT EXISTS (
            SELECT 1 FROM ledger_entries l WHERE l.transaction_id = t.order_id AND l.entry_type = 'earned'
        )
        ORDER BY t.id ASC"#,
        status_list(TransactionStatus::is_reward_eligible)
    );
    sqlx::query_as(&q).bind(user_id).fetch_all(conn).await
}

/// Records the audit trail for an observation on the transaction row. Only the fields for the observation's origin
/// are touched. The status is never changed here.
///
/// Returns `None` if the order does not exist.
pub async fn record_observation_audit(
    observation: &NewObservation,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let q = match observation.origin {
        ObservationOrigin::Webhook => {
            r#"UPDATE transactions SET last_webhook_payload = $1, last_webhook_at = $2,
            last_observation_origin = $3, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $4 RETURNING *"#
        },
        ObservationOrigin::Poll => {
            r#"UPDATE transactions SET last_polled_payload = $1, last_polled_at = $2,
            last_observation_origin = $3, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $4 RETURNING *"#
        },
    };
    sqlx::query_as(q)
        .bind(&observation.payload)
        .bind(observation.observed_at)
        .bind(observation.origin)
        .bind(&observation.order_id)
        .fetch_optional(conn)
        .await
}

pub async fn update_status(
    order_id: &OrderId,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Transaction, sqlx::Error> {
    let txn: Transaction =
        sqlx::query_as("UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *")
            .bind(status)
            .bind(order_id)
            .fetch_one(conn)
            .await?;
    trace!("🗃️ Transaction for order {order_id} is now {status}");
    Ok(txn)
}
