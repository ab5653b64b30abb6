use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Points, UserAccount};

/// Fetches the user account, creating it if it does not exist yet.
///
/// This is always a write, so calling it first in a transaction takes the database write lock and serialises all
/// balance-affecting work for the user.
pub async fn lock_user(user_id: &str, conn: &mut SqliteConnection) -> Result<UserAccount, sqlx::Error> {
    let account = sqlx::query_as(
        r#"INSERT INTO users (user_id) VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
        RETURNING *"#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ User account for {user_id} locked");
    Ok(account)
}

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

/// Adds `delta` (which may be negative) to the cached balance and returns the new value.
pub async fn adjust_reward_points(
    user_id: &str,
    delta: Points,
    conn: &mut SqliteConnection,
) -> Result<Points, sqlx::Error> {
    let balance: Points = sqlx::query_scalar(
        r#"UPDATE users SET reward_points = reward_points + $1, updated_at = CURRENT_TIMESTAMP
        WHERE user_id = $2 RETURNING reward_points"#,
    )
    .bind(delta)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Cached balance for {user_id} adjusted by {delta} to {balance}");
    Ok(balance)
}

pub async fn set_reward_points(user_id: &str, balance: Points, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET reward_points = $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2")
        .bind(balance)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
