use cucumber::{then, when};
use recon_engine::{
    db_types::{OrderId, PayoutDestination, Points, TransactionStatus, WithdrawalStatus},
    LedgerManagement,
    TransactionManagement,
};
use serde_json::json;

use crate::cucumber::RewardsWorld;

#[when(expr = "the provider sends a webhook for {word} with status {string}")]
async fn receive_webhook(world: &mut RewardsWorld, order_id: String, status: String) {
    let body = json!({"event": status, "data": {"id": order_id, "status": status}}).to_string();
    let oid = OrderId::from(order_id);
    world.api().process_webhook(&oid, &status, body).await.expect("Error processing webhook");
}

#[when(expr = "the status of {word} is written directly as {string}")]
async fn corrupt_status(world: &mut RewardsWorld, order_id: String, status: String) {
    sqlx::query("UPDATE transactions SET status = $1 WHERE order_id = $2")
        .bind(status)
        .bind(order_id)
        .execute(world.db().pool())
        .await
        .expect("Error writing status");
}

#[when(expr = "'{word}' requests a withdrawal of {int} points to account {string} at {string}")]
async fn request_withdrawal(world: &mut RewardsWorld, user_id: String, points: i64, account: String, bank: String) {
    let destination = PayoutDestination::new(account, bank);
    let result = world.rewards().request_withdrawal(&user_id, Points::from(points), destination).await;
    world.last_withdrawal = Some(result);
}

#[when(expr = "the last withdrawal is marked as {word}")]
async fn update_last_withdrawal(world: &mut RewardsWorld, status: String) {
    let status = status.parse::<WithdrawalStatus>().expect("Invalid withdrawal status");
    let entry = match &world.last_withdrawal {
        Some(Ok(entry)) => entry.clone(),
        other => panic!("There is no successful withdrawal to update: {other:?}"),
    };
    let updated = world.rewards().update_withdrawal_status(entry.id, status).await.expect("Error updating withdrawal");
    world.last_withdrawal = Some(Ok(updated));
}

#[then(expr = "order {word} has status {string}")]
async fn check_status(world: &mut RewardsWorld, order_id: String, status: String) {
    let expected = status.parse::<TransactionStatus>().expect("Invalid status");
    let txn = world
        .db()
        .fetch_transaction(&OrderId::from(order_id))
        .await
        .expect("Error fetching transaction")
        .expect("Transaction does not exist");
    assert_eq!(txn.status, expected, "Status is incorrect");
}

#[then(expr = "order {word} has {int} observations")]
async fn check_observation_count(world: &mut RewardsWorld, order_id: String, count: usize) {
    let observations =
        world.db().fetch_observations(&OrderId::from(order_id)).await.expect("Error fetching observations");
    assert_eq!(observations.len(), count, "Observation count is incorrect");
}

#[then(expr = "the last observation of {word} was {string}")]
async fn check_last_outcome(world: &mut RewardsWorld, order_id: String, outcome: String) {
    let observations =
        world.db().fetch_observations(&OrderId::from(order_id)).await.expect("Error fetching observations");
    let last = observations.last().expect("No observations recorded");
    assert_eq!(last.outcome, outcome, "Outcome is incorrect");
}

#[then(expr = "'{word}' has a balance of {int} points")]
async fn check_balance(world: &mut RewardsWorld, user_id: String, points: i64) {
    let balance = world.rewards().balance(&user_id).await.expect("Error fetching balance");
    assert_eq!(balance, Points::from(points), "Balance is incorrect");
}

#[then(expr = "'{word}' has a cached balance of {int} points")]
async fn check_cached_balance(world: &mut RewardsWorld, user_id: String, points: i64) {
    let account = world.db().fetch_user_account(&user_id).await.expect("Error fetching account").expect("No account");
    assert_eq!(account.reward_points, Points::from(points), "Cached balance is incorrect");
}

#[then(expr = "'{word}' has {int} earned entries")]
async fn check_earned_entries(world: &mut RewardsWorld, user_id: String, count: i64) {
    let page = world
        .rewards()
        .history(&user_id, Some(recon_engine::db_types::LedgerEntryType::Earned), Default::default())
        .await
        .expect("Error fetching history");
    assert_eq!(page.total_records, count, "Earned entry count is incorrect");
}

#[then("the withdrawal is rejected for insufficient balance")]
async fn check_insufficient(world: &mut RewardsWorld) {
    match &world.last_withdrawal {
        Some(Err(recon_engine::LedgerError::InsufficientBalance { .. })) => {},
        other => panic!("Expected an insufficient balance error, got {other:?}"),
    }
}

#[then("the withdrawal is rejected as invalid")]
async fn check_invalid(world: &mut RewardsWorld) {
    match &world.last_withdrawal {
        Some(Err(recon_engine::LedgerError::ValidationError(_))) => {},
        other => panic!("Expected a validation error, got {other:?}"),
    }
}

#[then(expr = "the withdrawal is {word}")]
async fn check_withdrawal_status(world: &mut RewardsWorld, status: String) {
    let expected = status.parse::<WithdrawalStatus>().expect("Invalid withdrawal status");
    match &world.last_withdrawal {
        Some(Ok(entry)) => assert_eq!(entry.withdrawal_status, Some(expected), "Withdrawal status is incorrect"),
        other => panic!("Expected a withdrawal, got {other:?}"),
    }
}
