use actix_web::{http::StatusCode, test::TestRequest, web};
use recon_engine::{
    db_types::{LedgerEntryType, Points, WithdrawalStatus},
    ledger_objects::LedgerTotals,
    traits::LedgerError,
    RewardsApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{api_request, as_admin, as_user, withdrawal},
    mocks::MockLedgerManager,
};
use crate::routes::{
    MyBalanceRoute,
    MyRewardsHistoryRoute,
    MyRewardsSummaryRoute,
    RequestWithdrawalRoute,
    UpdateWithdrawalStatusRoute,
};

fn configure(db: MockLedgerManager) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = RewardsApi::new(db).with_min_withdrawal(Points::from(5000));
        cfg.app_data(web::Data::new(api))
            .service(MyBalanceRoute::<MockLedgerManager>::new())
            .service(MyRewardsSummaryRoute::<MockLedgerManager>::new())
            .service(MyRewardsHistoryRoute::<MockLedgerManager>::new())
            .service(RequestWithdrawalRoute::<MockLedgerManager>::new())
            .service(UpdateWithdrawalStatusRoute::<MockLedgerManager>::new());
    }
}

#[actix_web::test]
async fn balance_requires_identity() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_recompute_balance().never();
    let (status, _) = api_request(TestRequest::get().uri("/rewards/balance"), configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn balance() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_recompute_balance().withf(|user| user == "alice").times(1).returning(|_| Ok(Points::from(7250)));
    let req = as_user(TestRequest::get().uri("/rewards/balance"), "alice");
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"balance": 7250}));
}

#[actix_web::test]
async fn summary() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_recompute_balance().returning(|_| Ok(Points::from(3000)));
    db.expect_fetch_ledger_totals().returning(|_| {
        Ok(LedgerTotals { total_earned: Points::from(9000), total_withdrawn: Points::from(6000) })
    });
    db.expect_fetch_ledger_entries()
        .returning(|_| Ok((vec![withdrawal(3, "alice", 6000, WithdrawalStatus::Completed)], 1)));
    let req = as_user(TestRequest::get().uri("/rewards/summary"), "alice");
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["current_balance"], json!(3000));
    assert_eq!(body["total_earned"], json!(9000));
    assert_eq!(body["minimum_withdrawal"], json!(5000));
    assert_eq!(body["can_withdraw"], json!(false));
    assert_eq!(body["recent_activity"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn history_is_filtered_and_paginated() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_fetch_ledger_entries()
        .withf(|q| {
            q.user_id == "alice"
                && q.entry_type == Some(LedgerEntryType::Withdrawn)
                && q.pagination.page == 2
                && q.pagination.limit == 1
        })
        .times(1)
        .returning(|_| Ok((vec![withdrawal(2, "alice", 5000, WithdrawalStatus::Pending)], 3)));
    let req = as_user(TestRequest::get().uri("/rewards/history?page=2&limit=1&type=withdrawn"), "alice");
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["total_records"], json!(3));
    assert_eq!(body["total_pages"], json!(3));
    assert_eq!(body["has_more"], json!(true));
}

#[actix_web::test]
async fn withdrawal_below_minimum_is_rejected() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_request_withdrawal().never();
    let req = as_user(TestRequest::post().uri("/rewards/withdraw"), "alice").set_json(json!({
        "points": 4999,
        "account_number": "0123456789",
        "bank_name": "First Bank"
    }));
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("minimum withdrawal"), "{body}");
}

#[actix_web::test]
async fn withdrawal_without_bank_details_is_rejected() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_request_withdrawal().never();
    let req = as_user(TestRequest::post().uri("/rewards/withdraw"), "alice")
        .set_json(json!({ "points": 5000, "account_number": "0123456789" }));
    let (status, _) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn withdrawal_with_insufficient_balance() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_request_withdrawal().times(1).returning(|_, points, _| {
        Err(LedgerError::InsufficientBalance { requested: points, available: Points::from(1200) })
    });
    let req = as_user(TestRequest::post().uri("/rewards/withdraw"), "alice").set_json(json!({
        "points": 6000,
        "account_number": "0123456789",
        "bank_name": "First Bank"
    }));
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Insufficient balance"), "{body}");
}

#[actix_web::test]
async fn withdrawal_is_created() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_request_withdrawal()
        .withf(|user, points, dest| {
            user == "alice" && *points == Points::from(5000) && dest.bank_name == "First Bank"
        })
        .times(1)
        .returning(|user, points, _| Ok(withdrawal(7, user, points.value(), WithdrawalStatus::Pending)));
    let req = as_user(TestRequest::post().uri("/rewards/withdraw"), "alice").set_json(json!({
        "points": 5000,
        "account_number": "0123456789",
        "bank_name": "First Bank"
    }));
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["id"], json!(7));
    assert_eq!(body["withdrawal_status"], json!("pending"));
}

#[actix_web::test]
async fn only_admins_update_withdrawals() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_update_withdrawal_status().never();
    let req = as_user(TestRequest::patch().uri("/rewards/withdrawals/7"), "alice")
        .set_json(json!({ "status": "completed" }));
    let (status, _) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_completes_withdrawal() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_update_withdrawal_status()
        .withf(|id, status| *id == 7 && *status == WithdrawalStatus::Completed)
        .times(1)
        .returning(|id, status| Ok(withdrawal(id, "alice", 5000, status)));
    let req = as_admin(TestRequest::patch().uri("/rewards/withdrawals/7"), "admin")
        .set_json(json!({ "status": "completed" }));
    let (status, body) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""withdrawal_status":"completed""#), "{body}");
}

#[actix_web::test]
async fn finalised_withdrawal_cannot_change() {
    let _ = env_logger::try_init();
    let mut db = MockLedgerManager::new();
    db.expect_update_withdrawal_status().times(1).returning(|_, to| {
        Err(LedgerError::InvalidTransition { from: WithdrawalStatus::Completed, to })
    });
    let req = as_admin(TestRequest::patch().uri("/rewards/withdrawals/7"), "admin")
        .set_json(json!({ "status": "failed" }));
    let (status, _) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut db = MockLedgerManager::new();
    db.expect_update_withdrawal_status().times(1).returning(|id, _| Err(LedgerError::WithdrawalNotFound(id)));
    let req = as_admin(TestRequest::patch().uri("/rewards/withdrawals/99"), "admin")
        .set_json(json!({ "status": "failed" }));
    let (status, _) = api_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
