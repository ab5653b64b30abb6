use actix_web::{http::StatusCode, test::TestRequest, web};
use recon_engine::{
    db_types::{OrderId, TransactionStatus},
    events::EventProducers,
    helpers::ObservationOutcome,
    traits::{ObservationResult, ProviderError, ProviderOrderStatus},
    ReconciliationApi,
    TransactionsApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{api_request, as_admin, as_service, as_user, transaction},
    mocks::{MockReconDb, MockStatusProvider},
};
use crate::routes::{MyTransactionsRoute, PollOrderRoute, RegisterOrderRoute};

fn configure(db: MockReconDb, provider: MockStatusProvider) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = ReconciliationApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(provider))
            .service(RegisterOrderRoute::<MockReconDb, MockStatusProvider>::new())
            .service(PollOrderRoute::<MockReconDb, MockStatusProvider>::new());
    }
}

fn order_owned_by(owner: &'static str) -> MockReconDb {
    let mut db = MockReconDb::new();
    db.expect_fetch_transaction()
        .returning(move |id| Ok(Some(transaction(id.as_str(), owner, TransactionStatus::Processing))));
    db
}

fn provider_reporting(amount: Option<f64>) -> MockStatusProvider {
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().times(1).returning(move |id| {
        Ok(ProviderOrderStatus {
            order_id: id.to_string(),
            status: "pending".to_string(),
            amount,
            raw: json!({ "id": id, "status": "pending" }),
        })
    });
    provider
}

fn unregistered_order() -> MockReconDb {
    let mut db = MockReconDb::new();
    db.expect_fetch_transaction().returning(|_| Ok(None));
    db
}

#[actix_web::test]
async fn service_registers_order_for_user() {
    let _ = env_logger::try_init();
    let mut db = unregistered_order();
    db.expect_insert_transaction()
        .withf(|t| t.order_id == OrderId::from("ord-1") && t.user_id == "alice" && t.amount == 250.0)
        .times(1)
        .returning(|t| Ok((transaction(t.order_id.as_str(), &t.user_id, TransactionStatus::Pending), true)));
    let req = as_service(TestRequest::post().uri("/orders")).set_json(json!({
        "order_id": " ord-1 ",
        "user_id": "alice",
        "amount": 250.0,
        "currency": "USDT",
        "network": "base"
    }));
    let (status, body) = api_request(req, configure(db, provider_reporting(Some(250.0)))).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["order_id"], json!("ord-1"));
    assert_eq!(body["user_id"], json!("alice"));
    assert_eq!(body["status"], json!("pending"));
}

#[actix_web::test]
async fn users_cannot_register_orders() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_fetch_transaction().never();
    db.expect_insert_transaction().never();
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().never();
    let req = as_user(TestRequest::post().uri("/orders"), "mallory").set_json(json!({
        "order_id": "ord-1",
        "user_id": "mallory",
        "amount": 1000000.0,
        "currency": "USDT"
    }));
    let (status, _) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // Admins do not hold the service role either
    let req = as_admin(TestRequest::post().uri("/orders"), "carol")
        .set_json(json!({ "order_id": "ord-1", "user_id": "carol", "amount": 250.0, "currency": "USDT" }));
    let (status, _) = api_request(req, configure(MockReconDb::new(), MockStatusProvider::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn inflated_amounts_are_rejected() {
    let _ = env_logger::try_init();
    let mut db = unregistered_order();
    db.expect_insert_transaction().never();
    let req = as_service(TestRequest::post().uri("/orders"))
        .set_json(json!({ "order_id": "ord-1", "user_id": "alice", "amount": 1000000.0, "currency": "USDT" }));
    let (status, body) = api_request(req, configure(db, provider_reporting(Some(250.0)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("does not match"), "{body}");
}

#[actix_web::test]
async fn orders_without_a_provider_amount_are_rejected() {
    let _ = env_logger::try_init();
    let mut db = unregistered_order();
    db.expect_insert_transaction().never();
    let req = as_service(TestRequest::post().uri("/orders"))
        .set_json(json!({ "order_id": "ord-1", "user_id": "alice", "amount": 250.0, "currency": "USDT" }));
    let (status, _) = api_request(req, configure(db, provider_reporting(None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn orders_unknown_to_the_provider_are_rejected() {
    let _ = env_logger::try_init();
    let mut db = unregistered_order();
    db.expect_insert_transaction().never();
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().times(1).returning(|id| Err(ProviderError::OrderNotFound(id.to_string())));
    let req = as_service(TestRequest::post().uri("/orders"))
        .set_json(json!({ "order_id": "made-up", "user_id": "alice", "amount": 250.0, "currency": "USDT" }));
    let (status, _) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_order_ids_are_rejected() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_fetch_transaction().never();
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().never();
    let req = as_service(TestRequest::post().uri("/orders"))
        .set_json(json!({ "order_id": "../admin", "user_id": "alice", "amount": 250.0, "currency": "USDT" }));
    let (status, _) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cannot_register_someone_elses_order() {
    let _ = env_logger::try_init();
    let mut db = order_owned_by("bob");
    db.expect_insert_transaction().never();
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().never();
    let req = as_service(TestRequest::post().uri("/orders"))
        .set_json(json!({ "order_id": "ord-1", "user_id": "alice", "amount": 250.0, "currency": "USDT" }));
    let (status, _) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn registering_twice_returns_the_original() {
    let _ = env_logger::try_init();
    let mut db = order_owned_by("alice");
    db.expect_insert_transaction().never();
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().never();
    let req = as_service(TestRequest::post().uri("/orders"))
        .set_json(json!({ "order_id": "ord-1", "user_id": "alice", "amount": 250.0, "currency": "USDT" }));
    let (status, body) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], json!("processing"));
}

#[actix_web::test]
async fn poll_applies_provider_status() {
    let _ = env_logger::try_init();
    let mut db = order_owned_by("alice");
    db.expect_apply_observation()
        .withf(|obs| obs.raw_status == "validated" && obs.payload.is_some())
        .times(1)
        .returning(|obs| {
            let txn = transaction(obs.order_id.as_str(), "alice", TransactionStatus::Validated);
            let outcome =
                ObservationOutcome::Advanced { from: TransactionStatus::Processing, to: TransactionStatus::Validated };
            Ok(ObservationResult::new(txn, outcome))
        });
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().withf(|id| id == "ord-1").times(1).returning(|id| {
        Ok(ProviderOrderStatus {
            order_id: id.to_string(),
            status: "validated".to_string(),
            amount: Some(250.0),
            raw: json!({ "id": id, "status": "validated" }),
        })
    });
    let req = as_user(TestRequest::post().uri("/orders/ord-1/poll"), "alice");
    let (status, body) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["outcome"]["outcome"], json!("advanced"));
    assert_eq!(body["transaction"]["status"], json!("validated"));
}

#[actix_web::test]
async fn poll_someone_elses_order() {
    let _ = env_logger::try_init();
    let mut db = order_owned_by("bob");
    db.expect_apply_observation().never();
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().never();
    let req = as_user(TestRequest::post().uri("/orders/ord-1/poll"), "alice");
    let (status, _) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn admin_can_poll_any_order() {
    let _ = env_logger::try_init();
    let mut db = order_owned_by("bob");
    db.expect_apply_observation().times(1).returning(|obs| {
        let txn = transaction(obs.order_id.as_str(), "bob", TransactionStatus::Processing);
        Ok(ObservationResult::new(txn, ObservationOutcome::Unchanged))
    });
    let mut provider = MockStatusProvider::new();
    provider.expect_fetch_order_status().times(1).returning(|id| {
        Ok(ProviderOrderStatus {
            order_id: id.to_string(),
            status: "processing".to_string(),
            amount: Some(250.0),
            raw: json!({}),
        })
    });
    let req = as_admin(TestRequest::post().uri("/orders/ord-1/poll"), "carol");
    let (status, _) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn provider_failure_is_a_bad_gateway() {
    let _ = env_logger::try_init();
    let mut db = order_owned_by("alice");
    db.expect_apply_observation().never();
    let mut provider = MockStatusProvider::new();
    provider
        .expect_fetch_order_status()
        .times(1)
        .returning(|_| Err(ProviderError::RequestFailed("connection timed out".into())));
    let req = as_user(TestRequest::post().uri("/orders/ord-1/poll"), "alice");
    let (status, body) = api_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("connection timed out"), "{body}");
}

#[actix_web::test]
async fn my_transactions() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_fetch_transactions_for_user().withf(|user| user == "alice").times(1).returning(|user| {
        Ok(vec![
            transaction("ord-2", user, TransactionStatus::Pending),
            transaction("ord-1", user, TransactionStatus::Settled),
        ])
    });
    let configure = move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(TransactionsApi::new(db))).service(MyTransactionsRoute::<MockReconDb>::new());
    };
    let (status, body) = api_request(as_user(TestRequest::get().uri("/transactions"), "alice"), configure).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[0]["order_id"], json!("ord-2"));
}
