use actix_web::{http::StatusCode, test::TestRequest, web};
use recon_engine::{
    db_types::{OrderId, Points, TransactionStatus},
    events::EventProducers,
    helpers::ObservationOutcome,
    traits::{CreditResult, ObservationResult, ReconciliationError},
    ReconciliationApi,
};

use super::{
    helpers::{signed_webhook, transaction, webhook_request, SIGNATURE_HEADER},
    mocks::MockReconDb,
};
use crate::routes::PaycrestWebhookRoute;

fn configure(db: MockReconDb) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = ReconciliationApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).service(PaycrestWebhookRoute::<MockReconDb>::new());
    }
}

#[actix_web::test]
async fn unsigned_webhook_is_rejected() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_apply_observation().never();
    let req = TestRequest::post()
        .uri("/paycrest")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"event":"payment_order.settled","data":{"id":"ord-1","status":"settled"}}"#);
    let (status, _) = webhook_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn webhook_with_bad_signature_is_rejected() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_apply_observation().never();
    let body = r#"{"event":"payment_order.settled","data":{"id":"ord-1","status":"settled"}}"#;
    // Signed over a different body
    let req = signed_webhook(r#"{"event":"payment_order.pending","data":{"id":"ord-1"}}"#).set_payload(body);
    let (status, _) = webhook_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut db = MockReconDb::new();
    db.expect_apply_observation().never();
    let req = TestRequest::post().uri("/paycrest").insert_header((SIGNATURE_HEADER, "not-hex")).set_payload(body);
    let (status, _) = webhook_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn webhook_without_order_id() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_apply_observation().never();
    let (status, body) =
        webhook_request(signed_webhook(r#"{"event":"payment_order.settled","data":{}}"#), configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("order id"), "{body}");
}

#[actix_web::test]
async fn webhook_for_unknown_order_is_acknowledged() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_apply_observation()
        .times(1)
        .returning(|obs| Err(ReconciliationError::TransactionNotFound(obs.order_id)));
    let body = r#"{"event":"payment_order.settled","data":{"id":"ord-404","status":"settled"}}"#;
    let (status, body) = webhook_request(signed_webhook(body), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ord-404 is not known"), "{body}");
}

#[actix_web::test]
async fn webhook_advances_transaction() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_apply_observation()
        .withf(|obs| {
            obs.order_id == OrderId::from("ord-1")
                && obs.raw_status == "settled"
                && obs.payload.as_deref().is_some_and(|p| p.contains("payment_order.settled"))
        })
        .times(1)
        .returning(|obs| {
            let txn = transaction(obs.order_id.as_str(), "alice", TransactionStatus::Settled);
            let outcome =
                ObservationOutcome::Advanced { from: TransactionStatus::Processing, to: TransactionStatus::Settled };
            Ok(ObservationResult::new(txn, outcome).with_credit(CreditResult::credited(Points::from(250))))
        });
    let body = r#"{"event":"payment_order.settled","data":{"id":"ord-1","status":"settled","amount":"250"}}"#;
    let (status, body) = webhook_request(signed_webhook(body), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":true"#), "{body}");
}

#[actix_web::test]
async fn database_failure_is_a_server_error() {
    let _ = env_logger::try_init();
    let mut db = MockReconDb::new();
    db.expect_apply_observation()
        .times(1)
        .returning(|_| Err(ReconciliationError::DatabaseError("database is locked".into())));
    let body = r#"{"event":"payment_order.validated","data":{"id":"ord-1","status":"validated"}}"#;
    let (status, _) = webhook_request(signed_webhook(body), configure(db)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
