use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use recon_common::Secret;
use recon_engine::{
    db_types::{LedgerEntry, LedgerEntryType, OrderId, Points, Transaction, TransactionStatus, WithdrawalStatus},
    helpers::sign_hex,
};

use crate::{
    config::IdentityConfig,
    middleware::{HmacMiddlewareFactory, IdentityMiddlewareFactory},
};

pub const WEBHOOK_SECRET: &str = "webhook-test-secret";
pub const SIGNATURE_HEADER: &str = "X-Paycrest-Signature";

/// Sends the request through an app with the identity middleware in front of whatever `configure` registers.
///
/// Errors raised by middleware are converted to responses, the same way the server would.
pub async fn api_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().wrap(IdentityMiddlewareFactory::new(IdentityConfig::default())).configure(configure);
    call(app, req).await
}

/// Sends the request through an app with webhook signature checks in front of whatever `configure` registers.
pub async fn webhook_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let hmac = HmacMiddlewareFactory::new(SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true);
    let app = App::new().wrap(hmac).configure(configure);
    call(app, req).await
}

async fn call<T, B>(app: App<T>, req: TestRequest) -> (StatusCode, String)
where
    B: actix_web::body::MessageBody,
    T: actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
            InitError = (),
        > + 'static,
    T::Future: 'static,
{
    let service = test::init_service(app).await;
    debug!("🚀️ Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            (res.status(), e.to_string())
        },
    }
}

pub fn as_user(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header(("X-Authenticated-User", user_id.to_string()))
}

pub fn as_admin(req: TestRequest, user_id: &str) -> TestRequest {
    as_user(req, user_id).insert_header(("X-Authenticated-Roles", "user,admin"))
}

/// The order-creating backend, which registers orders on behalf of users.
pub fn as_service(req: TestRequest) -> TestRequest {
    as_user(req, "checkout-service").insert_header(("X-Authenticated-Roles", "service"))
}

pub fn signed_webhook(body: &str) -> TestRequest {
    let signature = sign_hex(WEBHOOK_SECRET, body.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/paycrest")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(body.to_string())
}

pub fn transaction(order_id: &str, user_id: &str, status: TransactionStatus) -> Transaction {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    Transaction {
        id: 1,
        order_id: OrderId::from(order_id),
        user_id: user_id.to_string(),
        status,
        amount: 250.0,
        currency: "USDT".to_string(),
        network: Some("base".to_string()),
        receive_address: None,
        reference: None,
        valid_until: None,
        last_observation_origin: None,
        last_webhook_payload: None,
        last_webhook_at: None,
        last_polled_payload: None,
        last_polled_at: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn withdrawal(id: i64, user_id: &str, points: i64, status: WithdrawalStatus) -> LedgerEntry {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
    LedgerEntry {
        id,
        user_id: user_id.to_string(),
        entry_type: LedgerEntryType::Withdrawn,
        points: Points::from(-points),
        transaction_id: None,
        withdrawal_status: Some(status),
        account_number: Some("0123456789".to_string()),
        bank_name: Some("First Bank".to_string()),
        account_name: None,
        processed_at: None,
        description: None,
        created_at,
        updated_at: created_at,
    }
}
