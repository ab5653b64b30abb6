#![allow(dead_code)]
use std::{collections::HashMap, sync::Mutex};

use log::*;
use recon_engine::{
    db_types::{NewTransaction, OrderId},
    events::EventProducers,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    OrderStatusProvider,
    ProviderError,
    ProviderOrderStatus,
    ReconciliationApi,
    ReconciliationDatabase,
    SqliteDatabase,
};
use serde_json::json;

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    drop_database(&url).await;
}

pub fn api(db: &SqliteDatabase) -> ReconciliationApi<SqliteDatabase> {
    ReconciliationApi::new(db.clone(), EventProducers::default())
}

pub async fn register(api: &ReconciliationApi<SqliteDatabase>, order_id: &str, user_id: &str, amount: f64) -> OrderId {
    let order_id = OrderId::from(order_id);
    let txn = NewTransaction::new(order_id.clone(), user_id, amount, "USDT").with_network("base");
    api.register_order(txn).await.expect("Error registering order");
    order_id
}

pub fn webhook_body(order_id: &str, status: &str) -> String {
    json!({"event": format!("payment_order.{status}"), "data": {"id": order_id, "status": status}}).to_string()
}

/// An in-memory stand-in for the provider's order API.
#[derive(Default)]
pub struct MockProvider {
    statuses: Mutex<HashMap<String, Result<String, ProviderError>>>,
    amounts: Mutex<HashMap<String, f64>>,
}

impl MockProvider {
    pub fn set_status(&self, order_id: &str, status: &str) {
        self.statuses.lock().unwrap().insert(order_id.to_string(), Ok(status.to_string()));
    }

    pub fn set_amount(&self, order_id: &str, amount: f64) {
        self.amounts.lock().unwrap().insert(order_id.to_string(), amount);
    }

    pub fn set_error(&self, order_id: &str, error: ProviderError) {
        self.statuses.lock().unwrap().insert(order_id.to_string(), Err(error));
    }
}

impl OrderStatusProvider for MockProvider {
    async fn fetch_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
        let entry = self.statuses.lock().unwrap().get(order_id).cloned();
        let amount = self.amounts.lock().unwrap().get(order_id).copied();
        match entry {
            Some(Ok(status)) => Ok(ProviderOrderStatus {
                order_id: order_id.to_string(),
                amount,
                raw: json!({"status": "success", "data": {"id": order_id, "status": status}}),
                status,
            }),
            Some(Err(e)) => Err(e),
            None => Err(ProviderError::OrderNotFound(order_id.to_string())),
        }
    }
}
