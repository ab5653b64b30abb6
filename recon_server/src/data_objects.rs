use std::fmt::Display;

use chrono::{DateTime, Utc};
use recon_engine::db_types::{LedgerEntryType, NewTransaction, OrderId, PayoutDestination, Points, WithdrawalStatus};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------------   Webhook  ----------------------------------------------------
/// The body of a provider webhook call, e.g.
/// ```json
/// { "event": "payment_order.settled", "data": { "id": "9d2a...", "status": "settled", ... } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WebhookPayload {
    pub fn order_id(&self) -> Option<OrderId> {
        self.data.id.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(OrderId::from)
    }

    /// The status token, falling back to the event name when the body carries no status.
    pub fn raw_status(&self) -> String {
        self.data
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.event.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
/// A newly initiated payment order, registered by the ordering service on behalf of `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOrderRequest {
    pub order_id: String,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub receive_address: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl RegisterOrderRequest {
    /// Provider order ids are alphanumeric, with `-` and `_`. Anything else is refused before it reaches a provider URL.
    pub fn into_new_transaction(self) -> Result<NewTransaction, ServerError> {
        let order_id = self.order_id.trim();
        if order_id.is_empty() || !order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ServerError::ValidationError(format!("'{order_id}' is not a valid order id")));
        }
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            return Err(ServerError::ValidationError("An order must be registered for a user".to_string()));
        }
        Ok(NewTransaction {
            order_id: OrderId::from(order_id),
            user_id: user_id.to_string(),
            amount: self.amount,
            currency: self.currency,
            network: self.network,
            receive_address: self.receive_address,
            reference: self.reference,
            valid_until: self.valid_until,
        })
    }
}

//----------------------------------------------   Rewards  ----------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Points,
}

/// `?type=earned` or `?type=withdrawn` restricts history to one kind of entry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EntryTypeFilter {
    #[serde(default, rename = "type")]
    pub entry_type: Option<LedgerEntryType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub points: Points,
    #[serde(flatten)]
    pub destination: PayoutDestination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WithdrawalStatusUpdate {
    pub status: WithdrawalStatus,
}
