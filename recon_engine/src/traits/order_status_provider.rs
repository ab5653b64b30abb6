use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("The request to the provider failed. {0}")]
    RequestFailed(String),
    #[error("The provider returned an error ({status}). {message}")]
    ErrorResponse { status: u16, message: String },
    #[error("The provider response could not be understood. {0}")]
    InvalidResponse(String),
    #[error("The provider does not know about order {0}")]
    OrderNotFound(String),
}

/// The status of an order as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderOrderStatus {
    pub order_id: String,
    /// The raw status token, exactly as the provider reported it
    pub status: String,
    /// The order amount according to the provider, if it reported one
    #[serde(default)]
    pub amount: Option<f64>,
    /// The full response body, stored for auditing
    pub raw: serde_json::Value,
}

/// A source of authoritative order statuses. Implemented by the provider REST client.
#[allow(async_fn_in_trait)]
pub trait OrderStatusProvider {
    async fn fetch_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError>;
}
