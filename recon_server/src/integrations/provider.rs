//! Bridges the provider REST client to the reconciliation engine's [`OrderStatusProvider`] contract.
use log::*;
use provider_tools::{ProviderApi, ProviderApiError, ProviderConfig};
use recon_engine::{OrderStatusProvider, ProviderError, ProviderOrderStatus};

use crate::errors::ServerError;

#[derive(Clone)]
pub struct ProviderStatusSource {
    api: ProviderApi,
}

impl ProviderStatusSource {
    pub fn new(config: ProviderConfig) -> Result<Self, ServerError> {
        let api = ProviderApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }
}

impl OrderStatusProvider for ProviderStatusSource {
    async fn fetch_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError> {
        let order = self.api.fetch_order(order_id).await.map_err(|e| provider_error(order_id, e))?;
        if order.id != order_id {
            warn!("🔄️ Asked the provider for order {order_id}, but it returned {}", order.id);
            return Err(ProviderError::InvalidResponse(format!("Expected order {order_id}, got {}", order.id)));
        }
        let amount = order.amount.as_deref().and_then(|a| a.trim().parse::<f64>().ok());
        Ok(ProviderOrderStatus { order_id: order.id, status: order.status, amount, raw: order.raw })
    }
}

fn provider_error(order_id: &str, e: ProviderApiError) -> ProviderError {
    match e {
        ProviderApiError::QueryError { status: 404, .. } | ProviderApiError::InvalidOrderId(_) => {
            ProviderError::OrderNotFound(order_id.to_string())
        },
        ProviderApiError::QueryError { status, message } => ProviderError::ErrorResponse { status, message },
        ProviderApiError::JsonError(s) => ProviderError::InvalidResponse(s),
        ProviderApiError::EmptyResponse => ProviderError::InvalidResponse(e.to_string()),
        ProviderApiError::Rejected(message) => ProviderError::ErrorResponse { status: 200, message },
        e => ProviderError::RequestFailed(e.to_string()),
    }
}
