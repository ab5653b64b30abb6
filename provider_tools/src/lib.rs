//! A small client for the payment-order provider's REST API.
//!
//! Only the read side is needed for reconciliation: [`ProviderApi::fetch_order`] returns the provider's view of a
//! payment order, which the poller then feeds into the reconciliation engine.
mod api;
mod config;
mod data_objects;
mod error;
mod signing;

pub use api::ProviderApi;
pub use config::{ProviderConfig, DEFAULT_MAX_RETRIES};
pub use data_objects::{PaymentOrder, ProviderResponse};
pub use error::ProviderApiError;
pub use signing::{authorization_header, sign_payload};
