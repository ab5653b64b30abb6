//! # Backend contracts
//!
//! This module defines the behaviour that database backends (and upstream status sources) must expose in order to be
//! used by the reconciliation engine.
//!
//! * [`ReconciliationDatabase`] is the highest level of behaviour. It registers orders, and applies status
//!   observations from the webhook and the poller atomically, including any ledger side effects.
//! * [`TransactionManagement`] provides read-only queries over transactions and their observation history.
//! * [`LedgerManagement`] manages the rewards ledger: crediting points, withdrawals and balance recomputation.
//! * [`OrderStatusProvider`] abstracts the upstream payment-order provider, so that the poller can be tested without
//!   network access.
mod data_objects;
mod ledger_management;
mod order_status_provider;
mod reconciliation_database;
mod transaction_management;

pub use data_objects::{CreditResult, ObservationResult};
pub use ledger_management::{LedgerError, LedgerManagement};
pub use order_status_provider::{OrderStatusProvider, ProviderError, ProviderOrderStatus};
pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
pub use transaction_management::{TransactionApiError, TransactionManagement};
