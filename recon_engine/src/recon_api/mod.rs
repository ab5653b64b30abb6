//! # Reconciliation engine public API
//!
//! The `recon_api` module exposes the programmatic API for the reconciliation engine. The API is modular, so that
//! clients can pick and choose the functionality they need.
//!
//! * [`reconciliation_api`] registers orders and applies status observations from the webhook and the poller.
//! * [`rewards_api`] manages reward balances, ledger history and withdrawals.
//! * [`transactions_api`] provides read-only access to transactions and their observation history.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use recon_engine::{RewardsApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements LedgerManagement
//! let api = RewardsApi::new(db);
//! let balance = api.balance("user-123").await?;
//! ```
pub mod ledger_objects;
pub mod reconciliation_api;
pub mod rewards_api;
pub mod transactions_api;
