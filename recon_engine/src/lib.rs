//! Reconciliation Engine
//!
//! The reconciliation engine keeps a local record of payment orders in line with an external payment-order provider,
//! and awards reward points to users when their orders complete.
//!
//! The library is divided into the following sections:
//! 1. The backend contracts ([`traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). You should
//!    rarely need to touch the database directly. The exception is the data types stored in it, which are defined in
//!    [`db_types`] and are public.
//! 2. The public API ([`recon_api`]). [`ReconciliationApi`] applies status observations, arriving from either the
//!    provider's webhook or the poller, under a monotonic transition rule. [`RewardsApi`] manages balances and
//!    withdrawals. [`TransactionsApi`] exposes read-only queries.
//! 3. Pure helpers ([`helpers`]) for status normalisation, the transition rule and webhook signature verification.
//!
//! The engine also emits [`events`] when a transaction changes status, when points are credited and when an
//! observation needs manual review. A simple actor framework lets you hook into these and perform custom actions.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod recon_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use recon_api::{
    ledger_objects,
    reconciliation_api::{PollSummary, ReconciliationApi},
    rewards_api::{BalanceCorrection, RewardsApi, DEFAULT_MIN_WITHDRAWAL},
    transactions_api::TransactionsApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CreditResult,
    LedgerError,
    LedgerManagement,
    ObservationResult,
    OrderStatusProvider,
    ProviderError,
    ProviderOrderStatus,
    ReconciliationDatabase,
    ReconciliationError,
    TransactionApiError,
    TransactionManagement,
};
