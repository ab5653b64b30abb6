use mockall::mock;
use recon_engine::{
    db_types::{LedgerEntry, NewObservation, NewTransaction, Observation, OrderId, PayoutDestination, Points, Transaction, UserAccount, WithdrawalStatus},
    ledger_objects::{LedgerQuery, LedgerTotals},
    traits::{
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
    },
};

mock! {
    pub ReconDb {}
    impl Clone for ReconDb {
        fn clone(&self) -> Self;
    }
    impl TransactionManagement for ReconDb {
        async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<Transaction>, TransactionApiError>;
        async fn fetch_transactions_for_user(&self, user_id: &str) -> Result<Vec<Transaction>, TransactionApiError>;
        async fn fetch_open_transactions(&self, limit: i64) -> Result<Vec<Transaction>, TransactionApiError>;
        async fn fetch_observations(&self, order_id: &OrderId) -> Result<Vec<Observation>, TransactionApiError>;
    }
    impl ReconciliationDatabase for ReconDb {
        fn url(&self) -> &str;
        async fn insert_transaction(&self, transaction: NewTransaction) -> Result<(Transaction, bool), ReconciliationError>;
        async fn apply_observation(&self, observation: NewObservation) -> Result<ObservationResult, ReconciliationError>;
    }
}

mock! {
    pub LedgerManager {}
    impl LedgerManagement for LedgerManager {
        async fn credit_if_eligible(&self, order_id: &OrderId) -> Result<CreditResult, LedgerError>;
        async fn request_withdrawal(&self, user_id: &str, points: Points, destination: PayoutDestination) -> Result<LedgerEntry, LedgerError>;
        async fn update_withdrawal_status(&self, entry_id: i64, status: WithdrawalStatus) -> Result<LedgerEntry, LedgerError>;
        async fn recompute_balance(&self, user_id: &str) -> Result<Points, LedgerError>;
        async fn fetch_user_account(&self, user_id: &str) -> Result<Option<UserAccount>, LedgerError>;
        async fn fetch_ledger_entries(&self, query: LedgerQuery) -> Result<(Vec<LedgerEntry>, i64), LedgerError>;
        async fn fetch_ledger_totals(&self, user_id: &str) -> Result<LedgerTotals, LedgerError>;
    }
}

mock! {
    pub StatusProvider {}
    impl OrderStatusProvider for StatusProvider {
        async fn fetch_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus, ProviderError>;
    }
}
