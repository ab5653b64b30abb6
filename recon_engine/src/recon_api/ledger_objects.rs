use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerEntry, LedgerEntryType, Points};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const RECENT_ACTIVITY_COUNT: i64 = 10;

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// 1-based page selection, as supplied in `?page=&limit=` query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: default_page(), limit: default_limit() }
    }
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }.normalized()
    }

    /// Clamps the page to at least 1, and the limit to `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self { page: self.page.max(1), limit: self.limit.clamp(1, MAX_PAGE_SIZE) }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// A filter for ledger history queries.
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    pub user_id: String,
    pub entry_type: Option<LedgerEntryType>,
    pub pagination: Pagination,
}

impl LedgerQuery {
    pub fn for_user<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn with_entry_type(mut self, entry_type: LedgerEntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination.normalized();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_records: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, pagination: Pagination, total_records: i64) -> Self {
        let pagination = pagination.normalized();
        let total_pages = (total_records + pagination.limit - 1) / pagination.limit;
        Self {
            records,
            current_page: pagination.page,
            total_pages,
            total_records,
            has_more: pagination.page < total_pages,
        }
    }
}

/// Lifetime totals for a user's ledger, calculated the same way as the balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Points earned on transactions that are still reward-eligible
    pub total_earned: Points,
    /// Points withdrawn or awaiting withdrawal (failed withdrawals excluded), as a positive number
    pub total_withdrawn: Points,
}

impl LedgerTotals {
    pub fn balance(&self) -> Points {
        self.total_earned - self.total_withdrawn
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsSummary {
    pub current_balance: Points,
    pub total_earned: Points,
    pub total_withdrawn: Points,
    pub minimum_withdrawal: Points,
    pub can_withdraw: bool,
    pub recent_activity: Vec<LedgerEntry>,
}
