use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{LedgerEntry, LedgerEntryType, OrderId, PayoutDestination, Points, WithdrawalStatus},
    recon_api::ledger_objects::{LedgerQuery, Page, Pagination, RewardsSummary, RECENT_ACTIVITY_COUNT},
    traits::{CreditResult, LedgerError, LedgerManagement},
};

pub const DEFAULT_MIN_WITHDRAWAL: i64 = 5000;

/// The cached balance before and after a forced recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCorrection {
    pub previous: Points,
    pub current: Points,
}

impl BalanceCorrection {
    pub fn is_corrected(&self) -> bool {
        self.previous != self.current
    }
}

/// `RewardsApi` manages reward point balances and withdrawals.
///
/// Every balance it reports is recomputed from the ledger, so drift in the cached balance is repaired as a side
/// effect of reading it.
pub struct RewardsApi<B> {
    db: B,
    min_withdrawal: Points,
}

impl<B> Debug for RewardsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RewardsApi (minimum withdrawal: {})", self.min_withdrawal)
    }
}

impl<B> RewardsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, min_withdrawal: Points::from(DEFAULT_MIN_WITHDRAWAL) }
    }

    pub fn with_min_withdrawal(mut self, min_withdrawal: Points) -> Self {
        self.min_withdrawal = min_withdrawal;
        self
    }

    pub fn min_withdrawal(&self) -> Points {
        self.min_withdrawal
    }
}

impl<B> RewardsApi<B>
where B: LedgerManagement
{
    /// The user's current balance, recomputed from the ledger.
    pub async fn balance(&self, user_id: &str) -> Result<Points, LedgerError> {
        self.db.recompute_balance(user_id).await
    }

    pub async fn summary(&self, user_id: &str) -> Result<RewardsSummary, LedgerError> {
        let current_balance = self.db.recompute_balance(user_id).await?;
        let totals = self.db.fetch_ledger_totals(user_id).await?;
        let query = LedgerQuery::for_user(user_id).with_pagination(Pagination::new(1, RECENT_ACTIVITY_COUNT));
        let (recent_activity, _) = self.db.fetch_ledger_entries(query).await?;
        Ok(RewardsSummary {
            current_balance,
            total_earned: totals.total_earned,
            total_withdrawn: totals.total_withdrawn,
            minimum_withdrawal: self.min_withdrawal,
            can_withdraw: current_balance >= self.min_withdrawal,
            recent_activity,
        })
    }

    /// A page of the user's ledger, newest first, optionally restricted to one entry type.
    pub async fn history(
        &self,
        user_id: &str,
        entry_type: Option<LedgerEntryType>,
        pagination: Pagination,
    ) -> Result<Page<LedgerEntry>, LedgerError> {
        let pagination = pagination.normalized();
        let mut query = LedgerQuery::for_user(user_id).with_pagination(pagination);
        query.entry_type = entry_type;
        let (records, total) = self.db.fetch_ledger_entries(query).await?;
        Ok(Page::new(records, pagination, total))
    }

    pub async fn withdrawals(&self, user_id: &str, pagination: Pagination) -> Result<Page<LedgerEntry>, LedgerError> {
        self.history(user_id, Some(LedgerEntryType::Withdrawn), pagination).await
    }

    /// Requests a withdrawal. The amount must be at least the configured minimum, and the destination must be complete.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        points: Points,
        destination: PayoutDestination,
    ) -> Result<LedgerEntry, LedgerError> {
        if points < self.min_withdrawal {
            return Err(LedgerError::ValidationError(format!(
                "The minimum withdrawal is {}. {points} was requested",
                self.min_withdrawal
            )));
        }
        if !destination.is_complete() {
            return Err(LedgerError::ValidationError("An account number and bank name are required".into()));
        }
        self.db.request_withdrawal(user_id, points, destination).await
    }

    pub async fn update_withdrawal_status(
        &self,
        entry_id: i64,
        status: WithdrawalStatus,
    ) -> Result<LedgerEntry, LedgerError> {
        self.db.update_withdrawal_status(entry_id, status).await
    }

    /// Rebuilds the user's cached balance from the ledger and reports whether it had drifted.
    pub async fn recalculate(&self, user_id: &str) -> Result<BalanceCorrection, LedgerError> {
        let previous = self.db.fetch_user_account(user_id).await?.map(|a| a.reward_points).unwrap_or_default();
        let current = self.db.recompute_balance(user_id).await?;
        let correction = BalanceCorrection { previous, current };
        if correction.is_corrected() {
            warn!("💰️ Cached balance for {user_id} was {previous}. Corrected to {current}");
        } else {
            debug!("💰️ Cached balance for {user_id} of {current} is correct");
        }
        Ok(correction)
    }

    pub async fn credit_order(&self, order_id: &OrderId) -> Result<CreditResult, LedgerError> {
        self.db.credit_if_eligible(order_id).await
    }
}
