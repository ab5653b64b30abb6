use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Points, Transaction},
    helpers::ObservationOutcome,
};

/// The result of trying to credit reward points for a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditResult {
    /// True only if a new earned entry was written by this call.
    pub credited: bool,
    pub points: Points,
}

impl CreditResult {
    pub fn credited(points: Points) -> Self {
        Self { credited: true, points }
    }

    pub fn not_credited() -> Self {
        Self::default()
    }
}

impl Display for CreditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.credited {
            write!(f, "credited {}", self.points)
        } else {
            write!(f, "no credit")
        }
    }
}

/// Everything that happened as a result of applying a single status observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationResult {
    /// The transaction after the observation was applied
    pub transaction: Transaction,
    pub outcome: ObservationOutcome,
    pub credit: CreditResult,
    /// Points removed from the user's cached balance because the transaction left a reward-eligible status.
    pub clawback: Option<Points>,
}

impl ObservationResult {
    pub fn new(transaction: Transaction, outcome: ObservationOutcome) -> Self {
        Self { transaction, outcome, credit: CreditResult::not_credited(), clawback: None }
    }

    pub fn with_credit(mut self, credit: CreditResult) -> Self {
        self.credit = credit;
        self
    }

    pub fn with_clawback(mut self, points: Points) -> Self {
        self.clawback = Some(points);
        self
    }
}
