//! The monotonic-rank rule that decides whether an observation may change a transaction's status.
//!
//! | current \ incoming   | unknown      | lower rank | same status | same rank, other status | higher rank |
//! |----------------------|--------------|------------|-------------|-------------------------|-------------|
//! | terminal (rank 3)    | NeedsReview  | Terminal   | Terminal    | Terminal                | -           |
//! | fulfilled            | NeedsReview  | Stale      | Unchanged   | Advanced (→ validated)  | Advanced    |
//! | validated            | NeedsReview  | Stale      | Unchanged   | Stale (→ fulfilled)     | Advanced    |
//! | pending, processing  | NeedsReview  | Stale      | Unchanged   | -                       | Advanced    |
//!
//! Only `Advanced` results in a status write.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{db_types::TransactionStatus, helpers::NormalizedStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ObservationOutcome {
    /// The transaction moved to a new status.
    Advanced { from: TransactionStatus, to: TransactionStatus },
    /// The observation repeats the current status.
    Unchanged,
    /// The transaction is already in a terminal status.
    Terminal,
    /// The observation is older than what is already recorded.
    Stale,
    /// The status token was not recognised and has been flagged for manual review.
    NeedsReview,
}

impl ObservationOutcome {
    pub fn status_changed(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advanced { .. } => "advanced",
            Self::Unchanged => "unchanged",
            Self::Terminal => "terminal",
            Self::Stale => "stale",
            Self::NeedsReview => "needs_review",
        }
    }
}

impl Display for ObservationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Advanced { from, to } => write!(f, "advanced ({from} → {to})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Decides what an incoming observation does to a transaction currently in status `current`.
pub fn decide(current: TransactionStatus, incoming: NormalizedStatus) -> ObservationOutcome {
    let incoming = match incoming {
        NormalizedStatus::NeedsReview => return ObservationOutcome::NeedsReview,
        NormalizedStatus::Known(s) => s,
    };
    if current.is_terminal() {
        return ObservationOutcome::Terminal;
    }
    if incoming == current {
        return ObservationOutcome::Unchanged;
    }
    match incoming.rank().cmp(&current.rank()) {
        std::cmp::Ordering::Less => ObservationOutcome::Stale,
        std::cmp::Ordering::Greater => ObservationOutcome::Advanced { from: current, to: incoming },
        // The only lateral pair is fulfilled/validated. Validation follows fulfilment, never the reverse.
        std::cmp::Ordering::Equal => match (current, incoming) {
            (TransactionStatus::Fulfilled, TransactionStatus::Validated) => {
                ObservationOutcome::Advanced { from: current, to: incoming }
            },
            _ => ObservationOutcome::Stale,
        },
    }
}
