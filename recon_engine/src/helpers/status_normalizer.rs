//! Maps the provider's informal status vocabulary onto [`TransactionStatus`].
//!
//! The provider is not consistent about how it names statuses. Webhooks carry event names such as
//! `payment_order.settled`, while polling responses return bare tokens such as `settled` or `Settled`, and some
//! older integrations use synonyms (`completed`, `confirmed`, ...). Normalisation:
//!
//! 1. trims whitespace and lowercases the token,
//! 2. strips any namespace prefix (everything up to and including the last `.`),
//! 3. matches the remainder against the known families.
//!
//! Anything that doesn't match a family is [`NormalizedStatus::NeedsReview`]. It is never silently mapped onto
//! `pending`, since that would hide unknown provider behaviour.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::db_types::TransactionStatus;

pub const NEEDS_REVIEW: &str = "needs_review";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedStatus {
    Known(TransactionStatus),
    /// The status token was not recognised. It never advances a transaction.
    NeedsReview,
}

impl NormalizedStatus {
    /// `NeedsReview` ranks with `pending`, so it can never move a transaction forward.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Known(s) => s.rank(),
            Self::NeedsReview => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Known(s) if s.is_terminal())
    }

    pub fn known(&self) -> Option<TransactionStatus> {
        match self {
            Self::Known(s) => Some(*s),
            Self::NeedsReview => None,
        }
    }
}

impl Display for NormalizedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(s) => write!(f, "{s}"),
            Self::NeedsReview => f.write_str(NEEDS_REVIEW),
        }
    }
}

impl From<TransactionStatus> for NormalizedStatus {
    fn from(status: TransactionStatus) -> Self {
        Self::Known(status)
    }
}

impl FromStr for NormalizedStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(normalize(s))
    }
}

/// Normalise a raw provider status token. Never fails; unrecognised input yields [`NormalizedStatus::NeedsReview`].
pub fn normalize(raw: &str) -> NormalizedStatus {
    let token = raw.trim().to_lowercase();
    let token = match token.rfind('.') {
        Some(i) => &token[i + 1..],
        None => token.as_str(),
    };
    use TransactionStatus::*;
    let status = match token {
        "pending" | "initiated" => Pending,
        "processing" | "assigned" => Processing,
        "fulfilled" | "completed" => Fulfilled,
        "validated" | "confirmed" => Validated,
        "settled" | "finalized" => Settled,
        t if t.starts_with("cancel") => Cancelled,
        "refunded" => Refunded,
        "expired" => Expired,
        "failed" | "error" => Failed,
        _ => return NormalizedStatus::NeedsReview,
    };
    NormalizedStatus::Known(status)
}
