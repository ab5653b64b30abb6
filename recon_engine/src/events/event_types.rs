use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{ObservationOrigin, OrderId, Points, TransactionStatus};

/// A transaction moved to a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub order_id: OrderId,
    pub user_id: String,
    pub from: TransactionStatus,
    pub to: TransactionStatus,
    pub origin: ObservationOrigin,
    pub observed_at: DateTime<Utc>,
}

/// Reward points were written to the ledger for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsCreditedEvent {
    pub order_id: OrderId,
    pub user_id: String,
    pub points: Points,
}

impl PointsCreditedEvent {
    pub fn new(order_id: OrderId, user_id: String, points: Points) -> Self {
        Self { order_id, user_id, points }
    }
}

/// An observation carried a status token that could not be normalised. The transaction was not changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequiredEvent {
    pub order_id: OrderId,
    pub raw_status: String,
    pub origin: ObservationOrigin,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    StatusChanged(StatusChangedEvent),
    PointsCredited(PointsCreditedEvent),
    ReviewRequired(ReviewRequiredEvent),
}
