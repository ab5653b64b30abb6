use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use recon_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::NormalizedStatus;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------   TransactionStatus   ---------------------------------------------------------
/// The canonical status of a payment order.
///
/// Statuses are ordered by [`TransactionStatus::rank`]. A transaction may only move to a status of equal or greater
/// rank, and once it reaches a terminal status (rank 3) it never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The order has been created with the provider, but nothing has happened yet.
    Pending,
    /// The provider has picked up the order.
    Processing,
    /// Funds have been delivered to the recipient.
    Fulfilled,
    /// The provider has confirmed delivery.
    Validated,
    /// The order is complete and settled on the provider's books.
    Settled,
    Cancelled,
    Refunded,
    Expired,
    Failed,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 9] = [
        TransactionStatus::Pending,
        TransactionStatus::Processing,
        TransactionStatus::Fulfilled,
        TransactionStatus::Validated,
        TransactionStatus::Settled,
        TransactionStatus::Cancelled,
        TransactionStatus::Refunded,
        TransactionStatus::Expired,
        TransactionStatus::Failed,
    ];

    pub fn rank(&self) -> u8 {
        use TransactionStatus::*;
        match self {
            Pending => 0,
            Processing => 1,
            Fulfilled | Validated => 2,
            Settled | Cancelled | Refunded | Expired | Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 3
    }

    /// Statuses that earn the owner reward points.
    pub fn is_reward_eligible(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Validated | Self::Settled)
    }

    pub fn as_str(&self) -> &'static str {
        use TransactionStatus::*;
        match self {
            Pending => "pending",
            Processing => "processing",
            Fulfilled => "fulfilled",
            Validated => "validated",
            Settled => "settled",
            Cancelled => "cancelled",
            Refunded => "refunded",
            Expired => "expired",
            Failed => "failed",
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ConversionError(format!("Invalid transaction status: {s}")))
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid transaction status: {value}. But this conversion cannot fail. Defaulting to pending");
            TransactionStatus::Pending
        })
    }
}

//--------------------------------------   ObservationOrigin   ---------------------------------------------------------
/// The channel an observation of an order's status arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObservationOrigin {
    Webhook,
    Poll,
}

impl Display for ObservationOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservationOrigin::Webhook => write!(f, "webhook"),
            ObservationOrigin::Poll => write!(f, "poll"),
        }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      Transaction      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// The order id issued by the payment-order provider
    pub order_id: OrderId,
    /// The user that initiated the order
    pub user_id: String,
    pub status: TransactionStatus,
    pub amount: f64,
    pub currency: String,
    pub network: Option<String>,
    pub receive_address: Option<String>,
    pub reference: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub last_observation_origin: Option<ObservationOrigin>,
    pub last_webhook_payload: Option<String>,
    pub last_webhook_at: Option<DateTime<Utc>>,
    pub last_polled_payload: Option<String>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewTransaction    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub order_id: OrderId,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub receive_address: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new<S: Into<String>>(order_id: OrderId, user_id: S, amount: f64, currency: S) -> Self {
        Self {
            order_id,
            user_id: user_id.into(),
            amount,
            currency: currency.into(),
            network: None,
            receive_address: None,
            reference: None,
            valid_until: None,
        }
    }

    pub fn with_network<S: Into<String>>(mut self, network: S) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_receive_address<S: Into<String>>(mut self, address: S) -> Self {
        self.receive_address = Some(address.into());
        self
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }
}

//--------------------------------------      Observation      ---------------------------------------------------------
/// A status observation for an order, as received from either the webhook or a poll.
#[derive(Debug, Clone)]
pub struct NewObservation {
    pub order_id: OrderId,
    pub origin: ObservationOrigin,
    /// The status token exactly as the provider sent it
    pub raw_status: String,
    pub status: NormalizedStatus,
    /// The raw body of the webhook call or poll response
    pub payload: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// An entry in the append-only observation log.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub order_id: OrderId,
    pub origin: ObservationOrigin,
    pub raw_status: String,
    pub normalized_status: String,
    pub outcome: String,
    pub payload: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      UserAccount      ---------------------------------------------------------
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub user_id: String,
    /// Cached balance. It is always recomputable from the ledger.
    pub reward_points: Points,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    LedgerEntryType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType {
    Earned,
    Withdrawn,
}

impl Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryType::Earned => write!(f, "earned"),
            LedgerEntryType::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

impl FromStr for LedgerEntryType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earned" => Ok(Self::Earned),
            "withdrawn" => Ok(Self::Withdrawn),
            s => Err(ConversionError(format!("Invalid ledger entry type: {s}"))),
        }
    }
}

//--------------------------------------    WithdrawalStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid withdrawal status: {s}"))),
        }
    }
}

//--------------------------------------   PayoutDestination   ---------------------------------------------------------
/// Where a withdrawal is paid out to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutDestination {
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_name: Option<String>,
}

impl PayoutDestination {
    pub fn new<S: Into<String>>(account_number: S, bank_name: S) -> Self {
        Self { account_number: account_number.into(), bank_name: bank_name.into(), account_name: None }
    }

    pub fn with_account_name<S: Into<String>>(mut self, name: S) -> Self {
        self.account_name = Some(name.into());
        self
    }

    /// Account number and bank name are both required.
    pub fn is_complete(&self) -> bool {
        !self.account_number.trim().is_empty() && !self.bank_name.trim().is_empty()
    }
}

//--------------------------------------      LedgerEntry      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub entry_type: LedgerEntryType,
    /// Positive for earned entries, negative for withdrawals
    pub points: Points,
    /// The order that earned these points. Only set for earned entries.
    pub transaction_id: Option<OrderId>,
    pub withdrawal_status: Option<WithdrawalStatus>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
