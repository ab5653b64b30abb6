use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewObservation, NewTransaction, ObservationOrigin, OrderId, Transaction},
    events::{EventProducers, PointsCreditedEvent, ReviewRequiredEvent, StatusChangedEvent},
    helpers::{normalize, ObservationOutcome},
    traits::{ObservationResult, OrderStatusProvider, ProviderError, ReconciliationDatabase, ReconciliationError},
};

const AMOUNT_TOLERANCE: f64 = 1e-6;

/// The result of one sweep of the poller over open transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    pub polled: usize,
    pub advanced: usize,
    pub failed: usize,
}

/// `ReconciliationApi` is the primary API for bringing local transactions in line with the provider.
///
/// Status observations arrive from two channels: the provider's webhook, and the poller asking the provider directly.
/// Both feed into [`Self::apply_observation`], so the same transition rule, audit trail and reward crediting apply
/// regardless of which channel reports a change first.
pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationDatabase
{
    /// Registers a new payment order. Registering the same order id again is a no-op that returns the original record.
    pub async fn register_order(&self, transaction: NewTransaction) -> Result<Transaction, ReconciliationError> {
        let (txn, inserted) = self.db.insert_transaction(transaction).await?;
        if inserted {
            info!("🔄️ Order {} registered for {}", txn.order_id, txn.user_id);
        } else {
            debug!("🔄️ Order {} was already registered", txn.order_id);
        }
        Ok(txn)
    }

    /// Registers a new payment order after checking it against the provider's record.
    ///
    /// The provider must know the order and report the same amount, since the amount decides how many points the
    /// order earns. An order that is already registered is returned as is, without asking the provider.
    pub async fn register_verified_order<P>(
        &self,
        provider: &P,
        transaction: NewTransaction,
    ) -> Result<Transaction, ReconciliationError>
    where
        P: OrderStatusProvider,
    {
        if let Some(existing) = self.db.fetch_transaction(&transaction.order_id).await? {
            debug!("🔄️ Order {} was already registered", existing.order_id);
            return Ok(existing);
        }
        let order_id = &transaction.order_id;
        let report = provider.fetch_order_status(order_id.as_str()).await.map_err(|e| {
            warn!("🔄️ Could not verify order {order_id} with the provider. {e}");
            match e {
                ProviderError::OrderNotFound(_) => {
                    ReconciliationError::InvalidTransaction(format!("Order {order_id} is not known to the provider"))
                },
                e => ReconciliationError::Provider(e.to_string()),
            }
        })?;
        match report.amount {
            Some(amount) if (amount - transaction.amount).abs() < AMOUNT_TOLERANCE => {},
            Some(amount) => {
                warn!(
                    "🔄️ Registration of order {order_id} for {} claims an amount of {}, but the provider says {amount}",
                    transaction.user_id, transaction.amount
                );
                return Err(ReconciliationError::InvalidTransaction(format!(
                    "The amount for order {order_id} does not match the provider's amount of {amount}"
                )));
            },
            None => {
                warn!("🔄️ The provider did not report an amount for order {order_id}");
                return Err(ReconciliationError::InvalidTransaction(format!(
                    "The provider did not report an amount for order {order_id}"
                )));
            },
        }
        self.register_order(transaction).await
    }

    /// Applies a status report from the provider's webhook. `payload` is the raw request body.
    pub async fn process_webhook(
        &self,
        order_id: &OrderId,
        raw_status: &str,
        payload: String,
    ) -> Result<ObservationResult, ReconciliationError> {
        let observation = new_observation(order_id, raw_status, ObservationOrigin::Webhook, Some(payload), Utc::now());
        self.apply_observation(observation).await
    }

    /// Asks the provider for the current status of the order, and applies it.
    ///
    /// The provider is queried before any database writes happen, so a slow or failing provider never holds a lock.
    pub async fn poll_order<P>(&self, provider: &P, order_id: &OrderId) -> Result<ObservationResult, ReconciliationError>
    where P: OrderStatusProvider {
        if self.db.fetch_transaction(order_id).await?.is_none() {
            return Err(ReconciliationError::TransactionNotFound(order_id.clone()));
        }
        let report = provider.fetch_order_status(order_id.as_str()).await.map_err(|e| {
            warn!("🔄️ Could not poll order {order_id}. {e}");
            ReconciliationError::Provider(e.to_string())
        })?;
        let payload = serde_json::to_string(&report.raw).ok();
        let observation = new_observation(order_id, &report.status, ObservationOrigin::Poll, payload, Utc::now());
        self.apply_observation(observation).await
    }

    /// Polls up to `batch_size` open transactions, least recently polled first.
    ///
    /// A failure on one order is logged and counted, and does not stop the sweep.
    pub async fn poll_open_transactions<P>(
        &self,
        provider: &P,
        batch_size: i64,
    ) -> Result<PollSummary, ReconciliationError>
    where
        P: OrderStatusProvider,
    {
        let open = self.db.fetch_open_transactions(batch_size).await?;
        let mut summary = PollSummary::default();
        for txn in open {
            summary.polled += 1;
            match self.poll_order(provider, &txn.order_id).await {
                Ok(result) if result.outcome.status_changed() => summary.advanced += 1,
                Ok(_) => {},
                Err(e) => {
                    warn!("🔄️ Polling order {} failed. {e}", txn.order_id);
                    summary.failed += 1;
                },
            }
        }
        debug!("🔄️ Poll sweep complete: {summary:?}");
        Ok(summary)
    }

    /// Applies a normalised observation via the backend, then notifies subscribers of whatever changed.
    pub async fn apply_observation(&self, observation: NewObservation) -> Result<ObservationResult, ReconciliationError> {
        let order_id = observation.order_id.clone();
        let origin = observation.origin;
        let observed_at = observation.observed_at;
        let raw_status = observation.raw_status.clone();
        let result = match self.db.apply_observation(observation).await {
            Ok(result) => result,
            Err(ReconciliationError::TransactionNotFound(id)) => {
                info!("🔄️ Received a {origin} status report for unknown order {id}. Ignoring it.");
                return Err(ReconciliationError::TransactionNotFound(id));
            },
            Err(e) => {
                error!("🔄️ Could not apply {origin} status report for order {order_id}. {e}");
                return Err(e);
            },
        };
        let txn = &result.transaction;
        match result.outcome {
            ObservationOutcome::Advanced { from, to } => {
                info!("🔄️ Order {order_id} moved from {from} to {to} ({origin})");
                let event = StatusChangedEvent {
                    order_id: order_id.clone(),
                    user_id: txn.user_id.clone(),
                    from,
                    to,
                    origin,
                    observed_at,
                };
                for producer in &self.producers.status_changed_producer {
                    producer.publish_event(event.clone()).await;
                }
            },
            ObservationOutcome::NeedsReview => {
                warn!("🔄️ Order {order_id} received an unrecognised status '{raw_status}' ({origin}). Flagged for review.");
                let event = ReviewRequiredEvent { order_id: order_id.clone(), raw_status, origin, observed_at };
                for producer in &self.producers.review_required_producer {
                    producer.publish_event(event.clone()).await;
                }
            },
            outcome => debug!("🔄️ {origin} report for order {order_id} was {outcome}"),
        }
        if result.credit.credited {
            let event = PointsCreditedEvent::new(order_id.clone(), txn.user_id.clone(), result.credit.points);
            for producer in &self.producers.points_credited_producer {
                producer.publish_event(event.clone()).await;
            }
        }
        Ok(result)
    }
}

fn new_observation(
    order_id: &OrderId,
    raw_status: &str,
    origin: ObservationOrigin,
    payload: Option<String>,
    observed_at: DateTime<Utc>,
) -> NewObservation {
    NewObservation {
        order_id: order_id.clone(),
        origin,
        raw_status: raw_status.to_string(),
        status: normalize(raw_status),
        payload,
        observed_at,
    }
}
