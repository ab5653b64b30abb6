//! # Reconciliation server
//! This crate hosts the HTTP server for the reconciliation engine. It is responsible for:
//! * Receiving signed status webhooks from the payment-order provider and feeding them to the engine.
//! * Polling the provider for open orders in the background, and on demand.
//! * Exposing the rewards ledger (balances, history and withdrawals) to authenticated users.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhooks/paycrest`: The webhook route for provider status reports. Requests must be signed.
//! * `/api/*`: Order registration, polling, transactions and rewards. Requests must carry the identity headers.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod poll_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
