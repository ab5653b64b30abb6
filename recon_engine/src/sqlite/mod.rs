//! SQLite backend for the reconciliation engine.
//!
//! Schema migrations live in `migrations/` and are embedded at compile time. See [`SqliteDatabase::migrate`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
