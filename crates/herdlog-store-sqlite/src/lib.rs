//! SQLite backend for the herdlog logs.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements
//! [`herdlog_core::store::HerdStore`] for reads and exposes the write helpers
//! the surrounding system and the tests use to populate the logs.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
