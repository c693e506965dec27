//! SQLite backend for the freight marketplace store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every ledger write runs inside one
//! `BEGIN IMMEDIATE` transaction on that thread.

mod completion;
mod conversations;
mod encode;
mod formation;
mod jobs;
mod participants;
mod policy;
mod queries;
mod repair;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
