//! Core types, trait definitions and the contract formation engine for the
//! freight marketplace.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::MarketStore`]; the HTTP layer depends on
//! [`service::FreightService`], which [`engine::Engine`] implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod application;
pub mod collab;
pub mod commission;
pub mod contract;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod job;
pub mod service;
pub mod settlement;
pub mod store;

pub use error::{Error, ErrorKind, Result};
