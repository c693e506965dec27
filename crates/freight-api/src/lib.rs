//! JSON REST API for the freight marketplace.
//!
//! Exposes an axum [`Router`] backed by any
//! [`freight_core::service::FreightService`]. Authentication, TLS, and
//! transport concerns are the caller's responsibility; the acting user arrives
//! in the `x-user-id` header (see [`identity::ActingUser`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", freight_api::api_router(engine.clone()))
//! ```

pub mod applications;
pub mod contracts;
pub mod error;
pub mod identity;
pub mod jobs;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use freight_core::service::FreightService;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<E>(engine: Arc<E>) -> Router<()>
where
  E: FreightService + 'static,
{
  Router::new()
    // Jobs
    .route("/jobs", post(jobs::create::<E>))
    .route("/jobs/{id}", get(jobs::get_one::<E>))
    .route("/jobs/{id}/reshare", post(jobs::reshare::<E>))
    .route("/jobs/{id}/apply", post(jobs::apply::<E>))
    // Applications
    .route("/applications/{id}/accept", post(applications::accept::<E>))
    .route("/applications/{id}/reject", post(applications::reject::<E>))
    .route("/applications/{id}/withdraw", post(applications::withdraw::<E>))
    // Contracts
    .route("/contracts", get(contracts::list::<E>))
    .route("/contracts/{id}", get(contracts::get_one::<E>))
    .route("/contracts/{id}/complete", post(contracts::complete::<E>))
    .route(
      "/contracts/{id}/participants",
      post(contracts::add_participant::<E>),
    )
    .route(
      "/contracts/{id}/participants/history",
      get(contracts::participant_history::<E>),
    )
    .route(
      "/contracts/{id}/participants/{user_id}",
      patch(contracts::update_participant::<E>),
    )
    .with_state(engine)
}
