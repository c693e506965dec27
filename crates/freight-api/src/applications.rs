//! Handlers for `/applications` endpoints. All take no body; the acting user
//! is the poster (accept, reject) or the applicant (withdraw).

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use freight_core::{
  application::{Application, Formation, Withdrawn},
  service::FreightService,
};
use uuid::Uuid;

use crate::{error::ApiError, identity::ActingUser};

/// `POST /applications/{id}/accept`
pub async fn accept<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(poster): ActingUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Formation>, ApiError> {
  Ok(Json(engine.accept_application(id, poster).await?))
}

/// `POST /applications/{id}/reject`
pub async fn reject<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(poster): ActingUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Application>, ApiError> {
  Ok(Json(engine.reject_application(id, poster).await?))
}

/// `POST /applications/{id}/withdraw`
pub async fn withdraw<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(applicant): ActingUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Withdrawn>, ApiError> {
  Ok(Json(engine.withdraw_application(id, applicant).await?))
}
