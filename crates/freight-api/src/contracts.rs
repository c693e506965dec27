//! Handlers for `/contracts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/contracts` | Query maps to [`ContractQuery`] |
//! | `GET`  | `/contracts/{id}` | Contract with job, application, participants, subcontracts |
//! | `POST` | `/contracts/{id}/complete` | Root contract only, by its hirer |
//! | `POST` | `/contracts/{id}/participants` | Body: [`NewParticipant`]; returns 201 |
//! | `PATCH`| `/contracts/{id}/participants/{user_id}` | Body: [`ParticipantChange`] |
//! | `GET`  | `/contracts/{id}/participants/history` | Oldest first |
//!
//! Every route requires an acting user.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use freight_core::{
  contract::{
    ContractQuery, ContractView, NewParticipant, Page, Participant,
    ParticipantChange, ParticipantEvent,
  },
  service::FreightService,
  settlement::Completion,
};
use uuid::Uuid;

use crate::{error::ApiError, identity::ActingUser};

// ─── Contracts ────────────────────────────────────────────────────────────────

/// `GET /contracts[?is_mine=true][&status=...][&participant_status=...][&participant_role=...][&page=...][&page_size=...]`
pub async fn list<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(viewer): ActingUser,
  Query(query): Query<ContractQuery>,
) -> Result<Json<Page<ContractView>>, ApiError> {
  Ok(Json(engine.list_contracts(viewer, query).await?))
}

/// `GET /contracts/{id}`
pub async fn get_one<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(_viewer): ActingUser,
  Path(id): Path<Uuid>,
) -> Result<Json<ContractView>, ApiError> {
  Ok(Json(engine.get_contract(id).await?))
}

/// `POST /contracts/{id}/complete`
pub async fn complete<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(requester): ActingUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Completion>, ApiError> {
  Ok(Json(engine.complete_contract(id, requester).await?))
}

// ─── Participants ─────────────────────────────────────────────────────────────

/// `POST /contracts/{id}/participants`
pub async fn add_participant<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(actor): ActingUser,
  Path(contract_id): Path<Uuid>,
  Json(body): Json<NewParticipant>,
) -> Result<impl IntoResponse, ApiError> {
  let participant = engine.add_participant(contract_id, actor, body).await?;
  Ok((StatusCode::CREATED, Json(participant)))
}

/// `PATCH /contracts/{id}/participants/{user_id}`
pub async fn update_participant<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(actor): ActingUser,
  Path((contract_id, user_id)): Path<(Uuid, Uuid)>,
  Json(change): Json<ParticipantChange>,
) -> Result<Json<Participant>, ApiError> {
  Ok(Json(
    engine
      .update_participant(contract_id, actor, user_id, change)
      .await?,
  ))
}

/// `GET /contracts/{id}/participants/history`
pub async fn participant_history<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(_viewer): ActingUser,
  Path(contract_id): Path<Uuid>,
) -> Result<Json<Vec<ParticipantEvent>>, ApiError> {
  Ok(Json(engine.participant_history(contract_id).await?))
}
