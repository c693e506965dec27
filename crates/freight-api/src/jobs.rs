//! Handlers for `/jobs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/jobs` | Body: [`CreateJobBody`]; returns 201 + job |
//! | `GET`  | `/jobs/{id}` | 404 if not found |
//! | `POST` | `/jobs/{id}/reshare` | Body: [`ReshareBody`]; caller must hold the job's contract |
//! | `POST` | `/jobs/{id}/apply` | Body: [`ApplyBody`]; returns 201 + [`Applied`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use freight_core::{
  application::{Applied, ApplyRequest},
  job::{AssignmentType, BillingCycle, Job, JobStatus, NewJob},
  service::FreightService,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, identity::ActingUser};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
  pub title:           String,
  pub pay_amount:      i64,
  #[serde(default)]
  pub billing_cycle:   BillingCycle,
  #[serde(default)]
  pub assignment_type: AssignmentType,
  pub status:          Option<JobStatus>,
}

/// `POST /jobs`
pub async fn create<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(poster): ActingUser,
  Json(body): Json<CreateJobBody>,
) -> Result<impl IntoResponse, ApiError> {
  let mut input = NewJob::new(poster, body.title, body.pay_amount);
  input.billing_cycle = body.billing_cycle;
  input.assignment_type = body.assignment_type;
  if let Some(status) = body.status {
    input.status = status;
  }
  let job = engine.create_job(input).await?;
  Ok((StatusCode::CREATED, Json(job)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /jobs/{id}`
pub async fn get_one<E: FreightService>(
  State(engine): State<Arc<E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
  Ok(Json(engine.get_job(id).await?))
}

// ─── Reshare ──────────────────────────────────────────────────────────────────

/// Billing cycle is inherited from the parent job.
#[derive(Debug, Deserialize)]
pub struct ReshareBody {
  pub title:           String,
  pub pay_amount:      i64,
  #[serde(default)]
  pub assignment_type: AssignmentType,
}

/// `POST /jobs/{id}/reshare`
pub async fn reshare<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(reposter): ActingUser,
  Path(parent_job_id): Path<Uuid>,
  Json(body): Json<ReshareBody>,
) -> Result<impl IntoResponse, ApiError> {
  let mut input = NewJob::new(reposter, body.title, body.pay_amount);
  input.assignment_type = body.assignment_type;
  let job = engine.reshare_job(parent_job_id, reposter, input).await?;
  Ok((StatusCode::CREATED, Json(job)))
}

// ─── Apply ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ApplyBody {
  pub proposed_rate: Option<i64>,
  pub cover_letter:  Option<String>,
  pub notes:         Option<String>,
}

/// `POST /jobs/{id}/apply`
pub async fn apply<E: FreightService>(
  State(engine): State<Arc<E>>,
  ActingUser(applicant): ActingUser,
  Path(job_id): Path<Uuid>,
  Json(body): Json<ApplyBody>,
) -> Result<(StatusCode, Json<Applied>), ApiError> {
  let request = ApplyRequest {
    applicant_id:  applicant,
    job_id,
    proposed_rate: body.proposed_rate,
    cover_letter:  body.cover_letter,
    notes:         body.notes,
  };
  let applied = engine.apply_for_job(request).await?;
  Ok((StatusCode::CREATED, Json(applied)))
}
