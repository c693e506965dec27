//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape
//! `{"error": {"kind": "<kind>", "message": "<text>"}}`. Internal failures are
//! logged and reported only as `"internal error"`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use freight_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] freight_core::Error),

  /// The acting user could not be determined from the request.
  #[error("missing or malformed x-user-id header")]
  Unidentified,
}

impl ApiError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::Core(e) => e.kind(),
      ApiError::Unidentified => ErrorKind::Authorization,
    }
  }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Validation => StatusCode::BAD_REQUEST,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::Authorization => StatusCode::FORBIDDEN,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let status = match self {
      ApiError::Unidentified => StatusCode::UNAUTHORIZED,
      _ => status_for(kind),
    };
    let message = match kind {
      ErrorKind::Internal => {
        tracing::error!(error = %self, "internal error");
        "internal error".to_owned()
      }
      _ => self.to_string(),
    };
    (
      status,
      Json(json!({ "error": { "kind": kind.as_ref(), "message": message } })),
    )
      .into_response()
  }
}
