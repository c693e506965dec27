//! The acting-user extractor.
//!
//! Authentication happens upstream; by the time a request reaches this router
//! the caller's id travels in the `x-user-id` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

/// The user on whose behalf the request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| Uuid::parse_str(s.trim()).ok())
      .filter(|id| !id.is_nil())
      .map(ActingUser)
      .ok_or(ApiError::Unidentified)
  }
}
