//! Error types for `freight-core`.
//!
//! Every failure the engine can report falls into one of the [`ErrorKind`]
//! buckets. Storage backends wrap their own failures in [`Error::Store`], which
//! is reported as [`ErrorKind::Internal`].

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  application::ApplicationStatus, contract::ContractStatus, job::JobStatus,
};

/// Machine-readable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// Missing or malformed input; rejected before any lock is taken.
  Validation,
  /// The request lost a race or contradicts current state.
  Conflict,
  /// The acting user may not perform this operation.
  Authorization,
  NotFound,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("job not found")]
  JobNotFound(Uuid),

  #[error("application not found")]
  ApplicationNotFound(Uuid),

  #[error("contract not found")]
  ContractNotFound(Uuid),

  #[error("participant not found on this contract")]
  ParticipantNotFound { contract_id: Uuid, user_id: Uuid },

  #[error("job is not accepting applications (status: {status})")]
  JobNotActive { job_id: Uuid, status: JobStatus },

  #[error("applicant already has a live application on this job")]
  DuplicateApplication { job_id: Uuid, applicant_id: Uuid },

  #[error("job already has a live contract")]
  ContractExists(Uuid),

  #[error("application is {status}, expected pending")]
  ApplicationNotPending {
    application_id: Uuid,
    status:         ApplicationStatus,
  },

  #[error("contract is {status}")]
  ContractNotActive {
    contract_id: Uuid,
    status:      ContractStatus,
  },

  #[error("user is already a participant on this contract")]
  ParticipantExists { contract_id: Uuid, user_id: Uuid },

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::JobNotFound(_)
      | Self::ApplicationNotFound(_)
      | Self::ContractNotFound(_)
      | Self::ParticipantNotFound { .. } => ErrorKind::NotFound,
      Self::JobNotActive { .. }
      | Self::DuplicateApplication { .. }
      | Self::ContractExists(_)
      | Self::ApplicationNotPending { .. }
      | Self::ContractNotActive { .. }
      | Self::ParticipantExists { .. } => ErrorKind::Conflict,
      Self::Forbidden(_) => ErrorKind::Authorization,
      Self::Serialization(_) | Self::Store(_) => ErrorKind::Internal,
    }
  }

  /// Wrap an arbitrary backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_follow_taxonomy() {
    let id = Uuid::new_v4();
    assert_eq!(Error::Validation("x".into()).kind(), ErrorKind::Validation);
    assert_eq!(Error::JobNotFound(id).kind(), ErrorKind::NotFound);
    assert_eq!(Error::ContractExists(id).kind(), ErrorKind::Conflict);
    assert_eq!(
      Error::JobNotActive { job_id: id, status: JobStatus::Assigned }.kind(),
      ErrorKind::Conflict
    );
    assert_eq!(Error::Forbidden("no".into()).kind(), ErrorKind::Authorization);
    assert_eq!(
      Error::store(std::io::Error::other("disk")).kind(),
      ErrorKind::Internal
    );
  }

  #[test]
  fn messages_carry_no_row_ids() {
    let id = Uuid::new_v4();
    let errors = [
      Error::JobNotFound(id),
      Error::ContractExists(id),
      Error::JobNotActive { job_id: id, status: JobStatus::Assigned },
      Error::ContractNotActive { contract_id: id, status: ContractStatus::Completed },
    ];
    for error in errors {
      assert!(!error.to_string().contains(&id.to_string()), "{error}");
    }
  }

  #[test]
  fn kind_strings_are_snake_case() {
    assert_eq!(ErrorKind::NotFound.as_ref(), "not_found");
    assert_eq!(ErrorKind::Authorization.as_ref(), "authorization");
  }
}
