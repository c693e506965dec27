//! Collaborators the engine notifies after a ledger write has committed.
//!
//! Both are best-effort: a failure here is logged by the engine and never
//! unwinds the committed contract.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// A communication channel attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
  pub conversation_id: Uuid,
  pub job_id:          Uuid,
  pub title:           String,
  pub participants:    Vec<Uuid>,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`ConversationService::create_or_get`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRequest {
  pub job_id:         Uuid,
  pub title:          String,
  pub participants:   Vec<Uuid>,
  pub system_message: Option<String>,
}

/// The chat subsystem, reduced to the one call the engine needs.
pub trait ConversationService: Send + Sync {
  /// Return the conversation for `request.job_id`, creating it if needed,
  /// adding any missing participants and posting the system message.
  fn create_or_get(
    &self,
    request: ConversationRequest,
  ) -> impl Future<Output = Result<Conversation>> + Send + '_;
}

/// Events emitted after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum DomainEvent {
  #[serde(rename = "job:assigned")]
  JobAssigned {
    job_id:            Uuid,
    contract_id:       Uuid,
    driver_id:         Uuid,
    applicant_user_id: Uuid,
  },
  #[serde(rename = "contract:completed")]
  ContractCompleted {
    contract_id:  Uuid,
    job_id:       Uuid,
    main_earning: i64,
  },
}

impl DomainEvent {
  /// The wire name of the event.
  pub fn name(&self) -> &'static str {
    match self {
      Self::JobAssigned { .. } => "job:assigned",
      Self::ContractCompleted { .. } => "contract:completed",
    }
  }
}

/// Fire-and-forget real-time notifier.
pub trait Notifier: Send + Sync {
  fn emit(&self, event: DomainEvent);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn event_serialises_with_wire_name() {
    let event = DomainEvent::JobAssigned {
      job_id:            Uuid::nil(),
      contract_id:       Uuid::nil(),
      driver_id:         Uuid::nil(),
      applicant_user_id: Uuid::nil(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "job:assigned");
    assert_eq!(json["event"], event.name());
    assert!(json["payload"]["contract_id"].is_string());
  }
}
