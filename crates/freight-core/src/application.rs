//! Job applications and the tagged request/response types of the formation
//! workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  contract::{Contract, SubContract},
  job::{AssignmentType, Job, MAX_AMOUNT},
};

/// Upper bound on free-text fields accepted from applicants.
pub const MAX_TEXT_LEN: usize = 4_000;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
  Pending,
  Accepted,
  Rejected,
  Withdrawn,
  Completed,
}

impl ApplicationStatus {
  /// Live applications block a second application by the same user.
  pub fn is_live(self) -> bool { matches!(self, Self::Pending | Self::Accepted) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
  pub application_id: Uuid,
  pub job_id:         Uuid,
  pub applicant_id:   Uuid,
  pub status:         ApplicationStatus,
  pub proposed_rate:  Option<i64>,
  pub cover_letter:   Option<String>,
  pub notes:          Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Input to the apply operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
  pub applicant_id:  Uuid,
  pub job_id:        Uuid,
  pub proposed_rate: Option<i64>,
  pub cover_letter:  Option<String>,
  pub notes:         Option<String>,
}

impl ApplyRequest {
  pub fn new(applicant_id: Uuid, job_id: Uuid) -> Self {
    Self {
      applicant_id,
      job_id,
      proposed_rate: None,
      cover_letter: None,
      notes: None,
    }
  }

  pub fn with_rate(mut self, rate: i64) -> Self {
    self.proposed_rate = Some(rate);
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.applicant_id.is_nil() || self.job_id.is_nil() {
      return Err(Error::Validation("applicant and job ids are required".into()));
    }
    if let Some(rate) = self.proposed_rate
      && rate <= 0
    {
      return Err(Error::Validation("proposed rate must be positive".into()));
    }
    if self.proposed_rate.is_some_and(|rate| rate > MAX_AMOUNT) {
      return Err(Error::Validation(format!(
        "proposed rate must not exceed {MAX_AMOUNT}"
      )));
    }
    for (field, text) in
      [("cover_letter", &self.cover_letter), ("notes", &self.notes)]
    {
      if text.as_ref().is_some_and(|t| t.len() > MAX_TEXT_LEN) {
        return Err(Error::Validation(format!(
          "{field} exceeds {MAX_TEXT_LEN} bytes"
        )));
      }
    }
    Ok(())
  }
}

/// Whether an application must wait for explicit acceptance.
///
/// Manual jobs always wait. On auto jobs a counter-offer (a proposed rate that
/// differs from the posted rate) waits too; an absent or equal rate does not.
pub fn requires_manual_review(job: &Job, proposed_rate: Option<i64>) -> bool {
  job.assignment_type == AssignmentType::Manual
    || proposed_rate.is_some_and(|rate| rate != job.pay_amount)
}

/// The amount a contract formed from `application` binds the poster to.
pub fn agreed_amount(job: &Job, application: &Application) -> i64 {
  application.proposed_rate.unwrap_or(job.pay_amount)
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// Everything written by a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
  pub application:  Application,
  pub contract:     Contract,
  pub job:          Job,
  /// Present only when the job was reshared from an already-contracted job.
  pub sub_contract: Option<SubContract>,
}

/// Result of applying to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Applied {
  /// Waiting for the poster (manual job or counter-offer).
  Pending { application: Application },
  /// Auto-accepted; a contract now exists.
  Contracted(Formation),
}

impl Applied {
  pub fn application(&self) -> &Application {
    match self {
      Self::Pending { application } => application,
      Self::Contracted(f) => &f.application,
    }
  }

  pub fn formation(&self) -> Option<&Formation> {
    match self {
      Self::Pending { .. } => None,
      Self::Contracted(f) => Some(f),
    }
  }
}

/// Confirmation returned by the withdraw operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawn {
  pub application_id: Uuid,
  pub withdrawn:      bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::job::{BillingCycle, JobStatus};

  fn job(assignment_type: AssignmentType, pay_amount: i64) -> Job {
    Job {
      job_id: Uuid::new_v4(),
      posted_by: Uuid::new_v4(),
      title: "Flatbed to Reno".into(),
      pay_amount,
      billing_cycle: BillingCycle::Weekly,
      assignment_type,
      status: JobStatus::Active,
      parent_job_id: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn manual_jobs_always_wait() {
    let j = job(AssignmentType::Manual, 500);
    assert!(requires_manual_review(&j, None));
    assert!(requires_manual_review(&j, Some(500)));
  }

  #[test]
  fn counter_offer_on_auto_job_waits() {
    let j = job(AssignmentType::Auto, 500);
    assert!(requires_manual_review(&j, Some(450)));
    assert!(requires_manual_review(&j, Some(650)));
  }

  #[test]
  fn matching_or_absent_rate_on_auto_job_proceeds() {
    let j = job(AssignmentType::Auto, 500);
    assert!(!requires_manual_review(&j, None));
    assert!(!requires_manual_review(&j, Some(500)));
  }

  #[test]
  fn apply_request_validation() {
    let ok = ApplyRequest::new(Uuid::new_v4(), Uuid::new_v4());
    assert!(ok.validate().is_ok());
    assert!(ok.clone().with_rate(0).validate().is_err());
    assert!(ok.clone().with_rate(MAX_AMOUNT).validate().is_ok());
    assert!(ok.clone().with_rate(MAX_AMOUNT + 1).validate().is_err());

    let nil = ApplyRequest::new(Uuid::nil(), Uuid::new_v4());
    assert!(nil.validate().is_err());

    let mut long = ok;
    long.notes = Some("x".repeat(MAX_TEXT_LEN + 1));
    assert!(matches!(long.validate(), Err(Error::Validation(_))));
  }
}
