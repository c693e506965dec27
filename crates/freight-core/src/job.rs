//! Job postings: the leaf of the contract hierarchy.
//!
//! A job with a `parent_job_id` is a re-shared slice of an ancestor job.
//! Following that link repeatedly (bounded, cycle-checked) reaches a root job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on any posted or proposed amount, in minor currency units.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

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
pub enum JobStatus {
  Draft,
  PendingFunding,
  Active,
  Assigned,
  InProgress,
  Completed,
  Cancelled,
}

/// Whether a matching application is contracted immediately or waits for the
/// poster to accept it.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum AssignmentType {
  Auto,
  #[default]
  Manual,
}

/// The commission-rate lookup key applied to a role.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BillingCycle {
  Hourly,
  Weekly,
  #[default]
  Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub job_id:          Uuid,
  pub posted_by:       Uuid,
  pub title:           String,
  /// Posted rate in minor currency units.
  pub pay_amount:      i64,
  pub billing_cycle:   BillingCycle,
  pub assignment_type: AssignmentType,
  pub status:          JobStatus,
  pub parent_job_id:   Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Job {
  pub fn is_root(&self) -> bool { self.parent_job_id.is_none() }
}

/// Input to [`crate::store::MarketStore::insert_job`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
  pub posted_by:       Uuid,
  pub title:           String,
  pub pay_amount:      i64,
  #[serde(default)]
  pub billing_cycle:   BillingCycle,
  #[serde(default)]
  pub assignment_type: AssignmentType,
  #[serde(default = "default_status")]
  pub status:          JobStatus,
  #[serde(default)]
  pub parent_job_id:   Option<Uuid>,
}

fn default_status() -> JobStatus { JobStatus::Active }

impl NewJob {
  pub fn new(posted_by: Uuid, title: impl Into<String>, pay_amount: i64) -> Self {
    Self {
      posted_by,
      title: title.into(),
      pay_amount,
      billing_cycle: BillingCycle::default(),
      assignment_type: AssignmentType::default(),
      status: default_status(),
      parent_job_id: None,
    }
  }

  pub fn auto(mut self) -> Self {
    self.assignment_type = AssignmentType::Auto;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("job title must not be empty".into()));
    }
    if self.pay_amount < 0 {
      return Err(Error::Validation("pay amount must not be negative".into()));
    }
    if self.pay_amount > MAX_AMOUNT {
      return Err(Error::Validation(format!(
        "pay amount must not exceed {MAX_AMOUNT}"
      )));
    }
    Ok(())
  }
}
