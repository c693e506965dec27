//! Contracts, their participants, and the subcontract join records that tie a
//! reshared job's contract to its ancestors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  application::Application,
  commission::{Charge, CommissionType},
  job::{BillingCycle, Job},
};

/// Participant role recorded for the party that hired.
pub const ROLE_HIRER: &str = "hirer";
/// Participant role recorded for the party that was hired.
pub const ROLE_DRIVER: &str = "driver";

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

// ─── Contract ────────────────────────────────────────────────────────────────

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
pub enum ContractStatus {
  Pending,
  Active,
  OnHold,
  Completed,
  Cancelled,
}

impl ContractStatus {
  /// A live contract blocks formation of another contract on the same job.
  pub fn is_live(self) -> bool {
    matches!(self, Self::Pending | Self::Active | Self::OnHold)
  }

  /// Whether a contract in this status can parent a reshared job's contract.
  pub fn can_parent(self) -> bool { matches!(self, Self::Active | Self::OnHold) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
  pub contract_id:                 Uuid,
  pub job_id:                      Uuid,
  pub application_id:              Uuid,
  pub hired_by_user_id:            Uuid,
  pub hired_user_id:               Uuid,
  pub amount:                      i64,
  pub status:                      ContractStatus,
  pub billing_cycle:               BillingCycle,
  pub parent_contract_id:          Option<Uuid>,
  pub commission_type:             CommissionType,
  pub platform_commission_percent: f64,
  /// Set for fixed-amount commissions; percentage commissions are computed
  /// from `amount` at settlement.
  pub platform_commission_amount:  Option<i64>,
  pub created_at:                  DateTime<Utc>,
  pub updated_at:                  DateTime<Utc>,
  pub completed_at:                Option<DateTime<Utc>>,
}

impl Contract {
  /// Build the contract for an accepted application.
  pub fn for_application(
    job: &Job,
    application: &Application,
    amount: i64,
    parent_contract_id: Option<Uuid>,
    charge: &Charge,
  ) -> Self {
    let now = Utc::now();
    Self {
      contract_id: Uuid::new_v4(),
      job_id: job.job_id,
      application_id: application.application_id,
      hired_by_user_id: job.posted_by,
      hired_user_id: application.applicant_id,
      amount,
      status: ContractStatus::Active,
      billing_cycle: job.billing_cycle,
      parent_contract_id,
      commission_type: charge.commission_type,
      platform_commission_percent: charge.percent,
      platform_commission_amount: match charge.commission_type {
        CommissionType::FixedAmount => Some(charge.amount),
        CommissionType::Percentage => None,
      },
      created_at: now,
      updated_at: now,
      completed_at: None,
    }
  }

  pub fn is_root(&self) -> bool { self.parent_contract_id.is_none() }
}

// ─── Participants ────────────────────────────────────────────────────────────

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
pub enum ParticipantStatus {
  Active,
  Removed,
  Invited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
  pub contract_id: Uuid,
  pub user_id:     Uuid,
  pub role:        String,
  pub status:      ParticipantStatus,
  pub joined_at:   DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Participant {
  pub fn new(
    contract_id: Uuid,
    user_id: Uuid,
    role: impl Into<String>,
    status: ParticipantStatus,
  ) -> Self {
    let now = Utc::now();
    Self {
      contract_id,
      user_id,
      role: role.into(),
      status,
      joined_at: now,
      updated_at: now,
    }
  }
}

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
pub enum ParticipantAction {
  Added,
  Removed,
  RoleChanged,
  StatusChanged,
}

/// One append-only entry in a contract's participant history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantEvent {
  pub event_id:    Uuid,
  pub contract_id: Uuid,
  pub user_id:     Uuid,
  pub action:      ParticipantAction,
  /// Participant snapshot before the change; `None` for additions.
  pub before:      Option<Participant>,
  pub after:       Option<Participant>,
  pub actor_id:    Uuid,
  pub recorded_at: DateTime<Utc>,
}

impl ParticipantEvent {
  pub fn new(
    action: ParticipantAction,
    actor_id: Uuid,
    before: Option<Participant>,
    after: Option<Participant>,
  ) -> Self {
    let (contract_id, user_id) = after
      .as_ref()
      .or(before.as_ref())
      .map(|p| (p.contract_id, p.user_id))
      .unwrap_or_default();
    Self {
      event_id: Uuid::new_v4(),
      contract_id,
      user_id,
      action,
      before,
      after,
      actor_id,
      recorded_at: Utc::now(),
    }
  }
}

/// Input to add a participant to an existing contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
  pub user_id: Uuid,
  pub role:    String,
  #[serde(default = "default_new_status")]
  pub status:  ParticipantStatus,
}

fn default_new_status() -> ParticipantStatus { ParticipantStatus::Invited }

/// A requested change to an existing participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantChange {
  pub role:   Option<String>,
  pub status: Option<ParticipantStatus>,
}

impl ParticipantChange {
  pub fn validate(&self) -> Result<()> {
    if self.role.is_none() && self.status.is_none() {
      return Err(Error::Validation("nothing to change".into()));
    }
    if self.role.as_deref().is_some_and(|r| r.trim().is_empty()) {
      return Err(Error::Validation("role must not be empty".into()));
    }
    Ok(())
  }

  /// Apply the change to `current`, returning the new snapshot and the
  /// history actions it implies. An empty action list means no-op.
  pub fn apply(
    &self,
    current: &Participant,
  ) -> (Participant, Vec<ParticipantAction>) {
    let mut next = current.clone();
    let mut actions = Vec::new();

    if let Some(role) = &self.role
      && *role != current.role
    {
      next.role = role.clone();
      actions.push(ParticipantAction::RoleChanged);
    }
    if let Some(status) = self.status
      && status != current.status
    {
      next.status = status;
      actions.push(if status == ParticipantStatus::Removed {
        ParticipantAction::Removed
      } else {
        ParticipantAction::StatusChanged
      });
    }
    if !actions.is_empty() {
      next.updated_at = Utc::now();
    }
    (next, actions)
  }
}

// ─── SubContract ─────────────────────────────────────────────────────────────

/// The financial join between a child contract and its ancestors. Exists iff
/// the child contract has a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubContract {
  pub id:                          Uuid,
  pub root_contract_id:            Uuid,
  pub parent_contract_id:          Uuid,
  pub sub_contract_id:             Uuid,
  pub reshared_job_id:             Uuid,
  /// Share of the parent contract's value that flows to the subcontractor.
  pub split_percentage:            f64,
  pub split_amount:                i64,
  pub commission_type:             CommissionType,
  pub platform_commission_percent: f64,
  pub platform_commission_amount:  i64,
  pub created_at:                  DateTime<Utc>,
}

impl SubContract {
  /// Link `child` under `parent`, splitting off the child's full amount.
  pub fn link(
    root_contract_id: Uuid,
    parent: &Contract,
    child: &Contract,
    charge: &Charge,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      root_contract_id,
      parent_contract_id: parent.contract_id,
      sub_contract_id: child.contract_id,
      reshared_job_id: child.job_id,
      split_percentage: split_percentage(child.amount, parent.amount),
      split_amount: child.amount,
      commission_type: charge.commission_type,
      platform_commission_percent: charge.percent,
      platform_commission_amount: charge.amount,
      created_at: Utc::now(),
    }
  }
}

/// `part` as a percentage of `whole`, to two decimal places.
fn split_percentage(part: i64, whole: i64) -> f64 {
  if whole <= 0 {
    return 100.0;
  }
  (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Filters for listing contracts visible to a viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractQuery {
  /// Restrict to contracts the viewer hired for, was hired on, or actively
  /// participates in.
  #[serde(default)]
  pub is_mine:            bool,
  pub status:             Option<ContractStatus>,
  /// Matched against the viewer's own participant row.
  pub participant_status: Option<ParticipantStatus>,
  /// Matched against the viewer's own participant row.
  pub participant_role:   Option<String>,
  /// 1-based.
  pub page:               Option<u32>,
  pub page_size:          Option<u32>,
}

impl ContractQuery {
  pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }

  pub fn page_size(&self) -> u32 {
    self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page() - 1) * u64::from(self.page_size())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:     Vec<T>,
  pub page:      u32,
  pub page_size: u32,
  pub total:     u64,
}

/// A contract bundled with the records callers usually need alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractView {
  pub contract:      Contract,
  pub job:           Job,
  pub application:   Option<Application>,
  pub participants:  Vec<Participant>,
  /// Subcontract rows where this contract is the parent or the child.
  pub sub_contracts: Vec<SubContract>,
}
