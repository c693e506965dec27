//! The `MarketStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `freight-store-sqlite`).
//! The transactional operations (`apply_for_job`, `accept_application`,
//! `complete_contract`, …) must run atomically: every error rolls the whole
//! operation back and nothing is partially committed.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  application::{Application, Applied, ApplyRequest, Formation},
  commission::RoleCommission,
  contract::{
    Contract, ContractQuery, ContractView, NewParticipant, Page, Participant,
    ParticipantChange, ParticipantEvent,
  },
  hierarchy::{Ancestry, DEFAULT_HOP_LIMIT},
  job::{Job, NewJob},
  settlement::Completion,
};

// ─── Supporting types ────────────────────────────────────────────────────────

/// Policy inputs resolved before a formation transaction begins.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationPolicy {
  /// Commission rate for the hired user's role and the job's billing cycle.
  pub commission: Option<RoleCommission>,
  /// Bound on the parent-contract walk.
  pub hop_limit:  usize,
}

impl Default for FormationPolicy {
  fn default() -> Self {
    Self { commission: None, hop_limit: DEFAULT_HOP_LIMIT }
  }
}

/// Outcome of a hierarchy maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
  /// Jobs whose `parent_job_id` was cleared to break a cycle.
  pub severed_jobs:      Vec<Uuid>,
  /// Contracts whose `parent_contract_id` was cleared to break a cycle.
  pub severed_contracts: Vec<Uuid>,
}

impl RepairReport {
  pub fn is_clean(&self) -> bool {
    self.severed_jobs.is_empty() && self.severed_contracts.is_empty()
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a freight marketplace store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MarketStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Jobs ──────────────────────────────────────────────────────────────

  fn insert_job(
    &self,
    input: NewJob,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  fn get_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<Option<Job>, Self::Error>> + Send + '_;

  /// Walk `parent_job_id` links upward from `job_id`.
  fn job_ancestry(
    &self,
    job_id: Uuid,
    hop_limit: usize,
  ) -> impl Future<Output = Result<Ancestry, Self::Error>> + Send + '_;

  /// The live (pending, active or on-hold) contract on a job, if any.
  fn live_contract_for_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<Option<Contract>, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  fn get_application(
    &self,
    application_id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// Record an application under the job lock and, when the job allows it,
  /// form the contract in the same transaction.
  fn apply_for_job(
    &self,
    request: ApplyRequest,
    policy: FormationPolicy,
  ) -> impl Future<Output = Result<Applied, Self::Error>> + Send + '_;

  /// Form the contract for a pending application the poster accepted.
  fn accept_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
    policy: FormationPolicy,
  ) -> impl Future<Output = Result<Formation, Self::Error>> + Send + '_;

  fn reject_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  fn withdraw_application(
    &self,
    application_id: Uuid,
    applicant_id: Uuid,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  // ── Contracts ─────────────────────────────────────────────────────────

  fn get_contract(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Option<ContractView>, Self::Error>> + Send + '_;

  /// Complete a root contract and settle its subcontract tree.
  fn complete_contract(
    &self,
    contract_id: Uuid,
    requesting_user_id: Uuid,
    hop_limit: usize,
  ) -> impl Future<Output = Result<Completion, Self::Error>> + Send + '_;

  fn list_contracts<'a>(
    &'a self,
    viewer_id: Uuid,
    query: &'a ContractQuery,
  ) -> impl Future<Output = Result<Page<ContractView>, Self::Error>> + Send + 'a;

  // ── Participants ──────────────────────────────────────────────────────

  fn add_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    input: NewParticipant,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + '_;

  fn update_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    user_id: Uuid,
    change: ParticipantChange,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + '_;

  /// Append-only history, oldest first.
  fn participant_history(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ParticipantEvent>, Self::Error>> + Send + '_;

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Detect cycles in job and contract parent links and sever them.
  fn repair_hierarchy(
    &self,
  ) -> impl Future<Output = Result<RepairReport, Self::Error>> + Send + '_;
}
