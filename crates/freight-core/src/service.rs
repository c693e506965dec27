//! The `FreightService` trait: the operations exposed to callers.
//!
//! The HTTP layer (`freight-api`) depends on this abstraction rather than on
//! a concrete engine, the same way backends sit behind
//! [`MarketStore`](crate::store::MarketStore).

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  application::{Application, Applied, ApplyRequest, Formation, Withdrawn},
  contract::{
    ContractQuery, ContractView, NewParticipant, Page, Participant,
    ParticipantChange, ParticipantEvent,
  },
  job::{Job, NewJob},
  settlement::Completion,
};

pub trait FreightService: Send + Sync {
  // ── Jobs ──────────────────────────────────────────────────────────────

  fn create_job(
    &self,
    input: NewJob,
  ) -> impl Future<Output = Result<Job>> + Send + '_;

  /// Post a slice of `parent_job_id` as a new job owned by `reposter_id`.
  fn reshare_job(
    &self,
    parent_job_id: Uuid,
    reposter_id: Uuid,
    input: NewJob,
  ) -> impl Future<Output = Result<Job>> + Send + '_;

  fn get_job(&self, job_id: Uuid) -> impl Future<Output = Result<Job>> + Send + '_;

  // ── Formation ─────────────────────────────────────────────────────────

  fn apply_for_job(
    &self,
    request: ApplyRequest,
  ) -> impl Future<Output = Result<Applied>> + Send + '_;

  fn accept_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
  ) -> impl Future<Output = Result<Formation>> + Send + '_;

  fn reject_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
  ) -> impl Future<Output = Result<Application>> + Send + '_;

  fn withdraw_application(
    &self,
    application_id: Uuid,
    applicant_id: Uuid,
  ) -> impl Future<Output = Result<Withdrawn>> + Send + '_;

  // ── Contracts ─────────────────────────────────────────────────────────

  fn get_contract(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<ContractView>> + Send + '_;

  fn complete_contract(
    &self,
    contract_id: Uuid,
    requesting_user_id: Uuid,
  ) -> impl Future<Output = Result<Completion>> + Send + '_;

  fn list_contracts(
    &self,
    viewer_id: Uuid,
    query: ContractQuery,
  ) -> impl Future<Output = Result<Page<ContractView>>> + Send + '_;

  // ── Participants ──────────────────────────────────────────────────────

  fn add_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    input: NewParticipant,
  ) -> impl Future<Output = Result<Participant>> + Send + '_;

  fn update_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    user_id: Uuid,
    change: ParticipantChange,
  ) -> impl Future<Output = Result<Participant>> + Send + '_;

  fn participant_history(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ParticipantEvent>>> + Send + '_;
}
