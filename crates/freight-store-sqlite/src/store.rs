//! [`SqliteStore`], the SQLite implementation of [`MarketStore`].
//!
//! The same store also serves as the in-process policy tables
//! ([`RoleDirectory`], [`CommissionPolicy`]) and conversation backend
//! ([`ConversationService`]).

use std::{path::Path, time::Duration};

use freight_core::{
  application::{Application, Applied, ApplyRequest, Formation},
  collab::{Conversation, ConversationRequest, ConversationService},
  commission::{CommissionPolicy, RoleCommission, RoleDirectory, UserRole},
  contract::{
    Contract, ContractQuery, ContractView, NewParticipant, Page, Participant,
    ParticipantChange, ParticipantEvent,
  },
  hierarchy::Ancestry,
  job::{BillingCycle, Job, NewJob},
  settlement::{Completion, Payout},
  store::{FormationPolicy, MarketStore, RepairReport},
};
use uuid::Uuid;

use crate::{
  Result, completion, conversations, formation, jobs, participants, policy,
  queries, repair, schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// How long a write waits on another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A freight marketplace store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread.
  pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  // ── Administration ────────────────────────────────────────────────────────

  /// Give `user_id` a role, replacing any previous one.
  pub async fn assign_role(&self, user_id: Uuid, role: UserRole) -> Result<()> {
    self.run(move |conn| policy::assign_role(conn, user_id, &role)).await
  }

  /// Insert or replace the rate for `(rate.role_id, rate.billing_cycle)`.
  pub async fn set_role_commission(&self, rate: RoleCommission) -> Result<()> {
    self.run(move |conn| policy::set_role_commission(conn, &rate)).await
  }

  /// Payouts persisted by the completion of `root_contract_id`.
  pub async fn payouts(&self, root_contract_id: Uuid) -> Result<Vec<Payout>> {
    self.run(move |conn| completion::payouts(conn, root_contract_id)).await
  }

  /// Message bodies posted to a conversation, oldest first.
  pub async fn conversation_messages(
    &self,
    conversation_id: Uuid,
  ) -> Result<Vec<String>> {
    self
      .run(move |conn| conversations::messages(conn, conversation_id))
      .await
  }
}

// ─── MarketStore impl ────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  type Error = crate::Error;

  // ── Jobs ──────────────────────────────────────────────────────────────────

  async fn insert_job(&self, input: NewJob) -> Result<Job> {
    self.run(move |conn| jobs::insert_job(conn, input)).await
  }

  async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
    self.run(move |conn| queries::job(conn, job_id)).await
  }

  async fn job_ancestry(&self, job_id: Uuid, hop_limit: usize) -> Result<Ancestry> {
    self
      .run(move |conn| queries::job_ancestry(conn, job_id, hop_limit))
      .await
  }

  async fn live_contract_for_job(&self, job_id: Uuid) -> Result<Option<Contract>> {
    self
      .run(move |conn| queries::live_contract_for_job(conn, job_id))
      .await
  }

  // ── Applications ──────────────────────────────────────────────────────────

  async fn get_application(&self, application_id: Uuid) -> Result<Option<Application>> {
    self
      .run(move |conn| queries::application(conn, application_id))
      .await
  }

  async fn apply_for_job(
    &self,
    request: ApplyRequest,
    policy: FormationPolicy,
  ) -> Result<Applied> {
    self
      .run(move |conn| formation::apply(conn, request, &policy))
      .await
  }

  async fn accept_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
    policy: FormationPolicy,
  ) -> Result<Formation> {
    self
      .run(move |conn| formation::accept(conn, application_id, poster_id, &policy))
      .await
  }

  async fn reject_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
  ) -> Result<Application> {
    self
      .run(move |conn| formation::reject(conn, application_id, poster_id))
      .await
  }

  async fn withdraw_application(
    &self,
    application_id: Uuid,
    applicant_id: Uuid,
  ) -> Result<Application> {
    self
      .run(move |conn| formation::withdraw(conn, application_id, applicant_id))
      .await
  }

  // ── Contracts ─────────────────────────────────────────────────────────────

  async fn get_contract(&self, contract_id: Uuid) -> Result<Option<ContractView>> {
    self
      .run(move |conn| queries::contract_view(conn, contract_id))
      .await
  }

  async fn complete_contract(
    &self,
    contract_id: Uuid,
    requesting_user_id: Uuid,
    hop_limit: usize,
  ) -> Result<Completion> {
    self
      .run(move |conn| {
        completion::complete(conn, contract_id, requesting_user_id, hop_limit)
      })
      .await
  }

  async fn list_contracts(
    &self,
    viewer_id: Uuid,
    query: &ContractQuery,
  ) -> Result<Page<ContractView>> {
    let query = query.clone();
    self
      .run(move |conn| queries::list_contracts(conn, viewer_id, &query))
      .await
  }

  // ── Participants ──────────────────────────────────────────────────────────

  async fn add_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    input: NewParticipant,
  ) -> Result<Participant> {
    self
      .run(move |conn| participants::add(conn, contract_id, actor_id, input))
      .await
  }

  async fn update_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    user_id: Uuid,
    change: ParticipantChange,
  ) -> Result<Participant> {
    self
      .run(move |conn| {
        participants::update(conn, contract_id, actor_id, user_id, change)
      })
      .await
  }

  async fn participant_history(
    &self,
    contract_id: Uuid,
  ) -> Result<Vec<ParticipantEvent>> {
    self.run(move |conn| queries::history(conn, contract_id)).await
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn repair_hierarchy(&self) -> Result<RepairReport> {
    self.run(repair::repair).await
  }
}

// ─── Collaborator impls ──────────────────────────────────────────────────────

impl RoleDirectory for SqliteStore {
  async fn user_role(&self, user_id: Uuid) -> freight_core::Result<Option<UserRole>> {
    Ok(self.run(move |conn| policy::user_role(conn, user_id)).await?)
  }
}

impl CommissionPolicy for SqliteStore {
  async fn commission(
    &self,
    role_id: &str,
    billing_cycle: BillingCycle,
  ) -> freight_core::Result<Option<RoleCommission>> {
    let role_id = role_id.to_owned();
    Ok(
      self
        .run(move |conn| policy::commission(conn, &role_id, billing_cycle))
        .await?,
    )
  }
}

impl ConversationService for SqliteStore {
  async fn create_or_get(
    &self,
    request: ConversationRequest,
  ) -> freight_core::Result<Conversation> {
    Ok(
      self
        .run(move |conn| conversations::create_or_get(conn, request))
        .await?,
    )
  }
}
