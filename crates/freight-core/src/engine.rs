//! The contract formation and completion engine.
//!
//! [`Engine`] validates requests at the boundary, resolves commission policy,
//! hands the atomic ledger work to a [`MarketStore`], and only after that
//! work has committed runs the best-effort side effects (conversation
//! bootstrap, event emission). Side-effect failures are logged, never
//! propagated.

use uuid::Uuid;

use crate::{
  Error, Result,
  application::{Application, Applied, ApplyRequest, Formation, Withdrawn},
  collab::{ConversationRequest, ConversationService, DomainEvent, Notifier},
  commission::{CommissionPolicy, CommissionResolver, RoleDirectory},
  contract::{
    ContractQuery, ContractView, NewParticipant, Page, Participant,
    ParticipantChange, ParticipantEvent,
  },
  hierarchy::DEFAULT_HOP_LIMIT,
  job::{BillingCycle, Job, JobStatus, NewJob},
  service::FreightService,
  settlement::Completion,
  store::{FormationPolicy, MarketStore},
};

/// Tunables for [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Bound on every parent/child walk.
  pub hop_limit:                 usize,
  /// Prepended to the job title when naming a contract's conversation.
  pub conversation_title_prefix: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      hop_limit:                 DEFAULT_HOP_LIMIT,
      conversation_title_prefix: "Contract: ".to_owned(),
    }
  }
}

pub struct Engine<S, P, C, N> {
  store:         S,
  commissions:   CommissionResolver<P>,
  conversations: C,
  notifier:      N,
  config:        EngineConfig,
}

fn lift<T, E: Into<Error>>(result: std::result::Result<T, E>) -> Result<T> {
  result.map_err(Into::into)
}

fn require_id(id: Uuid, what: &str) -> Result<()> {
  if id.is_nil() {
    return Err(Error::Validation(format!("{what} id is required")));
  }
  Ok(())
}

impl<S, P, C, N> Engine<S, P, C, N>
where
  S: MarketStore,
  P: RoleDirectory + CommissionPolicy,
  C: ConversationService,
  N: Notifier,
{
  pub fn new(
    store: S,
    policy: P,
    conversations: C,
    notifier: N,
    config: EngineConfig,
  ) -> Self {
    Self {
      store,
      commissions: CommissionResolver::new(policy),
      conversations,
      notifier,
      config,
    }
  }

  async fn load_job(&self, job_id: Uuid) -> Result<Job> {
    lift(self.store.get_job(job_id).await)?.ok_or(Error::JobNotFound(job_id))
  }

  async fn policy_for(
    &self,
    hired_user_id: Uuid,
    billing_cycle: BillingCycle,
  ) -> Result<FormationPolicy> {
    Ok(FormationPolicy {
      commission: self.commissions.resolve(hired_user_id, billing_cycle).await?,
      hop_limit:  self.config.hop_limit,
    })
  }

  /// Post-commit side effects of a successful formation.
  async fn after_formation(&self, formation: &Formation) {
    let Formation { job, contract, application, .. } = formation;

    let request = ConversationRequest {
      job_id:         job.job_id,
      title:          format!("{}{}", self.config.conversation_title_prefix, job.title),
      participants:   vec![contract.hired_by_user_id, contract.hired_user_id],
      system_message: Some(format!(
        "Contract {} formed for {} on job \"{}\".",
        contract.contract_id, contract.amount, job.title
      )),
    };
    match self.conversations.create_or_get(request).await {
      Ok(conversation) => tracing::debug!(
        conversation_id = %conversation.conversation_id,
        job_id = %job.job_id,
        "conversation ready"
      ),
      Err(e) => tracing::warn!(
        error = %e,
        job_id = %job.job_id,
        contract_id = %contract.contract_id,
        "conversation bootstrap failed; contract stands"
      ),
    }

    self.notifier.emit(DomainEvent::JobAssigned {
      job_id:            job.job_id,
      contract_id:       contract.contract_id,
      driver_id:         contract.hired_user_id,
      applicant_user_id: application.applicant_id,
    });
  }
}

impl<S, P, C, N> FreightService for Engine<S, P, C, N>
where
  S: MarketStore,
  P: RoleDirectory + CommissionPolicy,
  C: ConversationService,
  N: Notifier,
{
  // ── Jobs ──────────────────────────────────────────────────────────────────

  async fn create_job(&self, input: NewJob) -> Result<Job> {
    require_id(input.posted_by, "poster")?;
    input.validate()?;
    if input.parent_job_id.is_some() {
      return Err(Error::Validation(
        "reshared jobs must be created through the reshare operation".into(),
      ));
    }
    let job = lift(self.store.insert_job(input).await)?;
    tracing::info!(job_id = %job.job_id, "job created");
    Ok(job)
  }

  async fn reshare_job(
    &self,
    parent_job_id: Uuid,
    reposter_id: Uuid,
    mut input: NewJob,
  ) -> Result<Job> {
    require_id(reposter_id, "reposter")?;
    input.validate()?;
    let parent = self.load_job(parent_job_id).await?;

    let holds_contract = lift(self.store.live_contract_for_job(parent_job_id).await)?
      .is_some_and(|c| c.hired_user_id == reposter_id && c.status.can_parent());
    if !holds_contract {
      return Err(Error::Forbidden(
        "only the hired party of a live contract on a job may reshare it".into(),
      ));
    }

    let ancestry =
      lift(self.store.job_ancestry(parent_job_id, self.config.hop_limit).await)?;
    if ancestry.truncated || ancestry.depth() + 1 > self.config.hop_limit {
      return Err(Error::Validation(format!(
        "reshare chains may be at most {} levels deep",
        self.config.hop_limit
      )));
    }

    input.posted_by = reposter_id;
    input.parent_job_id = Some(parent.job_id);
    input.billing_cycle = parent.billing_cycle;
    let job = lift(self.store.insert_job(input).await)?;
    tracing::info!(job_id = %job.job_id, %parent_job_id, "job reshared");
    Ok(job)
  }

  async fn get_job(&self, job_id: Uuid) -> Result<Job> { self.load_job(job_id).await }

  // ── Formation ─────────────────────────────────────────────────────────────

  async fn apply_for_job(&self, request: ApplyRequest) -> Result<Applied> {
    request.validate()?;

    // Unlocked pre-check; the store re-validates under the job lock.
    let job = self.load_job(request.job_id).await?;
    if job.status != JobStatus::Active {
      return Err(Error::JobNotActive { job_id: job.job_id, status: job.status });
    }
    if job.posted_by == request.applicant_id {
      return Err(Error::Validation("cannot apply to your own job".into()));
    }

    let policy = self.policy_for(request.applicant_id, job.billing_cycle).await?;
    let applied = lift(self.store.apply_for_job(request, policy).await)?;

    match &applied {
      Applied::Pending { application } => tracing::info!(
        application_id = %application.application_id,
        job_id = %application.job_id,
        "application pending review"
      ),
      Applied::Contracted(formation) => {
        tracing::info!(
          contract_id = %formation.contract.contract_id,
          job_id = %formation.job.job_id,
          parent_contract_id = ?formation.contract.parent_contract_id,
          "contract formed on apply"
        );
        self.after_formation(formation).await;
      }
    }
    Ok(applied)
  }

  async fn accept_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
  ) -> Result<Formation> {
    require_id(application_id, "application")?;
    require_id(poster_id, "poster")?;

    let application = lift(self.store.get_application(application_id).await)?
      .ok_or(Error::ApplicationNotFound(application_id))?;
    let job = self.load_job(application.job_id).await?;
    if job.posted_by != poster_id {
      return Err(Error::Forbidden(
        "only the job poster may accept its applications".into(),
      ));
    }

    let policy = self.policy_for(application.applicant_id, job.billing_cycle).await?;
    let formation =
      lift(self.store.accept_application(application_id, poster_id, policy).await)?;
    tracing::info!(
      contract_id = %formation.contract.contract_id,
      job_id = %formation.job.job_id,
      "contract formed on acceptance"
    );
    self.after_formation(&formation).await;
    Ok(formation)
  }

  async fn reject_application(
    &self,
    application_id: Uuid,
    poster_id: Uuid,
  ) -> Result<Application> {
    require_id(application_id, "application")?;
    require_id(poster_id, "poster")?;
    let application =
      lift(self.store.reject_application(application_id, poster_id).await)?;
    tracing::info!(%application_id, "application rejected");
    Ok(application)
  }

  async fn withdraw_application(
    &self,
    application_id: Uuid,
    applicant_id: Uuid,
  ) -> Result<Withdrawn> {
    require_id(application_id, "application")?;
    require_id(applicant_id, "applicant")?;
    let application =
      lift(self.store.withdraw_application(application_id, applicant_id).await)?;
    tracing::info!(%application_id, "application withdrawn");
    Ok(Withdrawn { application_id: application.application_id, withdrawn: true })
  }

  // ── Contracts ─────────────────────────────────────────────────────────────

  async fn get_contract(&self, contract_id: Uuid) -> Result<ContractView> {
    require_id(contract_id, "contract")?;
    lift(self.store.get_contract(contract_id).await)?
      .ok_or(Error::ContractNotFound(contract_id))
  }

  async fn complete_contract(
    &self,
    contract_id: Uuid,
    requesting_user_id: Uuid,
  ) -> Result<Completion> {
    require_id(contract_id, "contract")?;
    require_id(requesting_user_id, "requesting user")?;

    let completion = lift(
      self
        .store
        .complete_contract(contract_id, requesting_user_id, self.config.hop_limit)
        .await,
    )?;
    tracing::info!(
      %contract_id,
      payouts = completion.payouts.len(),
      main_earning = completion.main_earning,
      "contract completed"
    );

    self.notifier.emit(DomainEvent::ContractCompleted {
      contract_id,
      job_id: completion.contract.job_id,
      main_earning: completion.main_earning,
    });
    Ok(completion)
  }

  async fn list_contracts(
    &self,
    viewer_id: Uuid,
    query: ContractQuery,
  ) -> Result<Page<ContractView>> {
    require_id(viewer_id, "viewer")?;
    lift(self.store.list_contracts(viewer_id, &query).await)
  }

  // ── Participants ──────────────────────────────────────────────────────────

  async fn add_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    input: NewParticipant,
  ) -> Result<Participant> {
    require_id(input.user_id, "participant")?;
    if input.role.trim().is_empty() {
      return Err(Error::Validation("role must not be empty".into()));
    }
    lift(self.store.add_participant(contract_id, actor_id, input).await)
  }

  async fn update_participant(
    &self,
    contract_id: Uuid,
    actor_id: Uuid,
    user_id: Uuid,
    change: ParticipantChange,
  ) -> Result<Participant> {
    change.validate()?;
    lift(
      self
        .store
        .update_participant(contract_id, actor_id, user_id, change)
        .await,
    )
  }

  async fn participant_history(
    &self,
    contract_id: Uuid,
  ) -> Result<Vec<ParticipantEvent>> {
    lift(self.store.participant_history(contract_id).await)
  }
}
