//! Contract formation: apply, accept, reject and withdraw.
//!
//! Each operation runs in one `BEGIN IMMEDIATE` transaction. SQLite admits a
//! single writer at a time, so taking the write lock up front is what makes
//! the job re-read below authoritative: no other formation can interleave
//! between the status check and the job's transition to `assigned`. Any error
//! drops the transaction, which rolls it back.

use chrono::Utc;
use freight_core::{
  Error as CoreError,
  application::{
    Application, ApplicationStatus, Applied, ApplyRequest, Formation,
    agreed_amount, requires_manual_review,
  },
  commission::Charge,
  contract::{
    Contract, Participant, ParticipantAction, ParticipantEvent,
    ParticipantStatus, ROLE_DRIVER, ROLE_HIRER, SubContract,
  },
  job::{Job, JobStatus},
  store::FormationPolicy,
};
use rusqlite::{Connection, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_dt, encode_uuid},
  jobs::set_job_status,
  participants::{insert_participant, record_event},
  queries,
};

// ─── Operations ──────────────────────────────────────────────────────────────

pub fn apply(
  conn: &mut Connection,
  request: ApplyRequest,
  policy: &FormationPolicy,
) -> Result<Applied> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let job = active_job(&tx, request.job_id)?;
  if queries::live_application(&tx, job.job_id, request.applicant_id)?.is_some() {
    return Err(
      CoreError::DuplicateApplication {
        job_id:       job.job_id,
        applicant_id: request.applicant_id,
      }
      .into(),
    );
  }

  let now = Utc::now();
  let application = Application {
    application_id: Uuid::new_v4(),
    job_id:         job.job_id,
    applicant_id:   request.applicant_id,
    status:         ApplicationStatus::Pending,
    proposed_rate:  request.proposed_rate,
    cover_letter:   request.cover_letter,
    notes:          request.notes,
    created_at:     now,
    updated_at:     now,
  };
  insert_application(&tx, &application)?;

  if requires_manual_review(&job, application.proposed_rate) {
    tx.commit()?;
    return Ok(Applied::Pending { application });
  }

  let formation = form_contract(&tx, job, application, policy)?;
  tx.commit()?;
  Ok(Applied::Contracted(formation))
}

pub fn accept(
  conn: &mut Connection,
  application_id: Uuid,
  poster_id: Uuid,
  policy: &FormationPolicy,
) -> Result<Formation> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let (job, application) = poster_view(&tx, application_id, poster_id)?;
  if application.status != ApplicationStatus::Pending {
    return Err(
      CoreError::ApplicationNotPending { application_id, status: application.status }
        .into(),
    );
  }
  if job.status != JobStatus::Active {
    return Err(CoreError::JobNotActive { job_id: job.job_id, status: job.status }.into());
  }

  let formation = form_contract(&tx, job, application, policy)?;
  tx.commit()?;
  Ok(formation)
}

pub fn reject(
  conn: &mut Connection,
  application_id: Uuid,
  poster_id: Uuid,
) -> Result<Application> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let (job, application) = poster_view(&tx, application_id, poster_id)?;
  if job.status != JobStatus::Active {
    return Err(CoreError::JobNotActive { job_id: job.job_id, status: job.status }.into());
  }
  if application.status != ApplicationStatus::Pending {
    return Err(
      CoreError::ApplicationNotPending { application_id, status: application.status }
        .into(),
    );
  }

  let rejected = set_application_status(&tx, application, ApplicationStatus::Rejected)?;
  tx.commit()?;
  Ok(rejected)
}

pub fn withdraw(
  conn: &mut Connection,
  application_id: Uuid,
  applicant_id: Uuid,
) -> Result<Application> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let application = queries::application(&tx, application_id)?
    .ok_or(CoreError::ApplicationNotFound(application_id))?;
  if application.applicant_id != applicant_id {
    return Err(
      CoreError::Forbidden("only the applicant may withdraw an application".into())
        .into(),
    );
  }
  if application.status != ApplicationStatus::Pending {
    return Err(
      CoreError::ApplicationNotPending { application_id, status: application.status }
        .into(),
    );
  }

  let withdrawn =
    set_application_status(&tx, application, ApplicationStatus::Withdrawn)?;
  tx.commit()?;
  Ok(withdrawn)
}

// ─── Steps ───────────────────────────────────────────────────────────────────

/// Re-read the job under the write lock and require it to be active.
fn active_job(conn: &Connection, job_id: Uuid) -> Result<Job> {
  let job = queries::job(conn, job_id)?.ok_or(CoreError::JobNotFound(job_id))?;
  if job.status != JobStatus::Active {
    return Err(CoreError::JobNotActive { job_id, status: job.status }.into());
  }
  Ok(job)
}

/// Load an application and its job, requiring `poster_id` to own the job.
fn poster_view(
  conn: &Connection,
  application_id: Uuid,
  poster_id: Uuid,
) -> Result<(Job, Application)> {
  let application = queries::application(conn, application_id)?
    .ok_or(CoreError::ApplicationNotFound(application_id))?;
  let job = queries::job(conn, application.job_id)?
    .ok_or(CoreError::JobNotFound(application.job_id))?;
  if job.posted_by != poster_id {
    return Err(
      CoreError::Forbidden("only the job poster may decide its applications".into())
        .into(),
    );
  }
  Ok((job, application))
}

/// Write the contract (and subcontract link) for an application the job is
/// about to be assigned to. The caller holds the write lock and has checked
/// that the job is active.
fn form_contract(
  conn: &Connection,
  job: Job,
  application: Application,
  policy: &FormationPolicy,
) -> Result<Formation> {
  if queries::live_contract_for_job(conn, job.job_id)?.is_some() {
    return Err(CoreError::ContractExists(job.job_id).into());
  }

  let amount = agreed_amount(&job, &application);
  let charge = Charge::compute(policy.commission.as_ref(), amount);

  // Resharing is opportunistic: without a live parent contract the new
  // contract is a root.
  let parent = match job.parent_job_id {
    Some(parent_job_id) => queries::live_contract_for_job(conn, parent_job_id)?
      .filter(|c| c.status.can_parent()),
    None => None,
  };

  let contract = Contract::for_application(
    &job,
    &application,
    amount,
    parent.as_ref().map(|p| p.contract_id),
    &charge,
  );
  insert_contract(conn, &contract)?;

  let sub_contract = match &parent {
    Some(parent) => {
      let ancestry = queries::contract_ancestry(conn, parent.contract_id, policy.hop_limit)?;
      let link = SubContract::link(ancestry.root(), parent, &contract, &charge);
      insert_sub_contract(conn, &link)?;
      Some(link)
    }
    None => None,
  };

  let application = set_application_status(conn, application, ApplicationStatus::Accepted)?;

  for (user_id, role) in [
    (contract.hired_by_user_id, ROLE_HIRER),
    (contract.hired_user_id, ROLE_DRIVER),
  ] {
    let participant =
      Participant::new(contract.contract_id, user_id, role, ParticipantStatus::Active);
    insert_participant(conn, &participant)?;
    record_event(
      conn,
      &ParticipantEvent::new(ParticipantAction::Added, job.posted_by, None, Some(participant)),
    )?;
  }

  let job = set_job_status(conn, job, JobStatus::Assigned)?;

  tracing::debug!(
    contract_id = %contract.contract_id,
    job_id = %job.job_id,
    amount,
    commission = ?charge.commission_type,
    "contract written"
  );
  Ok(Formation { application, contract, job, sub_contract })
}

// ─── Rows ────────────────────────────────────────────────────────────────────

fn insert_application(conn: &Connection, a: &Application) -> Result<()> {
  conn.execute(
    "INSERT INTO job_applications
       (application_id, job_id, applicant_id, status, proposed_rate,
        cover_letter, notes, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(a.application_id),
      encode_uuid(a.job_id),
      encode_uuid(a.applicant_id),
      a.status.as_ref(),
      a.proposed_rate,
      a.cover_letter,
      a.notes,
      encode_dt(a.created_at),
      encode_dt(a.updated_at),
    ],
  )?;
  Ok(())
}

pub(crate) fn set_application_status(
  conn: &Connection,
  mut application: Application,
  status: ApplicationStatus,
) -> Result<Application> {
  application.status = status;
  application.updated_at = Utc::now();
  conn.execute(
    "UPDATE job_applications SET status = ?2, updated_at = ?3
     WHERE application_id = ?1",
    params![
      encode_uuid(application.application_id),
      status.as_ref(),
      encode_dt(application.updated_at),
    ],
  )?;
  Ok(application)
}

fn insert_contract(conn: &Connection, c: &Contract) -> Result<()> {
  conn.execute(
    "INSERT INTO contracts
       (contract_id, job_id, application_id, hired_by_user_id, hired_user_id,
        amount, status, billing_cycle, parent_contract_id, commission_type,
        platform_commission_percent, platform_commission_amount,
        created_at, updated_at, completed_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    params![
      encode_uuid(c.contract_id),
      encode_uuid(c.job_id),
      encode_uuid(c.application_id),
      encode_uuid(c.hired_by_user_id),
      encode_uuid(c.hired_user_id),
      c.amount,
      c.status.as_ref(),
      c.billing_cycle.as_ref(),
      c.parent_contract_id.map(encode_uuid),
      c.commission_type.as_ref(),
      c.platform_commission_percent,
      c.platform_commission_amount,
      encode_dt(c.created_at),
      encode_dt(c.updated_at),
      c.completed_at.map(encode_dt),
    ],
  )?;
  Ok(())
}

fn insert_sub_contract(conn: &Connection, s: &SubContract) -> Result<()> {
  conn.execute(
    "INSERT INTO sub_contracts
       (id, root_contract_id, parent_contract_id, sub_contract_id,
        reshared_job_id, split_percentage, split_amount, commission_type,
        platform_commission_percent, platform_commission_amount, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      encode_uuid(s.id),
      encode_uuid(s.root_contract_id),
      encode_uuid(s.parent_contract_id),
      encode_uuid(s.sub_contract_id),
      encode_uuid(s.reshared_job_id),
      s.split_percentage,
      s.split_amount,
      s.commission_type.as_ref(),
      s.platform_commission_percent,
      s.platform_commission_amount,
      encode_dt(s.created_at),
    ],
  )?;
  Ok(())
}
