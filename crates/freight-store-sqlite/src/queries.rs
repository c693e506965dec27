//! Synchronous read helpers shared by the transactional modules.
//!
//! Every function takes a plain [`Connection`]; a [`rusqlite::Transaction`]
//! derefs to one, so the same helpers serve both unlocked reads and re-reads
//! under the write lock.

use freight_core::{
  application::Application,
  contract::{
    Contract, ContractQuery, ContractView, Page, Participant, ParticipantEvent,
    SubContract,
  },
  hierarchy::{Ancestry, walk_to_root},
  job::Job,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    APPLICATION_COLUMNS, CONTRACT_COLUMNS, HISTORY_COLUMNS, JOB_COLUMNS,
    PARTICIPANT_COLUMNS, RawApplication, RawContract, RawJob,
    RawParticipant, RawParticipantEvent, RawSubContract, SUB_CONTRACT_COLUMNS,
    decode_opt_uuid, encode_uuid,
  },
};

// ─── Single rows ─────────────────────────────────────────────────────────────

pub fn job(conn: &Connection, job_id: Uuid) -> Result<Option<Job>> {
  conn
    .query_row(
      &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
      params![encode_uuid(job_id)],
      RawJob::read,
    )
    .optional()?
    .map(RawJob::into_job)
    .transpose()
}

pub fn application(
  conn: &Connection,
  application_id: Uuid,
) -> Result<Option<Application>> {
  conn
    .query_row(
      &format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE application_id = ?1"
      ),
      params![encode_uuid(application_id)],
      RawApplication::read,
    )
    .optional()?
    .map(RawApplication::into_application)
    .transpose()
}

/// The applicant's pending or accepted application on a job, if any.
pub fn live_application(
  conn: &Connection,
  job_id: Uuid,
  applicant_id: Uuid,
) -> Result<Option<Application>> {
  conn
    .query_row(
      &format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications
         WHERE job_id = ?1 AND applicant_id = ?2
           AND status IN ('pending', 'accepted')"
      ),
      params![encode_uuid(job_id), encode_uuid(applicant_id)],
      RawApplication::read,
    )
    .optional()?
    .map(RawApplication::into_application)
    .transpose()
}

pub fn contract(conn: &Connection, contract_id: Uuid) -> Result<Option<Contract>> {
  conn
    .query_row(
      &format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE contract_id = ?1"),
      params![encode_uuid(contract_id)],
      RawContract::read,
    )
    .optional()?
    .map(RawContract::into_contract)
    .transpose()
}

/// The most recent pending, active or on-hold contract on a job.
pub fn live_contract_for_job(
  conn: &Connection,
  job_id: Uuid,
) -> Result<Option<Contract>> {
  conn
    .query_row(
      &format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts
         WHERE job_id = ?1 AND status IN ('pending', 'active', 'on_hold')
         ORDER BY created_at DESC
         LIMIT 1"
      ),
      params![encode_uuid(job_id)],
      RawContract::read,
    )
    .optional()?
    .map(RawContract::into_contract)
    .transpose()
}

pub fn participant(
  conn: &Connection,
  contract_id: Uuid,
  user_id: Uuid,
) -> Result<Option<Participant>> {
  conn
    .query_row(
      &format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM contract_participants
         WHERE contract_id = ?1 AND user_id = ?2"
      ),
      params![encode_uuid(contract_id), encode_uuid(user_id)],
      RawParticipant::read,
    )
    .optional()?
    .map(RawParticipant::into_participant)
    .transpose()
}

// ─── Parent links ────────────────────────────────────────────────────────────

/// `Ok(None)` both for a root and for an id that does not exist.
pub fn parent_job_of(conn: &Connection, job_id: Uuid) -> Result<Option<Uuid>> {
  let parent: Option<Option<String>> = conn
    .query_row(
      "SELECT parent_job_id FROM jobs WHERE job_id = ?1",
      params![encode_uuid(job_id)],
      |r| r.get(0),
    )
    .optional()?;
  decode_opt_uuid(parent.flatten())
}

pub fn parent_contract_of(
  conn: &Connection,
  contract_id: Uuid,
) -> Result<Option<Uuid>> {
  let parent: Option<Option<String>> = conn
    .query_row(
      "SELECT parent_contract_id FROM contracts WHERE contract_id = ?1",
      params![encode_uuid(contract_id)],
      |r| r.get(0),
    )
    .optional()?;
  decode_opt_uuid(parent.flatten())
}

pub fn job_ancestry(
  conn: &Connection,
  job_id: Uuid,
  hop_limit: usize,
) -> Result<Ancestry> {
  walk_to_root(job_id, hop_limit, |id| parent_job_of(conn, id))
}

pub fn contract_ancestry(
  conn: &Connection,
  contract_id: Uuid,
  hop_limit: usize,
) -> Result<Ancestry> {
  walk_to_root(contract_id, hop_limit, |id| parent_contract_of(conn, id))
}

// ─── Collections ─────────────────────────────────────────────────────────────

pub fn participants(conn: &Connection, contract_id: Uuid) -> Result<Vec<Participant>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PARTICIPANT_COLUMNS} FROM contract_participants
     WHERE contract_id = ?1
     ORDER BY joined_at, user_id"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(contract_id)], RawParticipant::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawParticipant::into_participant).collect()
}

pub fn history(conn: &Connection, contract_id: Uuid) -> Result<Vec<ParticipantEvent>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {HISTORY_COLUMNS} FROM participant_history
     WHERE contract_id = ?1
     ORDER BY recorded_at, rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(contract_id)], RawParticipantEvent::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawParticipantEvent::into_event).collect()
}

/// Subcontract rows directly below `contract_id`.
pub fn children_of(conn: &Connection, contract_id: Uuid) -> Result<Vec<SubContract>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {SUB_CONTRACT_COLUMNS} FROM sub_contracts
     WHERE parent_contract_id = ?1
     ORDER BY created_at, id"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(contract_id)], RawSubContract::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSubContract::into_sub_contract).collect()
}

/// Subcontract rows where `contract_id` is the parent or the child.
pub fn sub_contracts_touching(
  conn: &Connection,
  contract_id: Uuid,
) -> Result<Vec<SubContract>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {SUB_CONTRACT_COLUMNS} FROM sub_contracts
     WHERE parent_contract_id = ?1 OR sub_contract_id = ?1
     ORDER BY created_at, id"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(contract_id)], RawSubContract::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSubContract::into_sub_contract).collect()
}

// ─── Views ───────────────────────────────────────────────────────────────────

pub fn contract_view(conn: &Connection, contract_id: Uuid) -> Result<Option<ContractView>> {
  let Some(contract) = contract(conn, contract_id)? else {
    return Ok(None);
  };
  view_of(conn, contract).map(Some)
}

fn view_of(conn: &Connection, contract: Contract) -> Result<ContractView> {
  // The foreign key guarantees the job row.
  let job = job(conn, contract.job_id)?
    .ok_or(freight_core::Error::JobNotFound(contract.job_id))?;
  let application = application(conn, contract.application_id)?;
  let participants = participants(conn, contract.contract_id)?;
  let sub_contracts = sub_contracts_touching(conn, contract.contract_id)?;
  Ok(ContractView { contract, job, application, participants, sub_contracts })
}

/// Shared `FROM`/`WHERE` for listing. The viewer's own participant row is
/// joined so the participant filters apply to the viewer.
///
/// Parameters: `?1` viewer, `?2` is_mine flag, `?3` contract status,
/// `?4` participant status, `?5` participant role.
const LIST_FILTER: &str = "
  FROM contracts c
  LEFT JOIN contract_participants p
         ON p.contract_id = c.contract_id AND p.user_id = ?1
  WHERE (?2 = 0
         OR c.hired_by_user_id = ?1
         OR c.hired_user_id = ?1
         OR p.status = 'active')
    AND (?3 IS NULL OR c.status = ?3)
    AND (?4 IS NULL OR p.status = ?4)
    AND (?5 IS NULL OR p.role = ?5)";

pub fn list_contracts(
  conn: &Connection,
  viewer_id: Uuid,
  query: &ContractQuery,
) -> Result<Page<ContractView>> {
  let viewer = encode_uuid(viewer_id);
  let status = query.status.map(|s| s.as_ref().to_owned());
  let participant_status = query.participant_status.map(|s| s.as_ref().to_owned());
  let role = query.participant_role.clone();

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) {LIST_FILTER}"),
    params![viewer, query.is_mine, status, participant_status, role],
    |r| r.get(0),
  )?;

  let ids: Vec<String> = {
    let mut stmt = conn.prepare(&format!(
      "SELECT c.contract_id {LIST_FILTER}
       ORDER BY c.created_at DESC, c.contract_id
       LIMIT ?6 OFFSET ?7"
    ))?;
    stmt
      .query_map(
        params![
          viewer,
          query.is_mine,
          status,
          participant_status,
          role,
          i64::from(query.page_size()),
          i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ],
        |r| r.get(0),
      )?
      .collect::<rusqlite::Result<_>>()?
  };

  let mut items = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(view) = contract_view(conn, crate::encode::decode_uuid(&id)?)? {
      items.push(view);
    }
  }

  Ok(Page {
    items,
    page: query.page(),
    page_size: query.page_size(),
    total: u64::try_from(total).unwrap_or_default(),
  })
}
