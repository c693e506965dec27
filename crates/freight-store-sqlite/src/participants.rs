//! Contract participants and their append-only history.

use freight_core::{
  Error as CoreError,
  contract::{
    Contract, NewParticipant, Participant, ParticipantAction, ParticipantChange,
    ParticipantEvent,
  },
};
use rusqlite::{Connection, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_dt, encode_snapshot, encode_uuid},
  queries,
};

pub fn add(
  conn: &mut Connection,
  contract_id: Uuid,
  actor_id: Uuid,
  input: NewParticipant,
) -> Result<Participant> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  require_hirer(&tx, contract_id, actor_id)?;
  if queries::participant(&tx, contract_id, input.user_id)?.is_some() {
    return Err(
      CoreError::ParticipantExists { contract_id, user_id: input.user_id }.into(),
    );
  }

  let participant =
    Participant::new(contract_id, input.user_id, input.role, input.status);
  insert_participant(&tx, &participant)?;
  record_event(
    &tx,
    &ParticipantEvent::new(
      ParticipantAction::Added,
      actor_id,
      None,
      Some(participant.clone()),
    ),
  )?;

  tx.commit()?;
  Ok(participant)
}

pub fn update(
  conn: &mut Connection,
  contract_id: Uuid,
  actor_id: Uuid,
  user_id: Uuid,
  change: ParticipantChange,
) -> Result<Participant> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  require_hirer(&tx, contract_id, actor_id)?;
  let current = queries::participant(&tx, contract_id, user_id)?
    .ok_or(CoreError::ParticipantNotFound { contract_id, user_id })?;

  let (next, actions) = change.apply(&current);
  if actions.is_empty() {
    return Ok(current);
  }

  tx.execute(
    "UPDATE contract_participants SET role = ?3, status = ?4, updated_at = ?5
     WHERE contract_id = ?1 AND user_id = ?2",
    params![
      encode_uuid(contract_id),
      encode_uuid(user_id),
      next.role,
      next.status.as_ref(),
      encode_dt(next.updated_at),
    ],
  )?;
  for action in actions {
    record_event(
      &tx,
      &ParticipantEvent::new(action, actor_id, Some(current.clone()), Some(next.clone())),
    )?;
  }

  tx.commit()?;
  Ok(next)
}

/// Only the party that hired may manage a contract's participants.
fn require_hirer(conn: &Connection, contract_id: Uuid, actor_id: Uuid) -> Result<Contract> {
  let contract = queries::contract(conn, contract_id)?
    .ok_or(CoreError::ContractNotFound(contract_id))?;
  if contract.hired_by_user_id != actor_id {
    return Err(
      CoreError::Forbidden("only the hirer may manage this contract's participants".into())
        .into(),
    );
  }
  Ok(contract)
}

pub(crate) fn insert_participant(conn: &Connection, p: &Participant) -> Result<()> {
  conn.execute(
    "INSERT INTO contract_participants
       (contract_id, user_id, role, status, joined_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(p.contract_id),
      encode_uuid(p.user_id),
      p.role,
      p.status.as_ref(),
      encode_dt(p.joined_at),
      encode_dt(p.updated_at),
    ],
  )?;
  Ok(())
}

pub(crate) fn record_event(conn: &Connection, e: &ParticipantEvent) -> Result<()> {
  conn.execute(
    "INSERT INTO participant_history
       (event_id, contract_id, user_id, action, before_json, after_json,
        actor_id, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(e.event_id),
      encode_uuid(e.contract_id),
      encode_uuid(e.user_id),
      e.action.as_ref(),
      encode_snapshot(e.before.as_ref())?,
      encode_snapshot(e.after.as_ref())?,
      encode_uuid(e.actor_id),
      encode_dt(e.recorded_at),
    ],
  )?;
  Ok(())
}
