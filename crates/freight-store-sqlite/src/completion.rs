//! Completion of a root contract and settlement of its subcontract tree.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use freight_core::{
  Error as CoreError,
  application::ApplicationStatus,
  contract::{Contract, ContractStatus},
  hierarchy::walk_subcontracts,
  job::JobStatus,
  settlement::{Completion, Payout, settle},
};
use rusqlite::{Connection, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    decode_dt, decode_uuid, decode_uuid_list, encode_dt, encode_uuid,
    encode_uuid_list,
  },
  queries,
};

pub fn complete(
  conn: &mut Connection,
  contract_id: Uuid,
  requesting_user_id: Uuid,
  hop_limit: usize,
) -> Result<Completion> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let root = queries::contract(&tx, contract_id)?
    .ok_or(CoreError::ContractNotFound(contract_id))?;
  if !root.is_root() {
    return Err(
      CoreError::Forbidden(
        "this is a subcontract; only its root contract can be completed".into(),
      )
      .into(),
    );
  }
  if root.hired_by_user_id != requesting_user_id {
    return Err(
      CoreError::Forbidden("only the hiring party may complete this contract".into())
        .into(),
    );
  }
  if !root.status.can_parent() {
    return Err(CoreError::ContractNotActive { contract_id, status: root.status }.into());
  }

  let tree = walk_subcontracts(contract_id, hop_limit, |id| queries::children_of(&tx, id))?;
  if tree.truncated {
    tracing::warn!(%contract_id, hop_limit, "subcontract tree truncated at completion");
  }

  let mut descendants = HashMap::with_capacity(tree.edges.len());
  for edge in &tree.edges {
    match queries::contract(&tx, edge.sub_contract_id)? {
      Some(child) => {
        descendants.insert(child.contract_id, child);
      }
      None => tracing::warn!(
        sub_contract_id = %edge.sub_contract_id,
        "subcontract row names a missing contract"
      ),
    }
  }

  let settlement = settle(&root, &descendants, &tree.edges)?;

  let now = Utc::now();
  let root = mark_completed(&tx, root, now)?;
  for child in descendants.into_values().filter(|c| c.status.is_live()) {
    mark_completed(&tx, child, now)?;
  }
  for payout in &settlement.payouts {
    insert_payout(&tx, payout)?;
  }

  tx.commit()?;
  Ok(Completion {
    contract:     root,
    payouts:      settlement.payouts,
    main_earning: settlement.main_earning,
  })
}

/// Move a contract, its job and its application to their completed states.
fn mark_completed(
  conn: &Connection,
  mut contract: Contract,
  now: DateTime<Utc>,
) -> Result<Contract> {
  contract.status = ContractStatus::Completed;
  contract.updated_at = now;
  contract.completed_at = Some(now);
  let ts = encode_dt(now);

  conn.execute(
    "UPDATE contracts SET status = ?2, updated_at = ?3, completed_at = ?3
     WHERE contract_id = ?1",
    params![encode_uuid(contract.contract_id), contract.status.as_ref(), ts],
  )?;
  conn.execute(
    "UPDATE jobs SET status = ?2, updated_at = ?3 WHERE job_id = ?1",
    params![encode_uuid(contract.job_id), JobStatus::Completed.as_ref(), ts],
  )?;
  conn.execute(
    "UPDATE job_applications SET status = ?2, updated_at = ?3
     WHERE application_id = ?1 AND status = ?4",
    params![
      encode_uuid(contract.application_id),
      ApplicationStatus::Completed.as_ref(),
      ts,
      ApplicationStatus::Accepted.as_ref(),
    ],
  )?;
  Ok(contract)
}

fn insert_payout(conn: &Connection, p: &Payout) -> Result<()> {
  conn.execute(
    "INSERT INTO payouts
       (payout_id, root_contract_id, party_user_id, contract_ids, gross,
        deductions, platform_fee, net, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(p.payout_id),
      encode_uuid(p.root_contract_id),
      encode_uuid(p.party_user_id),
      encode_uuid_list(&p.contract_ids)?,
      p.gross,
      p.deductions,
      p.platform_fee,
      p.net,
      encode_dt(p.recorded_at),
    ],
  )?;
  Ok(())
}

/// Payouts recorded for a root contract, in settlement order.
pub fn payouts(conn: &Connection, root_contract_id: Uuid) -> Result<Vec<Payout>> {
  let mut stmt = conn.prepare(
    "SELECT payout_id, root_contract_id, party_user_id, contract_ids, gross,
            deductions, platform_fee, net, recorded_at
     FROM payouts WHERE root_contract_id = ?1
     ORDER BY rowid",
  )?;
  let rows = stmt
    .query_map(params![encode_uuid(root_contract_id)], |r| {
      Ok((
        r.get::<_, String>(0)?,
        r.get::<_, String>(1)?,
        r.get::<_, String>(2)?,
        r.get::<_, String>(3)?,
        r.get::<_, i64>(4)?,
        r.get::<_, i64>(5)?,
        r.get::<_, i64>(6)?,
        r.get::<_, i64>(7)?,
        r.get::<_, String>(8)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(id, root, party, ids, gross, deductions, platform_fee, net, at)| {
      Ok(Payout {
        payout_id: decode_uuid(&id)?,
        root_contract_id: decode_uuid(&root)?,
        party_user_id: decode_uuid(&party)?,
        contract_ids: decode_uuid_list(&ids)?,
        gross,
        deductions,
        platform_fee,
        net,
        recorded_at: decode_dt(&at)?,
      })
    })
    .collect()
}
