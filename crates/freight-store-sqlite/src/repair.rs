//! Maintenance pass that severs cycles in parent links.

use std::collections::HashMap;

use chrono::Utc;
use freight_core::{hierarchy::cycle_breaks, store::RepairReport};
use rusqlite::{Connection, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{decode_opt_uuid, decode_uuid, encode_dt, encode_uuid},
};

pub fn repair(conn: &mut Connection) -> Result<RepairReport> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let now = encode_dt(Utc::now());

  let severed_jobs = cycle_breaks(&links(&tx, "SELECT job_id, parent_job_id FROM jobs")?);
  for job_id in &severed_jobs {
    tracing::warn!(%job_id, "severing parent_job_id to break a cycle");
    tx.execute(
      "UPDATE jobs SET parent_job_id = NULL, updated_at = ?2 WHERE job_id = ?1",
      params![encode_uuid(*job_id), now],
    )?;
  }

  let severed_contracts = cycle_breaks(&links(
    &tx,
    "SELECT contract_id, parent_contract_id FROM contracts",
  )?);
  for contract_id in &severed_contracts {
    tracing::warn!(%contract_id, "severing parent_contract_id to break a cycle");
    let id = encode_uuid(*contract_id);
    tx.execute(
      "UPDATE contracts SET parent_contract_id = NULL, updated_at = ?2
       WHERE contract_id = ?1",
      params![id, now],
    )?;
    // A contract without a parent has no subcontract row.
    tx.execute("DELETE FROM sub_contracts WHERE sub_contract_id = ?1", params![id])?;
  }

  tx.commit()?;
  Ok(RepairReport { severed_jobs, severed_contracts })
}

/// Load `(id, parent)` pairs with `sql`.
fn links(conn: &Connection, sql: &str) -> Result<HashMap<Uuid, Option<Uuid>>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows
    .into_iter()
    .map(|(id, parent)| Ok((decode_uuid(&id)?, decode_opt_uuid(parent)?)))
    .collect()
}
