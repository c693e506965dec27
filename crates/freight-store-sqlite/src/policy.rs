//! Role assignments and the commission rate table.

use freight_core::{
  commission::{RoleCommission, UserRole},
  job::BillingCycle,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{decode_enum, encode_uuid},
};

pub fn user_role(conn: &Connection, user_id: Uuid) -> Result<Option<UserRole>> {
  Ok(
    conn
      .query_row(
        "SELECT role_id, role_name FROM user_roles WHERE user_id = ?1",
        params![encode_uuid(user_id)],
        |r| Ok(UserRole { role_id: r.get(0)?, role_name: r.get(1)? }),
      )
      .optional()?,
  )
}

pub fn commission(
  conn: &Connection,
  role_id: &str,
  billing_cycle: BillingCycle,
) -> Result<Option<RoleCommission>> {
  let row: Option<(String, f64, i64)> = conn
    .query_row(
      "SELECT commission_type, percent, fixed_amount FROM role_commissions
       WHERE role_id = ?1 AND billing_cycle = ?2",
      params![role_id, billing_cycle.as_ref()],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )
    .optional()?;

  row
    .map(|(commission_type, percent, fixed_amount)| {
      Ok(RoleCommission {
        role_id: role_id.to_owned(),
        billing_cycle,
        commission_type: decode_enum("commission_type", commission_type)?,
        percent,
        fixed_amount,
      })
    })
    .transpose()
}

pub fn assign_role(conn: &Connection, user_id: Uuid, role: &UserRole) -> Result<()> {
  conn.execute(
    "INSERT INTO user_roles (user_id, role_id, role_name) VALUES (?1, ?2, ?3)
     ON CONFLICT (user_id) DO UPDATE
       SET role_id = excluded.role_id, role_name = excluded.role_name",
    params![encode_uuid(user_id), role.role_id, role.role_name],
  )?;
  Ok(())
}

pub fn set_role_commission(conn: &Connection, rate: &RoleCommission) -> Result<()> {
  conn.execute(
    "INSERT INTO role_commissions
       (role_id, billing_cycle, commission_type, percent, fixed_amount)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (role_id, billing_cycle) DO UPDATE
       SET commission_type = excluded.commission_type,
           percent         = excluded.percent,
           fixed_amount    = excluded.fixed_amount",
    params![
      rate.role_id,
      rate.billing_cycle.as_ref(),
      rate.commission_type.as_ref(),
      rate.percent,
      rate.fixed_amount,
    ],
  )?;
  Ok(())
}
