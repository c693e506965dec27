//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that they sort
//! lexically. Enums are stored as their snake_case names. UUIDs are stored as
//! hyphenated lowercase strings. Money is stored as integer minor units.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use freight_core::{
  application::Application,
  contract::{Contract, Participant, ParticipantEvent, SubContract},
  job::Job,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// Parse a snake_case enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, value: String) -> Result<T> {
  value
    .parse()
    .map_err(|_| Error::UnknownValue { column, value })
}

pub fn encode_uuid_list(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_uuid_list(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

pub fn encode_snapshot(p: Option<&Participant>) -> Result<Option<String>> {
  p.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_snapshot(s: Option<String>) -> Result<Option<Participant>> {
  s.as_deref()
    .map(serde_json::from_str)
    .transpose()
    .map_err(Error::from)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const JOB_COLUMNS: &str = "job_id, posted_by, title, pay_amount, billing_cycle, \
   assignment_type, status, parent_job_id, created_at, updated_at";

/// Raw values read directly from a `jobs` row.
pub struct RawJob {
  pub job_id:          String,
  pub posted_by:       String,
  pub title:           String,
  pub pay_amount:      i64,
  pub billing_cycle:   String,
  pub assignment_type: String,
  pub status:          String,
  pub parent_job_id:   Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawJob {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:          row.get(0)?,
      posted_by:       row.get(1)?,
      title:           row.get(2)?,
      pay_amount:      row.get(3)?,
      billing_cycle:   row.get(4)?,
      assignment_type: row.get(5)?,
      status:          row.get(6)?,
      parent_job_id:   row.get(7)?,
      created_at:      row.get(8)?,
      updated_at:      row.get(9)?,
    })
  }

  pub fn into_job(self) -> Result<Job> {
    Ok(Job {
      job_id:          decode_uuid(&self.job_id)?,
      posted_by:       decode_uuid(&self.posted_by)?,
      title:           self.title,
      pay_amount:      self.pay_amount,
      billing_cycle:   decode_enum("billing_cycle", self.billing_cycle)?,
      assignment_type: decode_enum("assignment_type", self.assignment_type)?,
      status:          decode_enum("jobs.status", self.status)?,
      parent_job_id:   decode_opt_uuid(self.parent_job_id)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const APPLICATION_COLUMNS: &str = "application_id, job_id, applicant_id, \
   status, proposed_rate, cover_letter, notes, created_at, updated_at";

/// Raw values read directly from a `job_applications` row.
pub struct RawApplication {
  pub application_id: String,
  pub job_id:         String,
  pub applicant_id:   String,
  pub status:         String,
  pub proposed_rate:  Option<i64>,
  pub cover_letter:   Option<String>,
  pub notes:          Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawApplication {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      job_id:         row.get(1)?,
      applicant_id:   row.get(2)?,
      status:         row.get(3)?,
      proposed_rate:  row.get(4)?,
      cover_letter:   row.get(5)?,
      notes:          row.get(6)?,
      created_at:     row.get(7)?,
      updated_at:     row.get(8)?,
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id: decode_uuid(&self.application_id)?,
      job_id:         decode_uuid(&self.job_id)?,
      applicant_id:   decode_uuid(&self.applicant_id)?,
      status:         decode_enum("job_applications.status", self.status)?,
      proposed_rate:  self.proposed_rate,
      cover_letter:   self.cover_letter,
      notes:          self.notes,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const CONTRACT_COLUMNS: &str = "contract_id, job_id, application_id, \
   hired_by_user_id, hired_user_id, amount, status, billing_cycle, \
   parent_contract_id, commission_type, platform_commission_percent, \
   platform_commission_amount, created_at, updated_at, completed_at";

/// Raw values read directly from a `contracts` row.
pub struct RawContract {
  pub contract_id:                 String,
  pub job_id:                      String,
  pub application_id:              String,
  pub hired_by_user_id:            String,
  pub hired_user_id:               String,
  pub amount:                      i64,
  pub status:                      String,
  pub billing_cycle:               String,
  pub parent_contract_id:          Option<String>,
  pub commission_type:             String,
  pub platform_commission_percent: f64,
  pub platform_commission_amount:  Option<i64>,
  pub created_at:                  String,
  pub updated_at:                  String,
  pub completed_at:                Option<String>,
}

impl RawContract {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contract_id:                 row.get(0)?,
      job_id:                      row.get(1)?,
      application_id:              row.get(2)?,
      hired_by_user_id:            row.get(3)?,
      hired_user_id:               row.get(4)?,
      amount:                      row.get(5)?,
      status:                      row.get(6)?,
      billing_cycle:               row.get(7)?,
      parent_contract_id:          row.get(8)?,
      commission_type:             row.get(9)?,
      platform_commission_percent: row.get(10)?,
      platform_commission_amount:  row.get(11)?,
      created_at:                  row.get(12)?,
      updated_at:                  row.get(13)?,
      completed_at:                row.get(14)?,
    })
  }

  pub fn into_contract(self) -> Result<Contract> {
    Ok(Contract {
      contract_id:                 decode_uuid(&self.contract_id)?,
      job_id:                      decode_uuid(&self.job_id)?,
      application_id:              decode_uuid(&self.application_id)?,
      hired_by_user_id:            decode_uuid(&self.hired_by_user_id)?,
      hired_user_id:               decode_uuid(&self.hired_user_id)?,
      amount:                      self.amount,
      status:                      decode_enum("contracts.status", self.status)?,
      billing_cycle:               decode_enum("billing_cycle", self.billing_cycle)?,
      parent_contract_id:          decode_opt_uuid(self.parent_contract_id)?,
      commission_type:             decode_enum("commission_type", self.commission_type)?,
      platform_commission_percent: self.platform_commission_percent,
      platform_commission_amount:  self.platform_commission_amount,
      created_at:                  decode_dt(&self.created_at)?,
      updated_at:                  decode_dt(&self.updated_at)?,
      completed_at:                decode_opt_dt(self.completed_at)?,
    })
  }
}

pub const PARTICIPANT_COLUMNS: &str =
  "contract_id, user_id, role, status, joined_at, updated_at";

/// Raw values read directly from a `contract_participants` row.
pub struct RawParticipant {
  pub contract_id: String,
  pub user_id:     String,
  pub role:        String,
  pub status:      String,
  pub joined_at:   String,
  pub updated_at:  String,
}

impl RawParticipant {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contract_id: row.get(0)?,
      user_id:     row.get(1)?,
      role:        row.get(2)?,
      status:      row.get(3)?,
      joined_at:   row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      contract_id: decode_uuid(&self.contract_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      role:        self.role,
      status:      decode_enum("contract_participants.status", self.status)?,
      joined_at:   decode_dt(&self.joined_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const HISTORY_COLUMNS: &str = "event_id, contract_id, user_id, action, \
   before_json, after_json, actor_id, recorded_at";

/// Raw values read directly from a `participant_history` row.
pub struct RawParticipantEvent {
  pub event_id:    String,
  pub contract_id: String,
  pub user_id:     String,
  pub action:      String,
  pub before_json: Option<String>,
  pub after_json:  Option<String>,
  pub actor_id:    String,
  pub recorded_at: String,
}

impl RawParticipantEvent {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      contract_id: row.get(1)?,
      user_id:     row.get(2)?,
      action:      row.get(3)?,
      before_json: row.get(4)?,
      after_json:  row.get(5)?,
      actor_id:    row.get(6)?,
      recorded_at: row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<ParticipantEvent> {
    Ok(ParticipantEvent {
      event_id:    decode_uuid(&self.event_id)?,
      contract_id: decode_uuid(&self.contract_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      action:      decode_enum("participant_history.action", self.action)?,
      before:      decode_snapshot(self.before_json)?,
      after:       decode_snapshot(self.after_json)?,
      actor_id:    decode_uuid(&self.actor_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

pub const SUB_CONTRACT_COLUMNS: &str = "id, root_contract_id, \
   parent_contract_id, sub_contract_id, reshared_job_id, split_percentage, \
   split_amount, commission_type, platform_commission_percent, \
   platform_commission_amount, created_at";

/// Raw values read directly from a `sub_contracts` row.
pub struct RawSubContract {
  pub id:                          String,
  pub root_contract_id:            String,
  pub parent_contract_id:          String,
  pub sub_contract_id:             String,
  pub reshared_job_id:             String,
  pub split_percentage:            f64,
  pub split_amount:                i64,
  pub commission_type:             String,
  pub platform_commission_percent: f64,
  pub platform_commission_amount:  i64,
  pub created_at:                  String,
}

impl RawSubContract {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                          row.get(0)?,
      root_contract_id:            row.get(1)?,
      parent_contract_id:          row.get(2)?,
      sub_contract_id:             row.get(3)?,
      reshared_job_id:             row.get(4)?,
      split_percentage:            row.get(5)?,
      split_amount:                row.get(6)?,
      commission_type:             row.get(7)?,
      platform_commission_percent: row.get(8)?,
      platform_commission_amount:  row.get(9)?,
      created_at:                  row.get(10)?,
    })
  }

  pub fn into_sub_contract(self) -> Result<SubContract> {
    Ok(SubContract {
      id:                          decode_uuid(&self.id)?,
      root_contract_id:            decode_uuid(&self.root_contract_id)?,
      parent_contract_id:          decode_uuid(&self.parent_contract_id)?,
      sub_contract_id:             decode_uuid(&self.sub_contract_id)?,
      reshared_job_id:             decode_uuid(&self.reshared_job_id)?,
      split_percentage:            self.split_percentage,
      split_amount:                self.split_amount,
      commission_type:             decode_enum("commission_type", self.commission_type)?,
      platform_commission_percent: self.platform_commission_percent,
      platform_commission_amount:  self.platform_commission_amount,
      created_at:                  decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use freight_core::job::JobStatus;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let early = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    let later = early + chrono::Duration::microseconds(1500);
    let (a, b) = (encode_dt(early), encode_dt(later));
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap(), later);
  }

  #[test]
  fn unknown_enum_value_is_reported() {
    let err = decode_enum::<JobStatus>("jobs.status", "open".into()).unwrap_err();
    assert!(matches!(err, Error::UnknownValue { column: "jobs.status", .. }));
  }
}
