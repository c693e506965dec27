//! Job rows.

use chrono::Utc;
use freight_core::job::{Job, JobStatus, NewJob};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_dt, encode_uuid},
};

pub fn insert_job(conn: &Connection, input: NewJob) -> Result<Job> {
  let now = Utc::now();
  let job = Job {
    job_id:          Uuid::new_v4(),
    posted_by:       input.posted_by,
    title:           input.title,
    pay_amount:      input.pay_amount,
    billing_cycle:   input.billing_cycle,
    assignment_type: input.assignment_type,
    status:          input.status,
    parent_job_id:   input.parent_job_id,
    created_at:      now,
    updated_at:      now,
  };
  conn.execute(
    "INSERT INTO jobs
       (job_id, posted_by, title, pay_amount, billing_cycle, assignment_type,
        status, parent_job_id, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(job.job_id),
      encode_uuid(job.posted_by),
      job.title,
      job.pay_amount,
      job.billing_cycle.as_ref(),
      job.assignment_type.as_ref(),
      job.status.as_ref(),
      job.parent_job_id.map(encode_uuid),
      encode_dt(job.created_at),
      encode_dt(job.updated_at),
    ],
  )?;
  Ok(job)
}

pub fn set_job_status(conn: &Connection, mut job: Job, status: JobStatus) -> Result<Job> {
  job.status = status;
  job.updated_at = Utc::now();
  conn.execute(
    "UPDATE jobs SET status = ?2, updated_at = ?3 WHERE job_id = ?1",
    params![encode_uuid(job.job_id), status.as_ref(), encode_dt(job.updated_at)],
  )?;
  Ok(job)
}
