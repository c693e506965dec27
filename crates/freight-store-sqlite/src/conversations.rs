//! Conversation rows backing the in-process `ConversationService`.

use chrono::Utc;
use freight_core::collab::{Conversation, ConversationRequest};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{decode_dt, decode_uuid, decode_uuid_list, encode_dt, encode_uuid, encode_uuid_list},
};

/// Return the job's conversation, creating it if needed. Missing participants
/// are merged in and the system message, if any, is appended.
pub fn create_or_get(
  conn: &mut Connection,
  request: ConversationRequest,
) -> Result<Conversation> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let existing: Option<(String, String, String, String)> = tx
    .query_row(
      "SELECT conversation_id, title, participants, created_at
       FROM conversations WHERE job_id = ?1",
      params![encode_uuid(request.job_id)],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )
    .optional()?;

  let conversation = match existing {
    Some((id, title, participants, created_at)) => {
      let mut conversation = Conversation {
        conversation_id: decode_uuid(&id)?,
        job_id: request.job_id,
        title,
        participants: decode_uuid_list(&participants)?,
        created_at: decode_dt(&created_at)?,
      };
      let before = conversation.participants.len();
      for user_id in &request.participants {
        if !conversation.participants.contains(user_id) {
          conversation.participants.push(*user_id);
        }
      }
      if conversation.participants.len() != before {
        tx.execute(
          "UPDATE conversations SET participants = ?2 WHERE conversation_id = ?1",
          params![id, encode_uuid_list(&conversation.participants)?],
        )?;
      }
      conversation
    }
    None => {
      let mut participants = Vec::with_capacity(request.participants.len());
      for user_id in request.participants {
        if !participants.contains(&user_id) {
          participants.push(user_id);
        }
      }
      let conversation = Conversation {
        conversation_id: Uuid::new_v4(),
        job_id: request.job_id,
        title: request.title,
        participants,
        created_at: Utc::now(),
      };
      tx.execute(
        "INSERT INTO conversations
           (conversation_id, job_id, title, participants, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          encode_uuid(conversation.conversation_id),
          encode_uuid(conversation.job_id),
          conversation.title,
          encode_uuid_list(&conversation.participants)?,
          encode_dt(conversation.created_at),
        ],
      )?;
      conversation
    }
  };

  if let Some(body) = request.system_message {
    tx.execute(
      "INSERT INTO conversation_messages (message_id, conversation_id, body, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      params![
        encode_uuid(Uuid::new_v4()),
        encode_uuid(conversation.conversation_id),
        body,
        encode_dt(Utc::now()),
      ],
    )?;
  }

  tx.commit()?;
  Ok(conversation)
}

/// Message bodies posted to a conversation, oldest first.
pub fn messages(conn: &Connection, conversation_id: Uuid) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT body FROM conversation_messages
     WHERE conversation_id = ?1
     ORDER BY created_at, rowid",
  )?;
  let bodies = stmt
    .query_map(params![encode_uuid(conversation_id)], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(bodies)
}
