use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::MessageRole;
use crate::models::{Feedback, Message};

use super::{format_datetime, parse_datetime, parse_uuid};

/// Insert a message with an explicit sequence value.
pub fn insert_message(conn: &Connection, msg: &Message) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, text, sequence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            msg.id.to_string(),
            msg.conversation_id.to_string(),
            msg.role.as_str(),
            msg.text,
            msg.sequence,
            format_datetime(&msg.created_at),
        ],
    )?;
    Ok(())
}

/// Insert a message, assigning the next per-conversation sequence
/// (1 + count of existing messages) inside the INSERT itself so the
/// counter stays atomic under concurrent appends. Returns the assigned
/// sequence.
pub fn insert_message_auto_sequence(
    conn: &Connection,
    msg: &Message,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, text, sequence, created_at)
         VALUES (?1, ?2, ?3, ?4,
                 (SELECT 1 + COUNT(*) FROM messages WHERE conversation_id = ?2),
                 ?5)",
        params![
            msg.id.to_string(),
            msg.conversation_id.to_string(),
            msg.role.as_str(),
            msg.text,
            format_datetime(&msg.created_at),
        ],
    )?;

    let sequence = conn.query_row(
        "SELECT sequence FROM messages WHERE id = ?1",
        params![msg.id.to_string()],
        |row| row.get(0),
    )?;
    Ok(sequence)
}

pub fn get_message(conn: &Connection, id: &Uuid) -> Result<Option<Message>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, conversation_id, role, text, sequence, created_at
         FROM messages WHERE id = ?1",
        params![id.to_string()],
        row_to_parts,
    );

    match result {
        Ok(parts) => Ok(Some(message_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Sequence-ordered messages with `sequence > since`, each with its
/// feedback (if any) attached via LEFT JOIN.
pub fn get_messages_with_feedback(
    conn: &Connection,
    conversation_id: &Uuid,
    since: i64,
    limit: i64,
) -> Result<Vec<(Message, Option<Feedback>)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.conversation_id, m.role, m.text, m.sequence, m.created_at,
                f.id, f.rating, f.note, f.created_at, f.updated_at
         FROM messages m
         LEFT JOIN feedback f ON f.message_id = m.id
         WHERE m.conversation_id = ?1 AND m.sequence > ?2
         ORDER BY m.sequence ASC LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![conversation_id.to_string(), since, limit], |row| {
        let msg: MessageParts = (
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        );
        let fb: Option<(String, bool, Option<String>, String, String)> =
            match row.get::<_, Option<String>>(6)? {
                Some(id) => Some((id, row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?)),
                None => None,
            };
        Ok((msg, fb))
    })?;

    let mut messages = Vec::new();
    for row in rows {
        let (msg_parts, fb_parts) = row?;
        let message = message_from_parts(msg_parts)?;
        let feedback = match fb_parts {
            Some((id, rating, note, created_at, updated_at)) => Some(Feedback {
                id: parse_uuid(&id)?,
                message_id: message.id,
                rating,
                note,
                created_at: parse_datetime(&created_at)?,
                updated_at: parse_datetime(&updated_at)?,
            }),
            None => None,
        };
        messages.push((message, feedback));
    }
    Ok(messages)
}

/// Last `n` messages of a conversation in chronological order, for use
/// as LLM history context.
pub fn recent_messages(
    conn: &Connection,
    conversation_id: &Uuid,
    n: i64,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, role, text, sequence, created_at
         FROM messages WHERE conversation_id = ?1
         ORDER BY sequence DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![conversation_id.to_string(), n], row_to_parts)?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_parts(row?)?);
    }
    messages.reverse();
    Ok(messages)
}

pub fn count_messages(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_messages_by_role(conn: &Connection, role: MessageRole) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_conversation_messages(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
        params![conversation_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_conversation_messages_by_role(
    conn: &Connection,
    conversation_id: &Uuid,
    role: MessageRole,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1 AND role = ?2",
        params![conversation_id.to_string(), role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

type MessageParts = (String, String, String, String, i64, String);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn message_from_parts(parts: MessageParts) -> Result<Message, DatabaseError> {
    let (id, conversation_id, role, text, sequence, created_at) = parts;
    Ok(Message {
        id: parse_uuid(&id)?,
        conversation_id: parse_uuid(&conversation_id)?,
        role: MessageRole::from_str(&role)?,
        text,
        sequence,
        created_at: parse_datetime(&created_at)?,
    })
}
