use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Feedback;

use super::{format_datetime, parse_datetime, parse_uuid};

pub fn insert_feedback(conn: &Connection, feedback: &Feedback) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO feedback (id, message_id, rating, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            feedback.id.to_string(),
            feedback.message_id.to_string(),
            feedback.rating,
            feedback.note,
            format_datetime(&feedback.created_at),
            format_datetime(&feedback.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_feedback(conn: &Connection, feedback: &Feedback) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE feedback SET rating = ?1, note = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            feedback.rating,
            feedback.note,
            format_datetime(&feedback.updated_at),
            feedback.id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_feedback_by_message(
    conn: &Connection,
    message_id: &Uuid,
) -> Result<Option<Feedback>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, message_id, rating, note, created_at, updated_at
         FROM feedback WHERE message_id = ?1",
        params![message_id.to_string()],
        row_to_parts,
    );

    match result {
        Ok(parts) => Ok(Some(feedback_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Global feedback count, optionally restricted to one rating value.
pub fn count_feedback(conn: &Connection, rating: Option<bool>) -> Result<i64, DatabaseError> {
    let count = match rating {
        Some(r) => conn.query_row(
            "SELECT COUNT(*) FROM feedback WHERE rating = ?1",
            params![r],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))?,
    };
    Ok(count)
}

/// Feedback count for one conversation, counting only feedback attached
/// to its AI-role messages. Optionally restricted to one rating value.
pub fn count_conversation_feedback(
    conn: &Connection,
    conversation_id: &Uuid,
    rating: Option<bool>,
) -> Result<i64, DatabaseError> {
    let count = match rating {
        Some(r) => conn.query_row(
            "SELECT COUNT(*) FROM feedback f
             JOIN messages m ON m.id = f.message_id
             WHERE m.conversation_id = ?1 AND m.role = 'ai' AND f.rating = ?2",
            params![conversation_id.to_string(), r],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM feedback f
             JOIN messages m ON m.id = f.message_id
             WHERE m.conversation_id = ?1 AND m.role = 'ai'",
            params![conversation_id.to_string()],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

/// All non-empty feedback notes, newest first. Input for theme extraction.
pub fn non_empty_feedback_notes(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT note FROM feedback
         WHERE note IS NOT NULL AND note != ''
         ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut notes = Vec::new();
    for row in rows {
        notes.push(row?);
    }
    Ok(notes)
}

type FeedbackParts = (String, String, bool, Option<String>, String, String);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn feedback_from_parts(parts: FeedbackParts) -> Result<Feedback, DatabaseError> {
    let (id, message_id, rating, note, created_at, updated_at) = parts;
    Ok(Feedback {
        id: parse_uuid(&id)?,
        message_id: parse_uuid(&message_id)?,
        rating,
        note,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}
