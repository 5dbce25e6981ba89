//! Per-conversation quality score: a 0-100 blend of how positively AI
//! replies were received (70%) and how often they received feedback at
//! all (30%). Conversations with no AI messages or no feedback have no
//! score rather than a zero, so silence is not penalized.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::enums::MessageRole;

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score from raw counts. None when there is nothing to rate
/// (no AI messages) or no signal yet (no feedback).
pub fn score_counts(total_ai: i64, feedback_count: i64, positive_count: i64) -> Option<f64> {
    if total_ai <= 0 || feedback_count <= 0 {
        return None;
    }
    let positive_ratio = positive_count as f64 / feedback_count as f64;
    let feedback_rate = feedback_count as f64 / total_ai as f64;
    Some(round2((positive_ratio * 0.7 + feedback_rate * 0.3) * 100.0))
}

/// Score one conversation, counting only AI messages and the feedback
/// attached to them.
pub fn conversation_score(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<Option<f64>, DatabaseError> {
    let total_ai =
        repository::count_conversation_messages_by_role(conn, conversation_id, MessageRole::Ai)?;
    if total_ai == 0 {
        return Ok(None);
    }

    let feedback_count = repository::count_conversation_feedback(conn, conversation_id, None)?;
    if feedback_count == 0 {
        return Ok(None);
    }

    let positive_count =
        repository::count_conversation_feedback(conn, conversation_id, Some(true))?;
    Ok(score_counts(total_ai, feedback_count, positive_count))
}
