//! Conversation lifecycle: create/rename/delete conversations, append
//! messages with per-conversation sequence numbers, and record feedback.
//!
//! Builds on top of:
//! - `models::{Conversation, Message, Feedback}` (data structs)
//! - `db::repository` (low-level insert/query)

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::enums::MessageRole;
use crate::models::{Conversation, Feedback, Message};

/// Maximum title length derived from the first user message.
const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(Uuid),

    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    #[error("Feedback can only be provided for AI messages")]
    FeedbackNotAllowed,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Generate a conversation title from the first user message.
/// Truncates at 50 characters with "..." if longer, handling UTF-8 correctly.
pub fn generate_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New conversation".to_string();
    }

    let boundary = trimmed
        .char_indices()
        .take(TITLE_MAX_CHARS)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());

    if boundary >= trimmed.len() {
        trimmed.to_string()
    } else {
        format!("{}...", &trimmed[..boundary])
    }
}

/// Normalize an optional free-text field: trim, blank becomes None.
fn normalize_text(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(|v| v.to_string())
}

/// Manages conversation lifecycle and message/feedback persistence.
pub struct ChatStore<'a> {
    conn: &'a Connection,
}

impl<'a> ChatStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Start a new conversation, empty or titled.
    pub fn start(&self, title: Option<&str>) -> Result<Conversation, ChatError> {
        let now = Utc::now().naive_utc();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            title: normalize_text(title),
            created_at: now,
            updated_at: now,
        };
        repository::insert_conversation(self.conn, &conversation)?;
        Ok(conversation)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Conversation>, ChatError> {
        Ok(repository::get_conversation(self.conn, &id)?)
    }

    /// Update the title. A blank title clears it.
    pub fn rename(&self, id: Uuid, title: Option<&str>) -> Result<Conversation, ChatError> {
        let title = normalize_text(title);
        let now = Utc::now().naive_utc();
        let updated =
            repository::update_conversation_title(self.conn, &id, title.as_deref(), &now)?;
        if !updated {
            return Err(ChatError::ConversationNotFound(id));
        }
        repository::get_conversation(self.conn, &id)?
            .ok_or(ChatError::ConversationNotFound(id))
    }

    /// Delete a conversation and all its messages (CASCADE).
    pub fn remove(&self, id: Uuid) -> Result<bool, ChatError> {
        Ok(repository::delete_conversation(self.conn, &id)?)
    }

    /// Append a message, assigning the next sequence number and bumping
    /// the conversation's updated_at.
    pub fn append(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        text: &str,
    ) -> Result<Message, ChatError> {
        self.ensure_conversation_exists(conversation_id)?;

        let now = Utc::now().naive_utc();
        let mut msg = Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            text: text.to_string(),
            sequence: 0,
            created_at: now,
        };
        msg.sequence = repository::insert_message_auto_sequence(self.conn, &msg)?;
        repository::touch_conversation(self.conn, &conversation_id, &now)?;
        Ok(msg)
    }

    /// Sequence-ordered messages after `since`, with feedback attached.
    pub fn history(
        &self,
        conversation_id: Uuid,
        since: i64,
        limit: i64,
    ) -> Result<Vec<(Message, Option<Feedback>)>, ChatError> {
        self.ensure_conversation_exists(conversation_id)?;
        Ok(repository::get_messages_with_feedback(
            self.conn,
            &conversation_id,
            since,
            limit,
        )?)
    }

    /// Last `n` messages in chronological order, as LLM context.
    pub fn recent_turns(
        &self,
        conversation_id: Uuid,
        n: i64,
    ) -> Result<Vec<Message>, ChatError> {
        self.ensure_conversation_exists(conversation_id)?;
        Ok(repository::recent_messages(self.conn, &conversation_id, n)?)
    }

    /// Title an untitled conversation from its first user message.
    /// Applies only when the conversation has no title yet and `text`
    /// is its sole user message. Returns the applied title.
    pub fn maybe_auto_title(
        &self,
        conversation_id: Uuid,
        text: &str,
    ) -> Result<Option<String>, ChatError> {
        let conv = repository::get_conversation(self.conn, &conversation_id)?
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;
        if conv.title.is_some() {
            return Ok(None);
        }

        let user_messages = repository::count_conversation_messages_by_role(
            self.conn,
            &conversation_id,
            MessageRole::User,
        )?;
        if user_messages != 1 {
            return Ok(None);
        }

        let title = generate_title(text);
        let now = Utc::now().naive_utc();
        repository::update_conversation_title(self.conn, &conversation_id, Some(&title), &now)?;
        Ok(Some(title))
    }

    /// Create or update feedback for an AI message (at most one per
    /// message). On update the note changes only when one is provided.
    /// Returns the feedback and whether it was newly created.
    pub fn upsert_feedback(
        &self,
        message_id: Uuid,
        rating: bool,
        note: Option<&str>,
    ) -> Result<(Feedback, bool), ChatError> {
        let message = repository::get_message(self.conn, &message_id)?
            .ok_or(ChatError::MessageNotFound(message_id))?;
        if message.role != MessageRole::Ai {
            return Err(ChatError::FeedbackNotAllowed);
        }

        let now = Utc::now().naive_utc();
        match repository::get_feedback_by_message(self.conn, &message_id)? {
            Some(mut existing) => {
                existing.rating = rating;
                if note.is_some() {
                    existing.note = normalize_text(note);
                }
                existing.updated_at = now;
                repository::update_feedback(self.conn, &existing)?;
                Ok((existing, false))
            }
            None => {
                let feedback = Feedback {
                    id: Uuid::new_v4(),
                    message_id,
                    rating,
                    note: normalize_text(note),
                    created_at: now,
                    updated_at: now,
                };
                repository::insert_feedback(self.conn, &feedback)?;
                Ok((feedback, true))
            }
        }
    }

    /// Feedback for a message, if any. Errors when the message is unknown.
    pub fn feedback_for(&self, message_id: Uuid) -> Result<Option<Feedback>, ChatError> {
        repository::get_message(self.conn, &message_id)?
            .ok_or(ChatError::MessageNotFound(message_id))?;
        Ok(repository::get_feedback_by_message(self.conn, &message_id)?)
    }

    fn ensure_conversation_exists(&self, id: Uuid) -> Result<(), ChatError> {
        let conv = repository::get_conversation(self.conn, &id)?;
        if conv.is_none() {
            return Err(ChatError::ConversationNotFound(id));
        }
        Ok(())
    }
}
