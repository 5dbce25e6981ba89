//! Message endpoints: incremental history and the send-and-reply flow.
//!
//! `POST` persists the user message first, then asks the generator for a
//! reply. A generator failure surfaces as 502 with the user message kept,
//! so the conversation stays consistent for a retry.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::feedback::FeedbackView;
use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{parse_int_param, ApiContext};
use crate::chat::ChatStore;
use crate::llm::ChatTurn;
use crate::models::enums::MessageRole;
use crate::models::{Feedback, Message};

const TEXT_MAX_LEN: usize = 1000;

/// How many prior turns are sent to the generator as context.
const HISTORY_WINDOW: i64 = 10;

#[derive(Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub text: String,
    pub sequence: i64,
    pub created_at: NaiveDateTime,
    pub feedback: Option<FeedbackView>,
}

fn message_view(msg: Message, feedback: Option<Feedback>) -> MessageView {
    MessageView {
        id: msg.id,
        conversation_id: msg.conversation_id,
        role: msg.role,
        text: msg.text,
        sequence: msg.sequence,
        created_at: msg.created_at,
        feedback: feedback.map(FeedbackView::from),
    }
}

#[derive(Serialize)]
pub struct MessageListResponse {
    pub results: Vec<MessageView>,
    #[serde(rename = "lastSeq")]
    pub last_seq: i64,
}

/// `GET /api/conversations/:id/messages` — sequence-ordered messages,
/// optionally only those after `since`.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let id = parse_id(&id)?;
    let since = parse_int_param(&params, "since", 0, Some(0), None);
    let limit = parse_int_param(&params, "limit", 50, Some(1), Some(200));

    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    let history = store.history(id, since, limit)?;

    let last_seq = history.last().map(|(m, _)| m.sequence).unwrap_or(since);
    let results = history
        .into_iter()
        .map(|(m, f)| message_view(m, f))
        .collect();

    Ok(Json(MessageListResponse { results, last_seq }))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub user_message: MessageView,
    pub ai_message: MessageView,
}

/// `POST /api/conversations/:id/messages` — append a user message and
/// obtain the AI reply.
pub async fn send(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let id = parse_id(&id)?;
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".into()));
    }
    if text.chars().count() > TEXT_MAX_LEN {
        return Err(ApiError::BadRequest(format!(
            "Message too long (max {TEXT_MAX_LEN} chars)"
        )));
    }

    // Persist the user message; capture prior turns as generator context.
    // The connection must not be held across the blocking call below.
    let (user_message, history) = {
        let conn = ctx.open_db()?;
        let store = ChatStore::new(&conn);
        let history: Vec<ChatTurn> = store
            .recent_turns(id, HISTORY_WINDOW)?
            .into_iter()
            .map(|m| ChatTurn {
                role: m.role,
                text: m.text,
            })
            .collect();
        let user_message = store.append(id, MessageRole::User, &text)?;
        (user_message, history)
    };

    let generator = ctx.generator.clone();
    let prompt = text.clone();
    let reply = tokio::task::spawn_blocking(move || generator.generate(&history, &prompt))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)?;

    let ai_message = {
        let conn = ctx.open_db()?;
        let store = ChatStore::new(&conn);
        let ai_message = store.append(id, MessageRole::Ai, &reply)?;
        store.maybe_auto_title(id, &text)?;
        ai_message
    };

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            user_message: message_view(user_message, None),
            ai_message: message_view(ai_message, None),
        }),
    ))
}
