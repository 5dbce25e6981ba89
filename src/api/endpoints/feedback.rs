//! Per-message feedback endpoints: idempotent submit and lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::chat::ChatStore;
use crate::models::Feedback;

const NOTE_MAX_LEN: usize = 1000;

#[derive(Serialize)]
pub struct FeedbackView {
    pub id: Uuid,
    pub rating: bool,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Feedback> for FeedbackView {
    fn from(f: Feedback) -> Self {
        FeedbackView {
            id: f.id,
            rating: f.rating,
            note: f.note,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateFeedbackRequest {
    /// true for thumbs up, false for thumbs down
    pub rating: bool,
    pub note: Option<String>,
}

/// `POST /api/messages/:id/feedback` — create or update feedback for an
/// AI message. 201 on create, 200 on update.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(req): Json<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackView>), ApiError> {
    let id = parse_id(&id)?;
    if let Some(note) = &req.note {
        if note.chars().count() > NOTE_MAX_LEN {
            return Err(ApiError::BadRequest(format!(
                "Note too long (max {NOTE_MAX_LEN} chars)"
            )));
        }
    }

    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    let (feedback, created) = store.upsert_feedback(id, req.rating, req.note.as_deref())?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(feedback.into())))
}

/// `GET /api/messages/:id/feedback`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<FeedbackView>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    let feedback = store
        .feedback_for(id)?
        .ok_or_else(|| ApiError::NotFound("No feedback found for this message.".into()))?;
    Ok(Json(feedback.into()))
}
