//! Conversation endpoints: paginated list, create, detail, rename, delete.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{parse_int_param, ApiContext};
use crate::chat::ChatStore;
use crate::db::repository;
use crate::insights::quality;
use crate::models::Conversation;

const TITLE_MAX_LEN: usize = 200;

/// Conversation as returned by the API, with its derived quality score.
#[derive(Serialize)]
pub struct ConversationView {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub quality_score: Option<f64>,
}

pub(crate) fn conversation_view(
    conn: &Connection,
    conv: Conversation,
) -> Result<ConversationView, ApiError> {
    let quality_score = quality::conversation_score(conn, &conv.id)?;
    Ok(ConversationView {
        id: conv.id,
        title: conv.title,
        created_at: conv.created_at,
        updated_at: conv.updated_at,
        quality_score,
    })
}

#[derive(Serialize)]
pub struct ConversationListResponse {
    pub results: Vec<ConversationView>,
    pub count: i64,
    pub offset: i64,
    pub limit: i64,
}

/// `GET /api/conversations` — page of conversations, newest activity first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let limit = parse_int_param(&params, "limit", 20, Some(1), Some(100));
    let offset = parse_int_param(&params, "offset", 0, Some(0), None);

    let conn = ctx.open_db()?;
    let count = repository::count_conversations(&conn)?;
    let mut results = Vec::new();
    for conv in repository::list_conversations(&conn, limit, offset)? {
        results.push(conversation_view(&conn, conv)?);
    }

    Ok(Json(ConversationListResponse {
        results,
        count,
        offset,
        limit,
    }))
}

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

/// `POST /api/conversations` — create a conversation, empty or titled.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationView>), ApiError> {
    validate_title(req.title.as_deref())?;

    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    let conv = store.start(req.title.as_deref())?;
    let view = conversation_view(&conn, conv)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /api/conversations/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    let conv = store
        .get(id)?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))?;
    Ok(Json(conversation_view(&conn, conv)?))
}

#[derive(Deserialize)]
pub struct UpdateConversationRequest {
    pub title: Option<String>,
}

/// `PATCH /api/conversations/:id` — update the title (blank clears it).
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateConversationRequest>,
) -> Result<Json<ConversationView>, ApiError> {
    let id = parse_id(&id)?;
    validate_title(req.title.as_deref())?;

    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    let conv = store.rename(id, req.title.as_deref())?;
    Ok(Json(conversation_view(&conn, conv)?))
}

/// `DELETE /api/conversations/:id` — cascade delete.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.open_db()?;
    let store = ChatStore::new(&conn);
    if !store.remove(id)? {
        return Err(ApiError::NotFound("Conversation not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn validate_title(title: Option<&str>) -> Result<(), ApiError> {
    if let Some(title) = title {
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(ApiError::BadRequest(format!(
                "Title too long (max {TITLE_MAX_LEN} chars)"
            )));
        }
    }
    Ok(())
}
