//! Analytics endpoint: the consolidated insights report.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::insights::{build_insights, InsightsReport};

/// `GET /api/insights` — usage, feedback, themes, quality scores, and an
/// optional narrative summary. Pollers pass `include_summary=false` to
/// skip the generator call.
pub async fn report(
    State(ctx): State<ApiContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<InsightsReport>, ApiError> {
    let include_summary = params
        .get("include_summary")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true);

    // The report both walks the store and (optionally) blocks on the
    // generator, so the whole build runs off the async runtime.
    let report = tokio::task::spawn_blocking(move || -> Result<InsightsReport, ApiError> {
        let conn = ctx.open_db()?;
        Ok(build_insights(&conn, ctx.generator.as_ref(), include_summary)?)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(report))
}
