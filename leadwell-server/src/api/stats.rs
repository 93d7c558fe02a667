//! Dashboard stat endpoints
//!
//! GET/POST /api/stats, PATCH /api/stats/:id

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use leadwell_common::models::{NewStat, Stat, StatPatch};
use serde::Deserialize;

use super::parse_id;
use super::validation::{FieldErrors, Validate, ValidatedJson};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const DEFAULT_PERIOD: &str = "week";

#[derive(Debug, Default, Deserialize)]
pub struct StatQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatRequest {
    pub name: Option<String>,
    pub value: Option<String>,
    pub change_percentage: Option<i64>,
    pub icon: Option<String>,
    pub period: Option<String>,
}

impl Validate for CreateStatRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require_text("name", self.name.as_deref());
        errors.require_text("value", self.value.as_deref());
        errors.reject_blank("period", self.period.as_deref());
    }
}

impl Validate for StatPatch {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.reject_blank("name", self.name.as_deref());
        errors.reject_blank("value", self.value.as_deref());
        errors.reject_blank("period", self.period.as_deref());
    }
}

/// GET /api/stats?period=
pub async fn list_stats(
    State(state): State<AppState>,
    Query(query): Query<StatQuery>,
) -> ApiResult<Json<Vec<Stat>>> {
    let period = query
        .period
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PERIOD);
    Ok(Json(state.storage.list_stats(period).await?))
}

/// POST /api/stats
pub async fn create_stat(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateStatRequest>,
) -> ApiResult<(StatusCode, Json<Stat>)> {
    let stat = state
        .storage
        .create_stat(NewStat {
            name: request.name.unwrap_or_default(),
            value: request.value.unwrap_or_default(),
            change_percentage: request.change_percentage,
            icon: request.icon,
            period: request.period.unwrap_or_else(|| DEFAULT_PERIOD.to_string()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(stat)))
}

/// PATCH /api/stats/:id
pub async fn update_stat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<StatPatch>,
) -> ApiResult<Json<Stat>> {
    let id = parse_id(&id, "stat")?;
    let stat = state
        .storage
        .update_stat(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Stat", id))?;
    Ok(Json(stat))
}

pub fn stat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(list_stats).post(create_stat))
        .route("/api/stats/:id", patch(update_stat))
}
