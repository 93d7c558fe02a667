//! AI insight endpoints
//!
//! GET/POST /api/ai-insights, POST /api/ai-insights/generate,
//! PATCH /api/ai-insights/:id/read

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use leadwell_common::models::{AiInsight, InsightType, NewAiInsight};
use serde::Deserialize;

use super::parse_id;
use super::validation::{FieldErrors, Validate, ValidatedJson};
use crate::error::{ApiError, ApiResult};
use crate::services::generate_insights;
use crate::services::insights::DEFAULT_PRIORITY;
use crate::AppState;

const PRIORITIES: [&str; 3] = ["high", "medium", "low"];

/// POST /api/ai-insights request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInsightRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub insight_type: Option<String>,
    pub icon: Option<String>,
    pub action: Option<String>,
    pub action_url: Option<String>,
    pub related_leads: Option<Vec<i64>>,
    pub priority: Option<String>,
}

impl Validate for CreateInsightRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require_text("title", self.title.as_deref());
        errors.require_text("description", self.description.as_deref());
        errors.require_text("icon", self.icon.as_deref());
        match self.insight_type.as_deref() {
            None => errors.add("type", "is required"),
            Some(t) => errors.check(
                t.parse::<InsightType>().is_ok(),
                "type",
                "must be one of quality, schedule, trend, source, opportunity",
            ),
        }
        if let Some(priority) = self.priority.as_deref() {
            errors.check(
                PRIORITIES.contains(&priority),
                "priority",
                "must be one of high, medium, low",
            );
        }
    }
}

impl CreateInsightRequest {
    fn into_new(self) -> ApiResult<NewAiInsight> {
        let insight_type = self
            .insight_type
            .as_deref()
            .unwrap_or_default()
            .parse::<InsightType>()
            .map_err(ApiError::BadRequest)?;

        Ok(NewAiInsight {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            insight_type,
            icon: self.icon.unwrap_or_default(),
            action: self.action,
            action_url: self.action_url,
            related_leads: self.related_leads.unwrap_or_default(),
            priority: self.priority.unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
        })
    }
}

/// GET /api/ai-insights
pub async fn list_insights(State(state): State<AppState>) -> ApiResult<Json<Vec<AiInsight>>> {
    Ok(Json(state.storage.list_insights().await?))
}

/// POST /api/ai-insights
pub async fn create_insight(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateInsightRequest>,
) -> ApiResult<(StatusCode, Json<AiInsight>)> {
    let insight = state.storage.create_insight(request.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(insight)))
}

/// POST /api/ai-insights/generate
pub async fn generate(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<Vec<AiInsight>>)> {
    let insights = generate_insights(state.storage.as_ref(), state.reasoning.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(insights)))
}

/// PATCH /api/ai-insights/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AiInsight>> {
    let id = parse_id(&id, "insight")?;
    let insight = state
        .storage
        .mark_insight_read(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Insight", id))?;
    Ok(Json(insight))
}

pub fn insight_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ai-insights", get(list_insights).post(create_insight))
        .route("/api/ai-insights/generate", post(generate))
        .route("/api/ai-insights/:id/read", patch(mark_read))
}
