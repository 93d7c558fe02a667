//! Reference catalog endpoints
//!
//! GET/POST /api/project-types, GET/POST /api/marketing-channels

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use leadwell_common::models::{MarketingChannel, NewMarketingChannel, NewProjectType, ProjectType};
use serde::Deserialize;

use super::validation::{FieldErrors, Validate, ValidatedJson};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub min_budget: Option<i64>,
    pub average_timeline: Option<String>,
}

impl Validate for CreateProjectTypeRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require_text("name", self.name.as_deref());
        errors.check(self.min_budget.map_or(true, |b| b >= 0), "minBudget", "must not be negative");
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketingChannelRequest {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub active: Option<bool>,
    pub conversion_rate: Option<i64>,
}

impl Validate for CreateMarketingChannelRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require_text("name", self.name.as_deref());
        errors.require_text("icon", self.icon.as_deref());
        errors.check(
            self.conversion_rate.map_or(true, |r| (0..=100).contains(&r)),
            "conversionRate",
            "must be between 0 and 100",
        );
    }
}

/// GET /api/project-types
pub async fn list_project_types(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectType>>> {
    Ok(Json(state.storage.list_project_types().await?))
}

/// POST /api/project-types
pub async fn create_project_type(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateProjectTypeRequest>,
) -> ApiResult<(StatusCode, Json<ProjectType>)> {
    let project_type = state
        .storage
        .create_project_type(NewProjectType {
            name: request.name.unwrap_or_default().trim().to_string(),
            description: request.description,
            min_budget: request.min_budget,
            average_timeline: request.average_timeline,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(project_type)))
}

/// GET /api/marketing-channels
pub async fn list_marketing_channels(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<MarketingChannel>>> {
    Ok(Json(state.storage.list_marketing_channels().await?))
}

/// POST /api/marketing-channels
pub async fn create_marketing_channel(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateMarketingChannelRequest>,
) -> ApiResult<(StatusCode, Json<MarketingChannel>)> {
    let channel = state
        .storage
        .create_marketing_channel(NewMarketingChannel {
            name: request.name.unwrap_or_default().trim().to_string(),
            icon: request.icon.unwrap_or_default(),
            active: request.active.unwrap_or(true),
            conversion_rate: request.conversion_rate,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/project-types", get(list_project_types).post(create_project_type))
        .route(
            "/api/marketing-channels",
            get(list_marketing_channels).post(create_marketing_channel),
        )
}
