//! Lead endpoints
//!
//! GET/POST /api/leads, GET/PATCH /api/leads/:id

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use leadwell_common::models::{lead_status, Lead, LeadPatch, NewLead};
use leadwell_common::scoring::ScoringInput;
use serde::{Deserialize, Serialize};

use super::pagination::{calculate_pagination, PageQuery, Pagination};
use super::parse_id;
use super::validation::{FieldErrors, Validate, ValidatedJson};
use crate::error::{ApiError, ApiResult};
use crate::services::score_lead;
use crate::AppState;

/// GET /api/leads response
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
}

/// POST /api/leads request; `score` is always computed server-side
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub project_type: Option<String>,
    pub budget: Option<i64>,
    pub timeline: Option<String>,
    pub source: Option<String>,
    pub source_icon: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<i64>,
}

impl Validate for CreateLeadRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require_text("name", self.name.as_deref());
        errors.require_text("email", self.email.as_deref());
        errors.check_email("email", self.email.as_deref());
        errors.require_text("projectType", self.project_type.as_deref());
        errors.require_text("source", self.source.as_deref());
        errors.reject_blank("status", self.status.as_deref());
        errors.check(self.budget.map_or(true, |b| b >= 0), "budget", "must not be negative");
    }
}

impl CreateLeadRequest {
    fn into_new(self, score: i64) -> NewLead {
        NewLead {
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            phone: self.phone,
            company: self.company,
            project_type: self.project_type.unwrap_or_default(),
            budget: self.budget,
            timeline: self.timeline,
            source: self.source.unwrap_or_default(),
            source_icon: self.source_icon,
            score,
            status: self.status.unwrap_or_else(|| lead_status::NEW.to_string()),
            notes: self.notes,
            ai_qualified: None,
            ai_qualification_reason: None,
            ai_processed: false,
            assigned_to: self.assigned_to,
        }
    }

    fn scoring_input(&self) -> ScoringInput<'_> {
        ScoringInput {
            name: self.name.as_deref(),
            email: self.email.as_deref(),
            phone: self.phone.as_deref(),
            company: self.company.as_deref(),
            project_type: self.project_type.as_deref(),
            source: self.source.as_deref(),
        }
    }
}

impl Validate for LeadPatch {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.reject_blank("name", self.name.as_deref());
        errors.reject_blank("email", self.email.as_deref());
        errors.check_email("email", self.email.as_deref());
        errors.reject_blank("projectType", self.project_type.as_deref());
        errors.reject_blank("source", self.source.as_deref());
        errors.reject_blank("status", self.status.as_deref());
        errors.check(self.budget.flatten().map_or(true, |b| b >= 0), "budget", "must not be negative");
    }
}

/// GET /api/leads?page=&limit=
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<LeadListResponse>> {
    let request = query.resolve()?;
    let page = state.storage.list_leads(request.page, request.limit).await?;

    Ok(Json(LeadListResponse {
        pagination: calculate_pagination(page.total, request.page, request.limit),
        leads: page.items,
    }))
}

/// GET /api/leads/:id
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Lead>> {
    let id = parse_id(&id, "lead")?;
    let lead = state
        .storage
        .get_lead(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead", id))?;
    Ok(Json(lead))
}

/// POST /api/leads
pub async fn create_lead(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateLeadRequest>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let score = score_lead(state.reasoning.as_ref(), &request.scoring_input()).await;
    let lead = state.storage.create_lead(request.into_new(score)).await?;

    tracing::info!(lead_id = lead.id, score = lead.score, source = %lead.source, "Lead created");
    Ok((StatusCode::CREATED, Json(lead)))
}

/// PATCH /api/leads/:id
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<LeadPatch>,
) -> ApiResult<Json<Lead>> {
    let id = parse_id(&id, "lead")?;
    let lead = state
        .storage
        .update_lead(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead", id))?;

    tracing::debug!(lead_id = id, status = %lead.status, "Lead updated");
    Ok(Json(lead))
}

/// Build lead routes
pub fn lead_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leads", get(list_leads).post(create_lead))
        .route("/api/leads/:id", get(get_lead).patch(update_lead))
}
