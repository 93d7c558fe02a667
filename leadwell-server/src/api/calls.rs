//! Call endpoints
//!
//! GET/POST /api/calls, GET/PATCH /api/calls/:id, POST /api/calls/:id/summary

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use leadwell_common::models::{
    Attendee, Call, CallDraft, CallPatch, CallWithLead, LeadSummary, NewCall,
    DEFAULT_CALL_DURATION_MINUTES,
};
use serde::Deserialize;
use std::collections::HashMap;

use super::parse_id;
use super::validation::{FieldErrors, Validate, ValidatedJson};
use crate::error::{ApiError, ApiResult};
use crate::services::summarize_call;
use crate::storage::Storage;
use crate::AppState;

/// GET /api/calls query
#[derive(Debug, Default, Deserialize)]
pub struct CallListQuery {
    pub upcoming: Option<String>,
}

impl CallListQuery {
    fn upcoming_only(&self) -> ApiResult<bool> {
        match self.upcoming.as_deref().map(str::trim) {
            None | Some("") | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(_) => {
                let mut errors = FieldErrors::new();
                errors.add("upcoming", "must be true or false");
                errors.finish().map(|_| false)
            }
        }
    }
}

/// POST /api/calls request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    pub lead_id: Option<i64>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
    pub attendees: Option<Vec<Attendee>>,
    pub ai_scheduled: Option<bool>,
    pub follow_up_needed: Option<bool>,
    pub follow_up_date: Option<DateTime<Utc>>,
}

impl Validate for CreateCallRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require("leadId", &self.lead_id);
        errors.require("scheduledAt", &self.scheduled_at);
        errors.require_text("title", self.title.as_deref());
        errors.check(self.duration.map_or(true, |d| d > 0), "duration", "must be positive");
    }
}

impl CreateCallRequest {
    fn into_new(self) -> NewCall {
        NewCall {
            lead_id: self.lead_id.unwrap_or_default(),
            details: CallDraft {
                scheduled_at: self.scheduled_at.unwrap_or_else(Utc::now),
                duration: self.duration.unwrap_or(DEFAULT_CALL_DURATION_MINUTES),
                title: self.title.unwrap_or_default(),
                notes: self.notes,
                completed: self.completed.unwrap_or(false),
                attendees: self.attendees.unwrap_or_default(),
                ai_scheduled: self.ai_scheduled.unwrap_or(false),
                follow_up_needed: self.follow_up_needed.unwrap_or(false),
                follow_up_date: self.follow_up_date,
            },
        }
    }
}

impl Validate for CallPatch {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.reject_blank("title", self.title.as_deref());
        errors.check(self.duration.map_or(true, |d| d > 0), "duration", "must be positive");
    }
}

async fn with_lead(storage: &dyn Storage, call: Call) -> ApiResult<CallWithLead> {
    let lead = storage.get_lead(call.lead_id).await?;
    Ok(CallWithLead {
        call,
        lead: lead.as_ref().map(LeadSummary::from),
    })
}

/// GET /api/calls?upcoming=true|false
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<CallListQuery>,
) -> ApiResult<Json<Vec<CallWithLead>>> {
    let upcoming_after = query.upcoming_only()?.then(Utc::now);
    let calls = state.storage.list_calls(upcoming_after).await?;

    let mut summaries: HashMap<i64, Option<LeadSummary>> = HashMap::new();
    let mut joined = Vec::with_capacity(calls.len());
    for call in calls {
        if !summaries.contains_key(&call.lead_id) {
            let lead = state.storage.get_lead(call.lead_id).await?;
            summaries.insert(call.lead_id, lead.as_ref().map(LeadSummary::from));
        }
        let lead = summaries.get(&call.lead_id).cloned().flatten();
        joined.push(CallWithLead { call, lead });
    }

    Ok(Json(joined))
}

/// GET /api/calls/:id
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CallWithLead>> {
    let id = parse_id(&id, "call")?;
    let call = state
        .storage
        .get_call(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Call", id))?;
    Ok(Json(with_lead(state.storage.as_ref(), call).await?))
}

/// POST /api/calls
///
/// An unknown `leadId` is a 400, not a 404.
pub async fn create_call(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateCallRequest>,
) -> ApiResult<(StatusCode, Json<Call>)> {
    let call = state.storage.create_call(request.into_new()).await?;
    tracing::info!(call_id = call.id, lead_id = call.lead_id, "Call scheduled");
    Ok((StatusCode::CREATED, Json(call)))
}

/// PATCH /api/calls/:id
pub async fn update_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<CallPatch>,
) -> ApiResult<Json<Call>> {
    let id = parse_id(&id, "call")?;
    let call = state
        .storage
        .update_call(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Call", id))?;
    Ok(Json(call))
}

/// POST /api/calls/:id/summary
pub async fn summarize(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Call>> {
    let id = parse_id(&id, "call")?;
    let call = summarize_call(state.storage.as_ref(), state.reasoning.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Call", id))?;
    Ok(Json(call))
}

/// Build call routes
pub fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/api/calls", get(list_calls).post(create_call))
        .route("/api/calls/:id", get(get_call).patch(update_call))
        .route("/api/calls/:id/summary", post(summarize))
}
