//! Form submission endpoints
//!
//! GET/POST /api/form-submissions, GET /api/form-submissions/:id
//!
//! POST stores the body verbatim as `rawData`, then runs intake. Failures of
//! the model step are reported in the 201 body, never as a 5xx.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use leadwell_common::models::{Call, FormSubmission, Lead, NewFormSubmission};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;

use super::pagination::{calculate_pagination, PageQuery, Pagination};
use super::parse_id;
use super::validation::{parse_body, FieldErrors, Validate};
use crate::error::{ApiError, ApiResult};
use crate::services::{process_submission, IntakeOutcome, Qualification};
use crate::AppState;

pub const DEFAULT_FORM_TYPE: &str = "contact";
pub const DEFAULT_FORM_SOURCE: &str = "website";

/// GET /api/form-submissions response
#[derive(Debug, Serialize)]
pub struct SubmissionListResponse {
    pub submissions: Vec<FormSubmission>,
    pub pagination: Pagination,
}

/// Fields of the submitted body the service reads; everything else is kept only in `rawData`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormRequest {
    pub form_type: Option<String>,
    pub source: Option<String>,
    pub content: Option<Value>,
}

impl Validate for SubmitFormRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        match &self.content {
            None | Some(Value::Null) => errors.add("content", "is required"),
            Some(Value::String(s)) if s.trim().is_empty() => errors.add("content", "must not be empty"),
            Some(Value::String(_)) => {}
            Some(_) => errors.add("content", "must be a string"),
        }
    }
}

/// POST /api/form-submissions response, one shape per intake outcome
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SubmitFormResponse {
    Processed {
        submission: FormSubmission,
        lead: Lead,
        call: Option<Call>,
        qualification: Qualification,
        message: &'static str,
    },
    Spam {
        submission: FormSubmission,
        #[serde(rename = "isScam")]
        is_scam: bool,
        message: &'static str,
    },
    AiError {
        submission: FormSubmission,
        #[serde(rename = "aiError")]
        ai_error: bool,
        message: &'static str,
    },
}

impl From<IntakeOutcome> for SubmitFormResponse {
    fn from(outcome: IntakeOutcome) -> Self {
        match outcome {
            IntakeOutcome::Qualified {
                submission,
                lead,
                call,
                qualification,
            } => SubmitFormResponse::Processed {
                submission,
                lead,
                call,
                qualification,
                message: "Form processed successfully",
            },
            IntakeOutcome::Spam { submission, .. } => SubmitFormResponse::Spam {
                submission,
                is_scam: true,
                message: "Form identified as potential spam",
            },
            IntakeOutcome::AiError { submission, .. } => SubmitFormResponse::AiError {
                submission,
                ai_error: true,
                message: "Form submitted, but AI processing failed",
            },
        }
    }
}

/// GET /api/form-submissions?page=&limit=
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<SubmissionListResponse>> {
    let request = query.resolve()?;
    let page = state
        .storage
        .list_form_submissions(request.page, request.limit)
        .await?;

    Ok(Json(SubmissionListResponse {
        pagination: calculate_pagination(page.total, request.page, request.limit),
        submissions: page.items,
    }))
}

/// GET /api/form-submissions/:id
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FormSubmission>> {
    let id = parse_id(&id, "submission")?;
    let submission = state
        .storage
        .get_form_submission(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Form submission", id))?;
    Ok(Json(submission))
}

/// POST /api/form-submissions
pub async fn submit_form(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitFormResponse>)> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let request: SubmitFormRequest = parse_body(body.clone())?;

    let content = match request.content {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    let new = NewFormSubmission {
        form_type: non_blank_or(request.form_type, DEFAULT_FORM_TYPE),
        source: non_blank_or(request.source, DEFAULT_FORM_SOURCE),
        content,
        raw_data: body,
        ip_address: client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)),
        user_agent: header_text(&headers, "user-agent"),
    };

    let outcome = process_submission(state.storage.as_ref(), state.reasoning.as_ref(), new).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

fn non_blank_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First `X-Forwarded-For` hop, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_text(headers, "x-forwarded-for")
        .and_then(|list| list.split(',').next().map(|hop| hop.trim().to_string()))
        .filter(|hop| !hop.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

pub fn form_submission_routes() -> Router<AppState> {
    Router::new()
        .route("/api/form-submissions", get(list_submissions).post(submit_form))
        .route("/api/form-submissions/:id", get(get_submission))
}
