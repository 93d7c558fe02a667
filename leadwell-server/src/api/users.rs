//! User endpoints
//!
//! GET /api/users/:id, POST /api/users

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use leadwell_common::models::{NewUser, User};
use serde::Deserialize;

use super::parse_id;
use super::validation::{FieldErrors, Validate, ValidatedJson};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/users request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
}

impl Validate for CreateUserRequest {
    fn validate(&self, errors: &mut FieldErrors) {
        errors.require_text("username", self.username.as_deref());
        errors.require_text("name", self.name.as_deref());
        errors.require_text("role", self.role.as_deref());
        errors.check_email("email", self.email.as_deref());
    }
}

impl CreateUserRequest {
    fn into_new(self) -> NewUser {
        NewUser {
            username: self.username.unwrap_or_default().trim().to_string(),
            name: self.name.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            email: self.email,
            phone: self.phone,
            job_title: self.job_title,
        }
    }
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id, "user")?;
    let user = state
        .storage
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    Ok(Json(user))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.storage.create_user(request.into_new()).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Build user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user))
}
