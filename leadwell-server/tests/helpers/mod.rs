//! Shared helpers for leadwell-server integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use leadwell_common::models::{lead_status, Lead, NewLead};
use leadwell_server::services::{ReasoningClient, ReasoningError};
use leadwell_server::storage::{MemoryStorage, SharedStorage};
use leadwell_server::{build_router, AppState};
use serde_json::Value;
use tower::util::ServiceExt;

/// Reasoning client that replays queued answers in order
///
/// An empty queue answers with a network error, so unscripted calls exercise
/// the fallback paths.
#[derive(Default)]
pub struct ScriptedReasoner {
    json: Mutex<VecDeque<Result<Value, ReasoningError>>>,
    text: Mutex<VecDeque<Result<String, ReasoningError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, value: Value) {
        self.json.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_json_error(&self, error: ReasoningError) {
        self.json.lock().unwrap().push_back(Err(error));
    }

    pub fn push_text(&self, text: &str) {
        self.text.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn unscripted() -> ReasoningError {
    ReasoningError::Network("no scripted response".to_string())
}

#[async_trait]
impl ReasoningClient for ScriptedReasoner {
    async fn complete_json(&self, prompt: &str) -> Result<Value, ReasoningError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.json.lock().unwrap().pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    async fn complete_text(&self, prompt: &str) -> Result<String, ReasoningError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.text.lock().unwrap().pop_front().unwrap_or_else(|| Err(unscripted()))
    }
}

/// Router over fresh in-memory storage
pub fn test_app(reasoner: Arc<ScriptedReasoner>) -> (Router, SharedStorage) {
    let storage: SharedStorage = Arc::new(MemoryStorage::new());
    let state = AppState::new(storage.clone(), reasoner);
    (build_router(state), storage)
}

/// Send one request and decode the JSON body (Null when empty)
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub fn new_lead(name: &str, source: &str, project_type: &str, score: i64) -> NewLead {
    NewLead {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: None,
        company: None,
        project_type: project_type.to_string(),
        budget: None,
        timeline: None,
        source: source.to_string(),
        source_icon: None,
        score,
        status: lead_status::NEW.to_string(),
        notes: None,
        ai_qualified: None,
        ai_qualification_reason: None,
        ai_processed: false,
        assigned_to: None,
    }
}

pub async fn insert_lead(storage: &SharedStorage, name: &str) -> Lead {
    storage
        .create_lead(new_lead(name, "Website", "Commercial Office", 50))
        .await
        .unwrap()
}

/// RFC 3339 timestamp `hours` from now
pub fn hours_from_now(hours: i64) -> String {
    (Utc::now() + chrono::Duration::hours(hours)).to_rfc3339()
}
