//! Storage capability layer
//!
//! Business logic talks to `dyn Storage` only. Two interchangeable
//! implementations exist and are picked by configuration at startup:
//! - [`MemoryStorage`]: integer-id arena in process memory (tests, demos)
//! - [`SqliteStorage`]: sqlx-backed SQLite database (production)

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadwell_common::models::{
    AiInsight, Call, CallPatch, FormSubmission, FormSubmissionUpdate, IntakeCommit,
    IntakeRecords, Lead, LeadPatch, MarketingChannel, NewAiInsight, NewCall,
    NewFormSubmission, NewLead, NewMarketingChannel, NewProjectType, NewStat, NewUser,
    ProjectType, Stat, StatPatch, User,
};
use leadwell_common::Result;
use std::sync::Arc;

/// One page of rows plus the unpaginated row count
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Create/get/list/update per entity
///
/// `get_*` and `update_*` return `Ok(None)` for unknown ids. Creating a call
/// for a lead that does not exist is `Error::InvalidInput`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for logs and the health endpoint
    fn backend_name(&self) -> &'static str;

    // Users
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;

    // Leads, newest first
    async fn list_leads(&self, page: i64, limit: i64) -> Result<Page<Lead>>;
    async fn get_lead(&self, id: i64) -> Result<Option<Lead>>;
    async fn create_lead(&self, lead: NewLead) -> Result<Lead>;
    async fn update_lead(&self, id: i64, patch: LeadPatch) -> Result<Option<Lead>>;

    // Calls, ordered by scheduled time
    /// With `upcoming_after` set, only incomplete calls scheduled at or after it
    async fn list_calls(&self, upcoming_after: Option<DateTime<Utc>>) -> Result<Vec<Call>>;
    async fn get_call(&self, id: i64) -> Result<Option<Call>>;
    async fn create_call(&self, call: NewCall) -> Result<Call>;
    async fn update_call(&self, id: i64, patch: CallPatch) -> Result<Option<Call>>;

    // Catalog
    async fn list_project_types(&self) -> Result<Vec<ProjectType>>;
    async fn create_project_type(&self, project_type: NewProjectType) -> Result<ProjectType>;
    async fn list_marketing_channels(&self) -> Result<Vec<MarketingChannel>>;
    async fn create_marketing_channel(&self, channel: NewMarketingChannel) -> Result<MarketingChannel>;

    // Insights, newest first
    async fn list_insights(&self) -> Result<Vec<AiInsight>>;
    async fn create_insight(&self, insight: NewAiInsight) -> Result<AiInsight>;
    async fn mark_insight_read(&self, id: i64) -> Result<Option<AiInsight>>;

    // Stats
    async fn list_stats(&self, period: &str) -> Result<Vec<Stat>>;
    async fn create_stat(&self, stat: NewStat) -> Result<Stat>;
    async fn update_stat(&self, id: i64, patch: StatPatch) -> Result<Option<Stat>>;

    // Form submissions, newest first
    async fn list_form_submissions(&self, page: i64, limit: i64) -> Result<Page<FormSubmission>>;
    async fn get_form_submission(&self, id: i64) -> Result<Option<FormSubmission>>;
    async fn create_form_submission(&self, submission: NewFormSubmission) -> Result<FormSubmission>;
    async fn update_form_submission(
        &self,
        id: i64,
        update: FormSubmissionUpdate,
    ) -> Result<Option<FormSubmission>>;

    /// Create the lead, the optional call, and link the submission, all or nothing
    async fn commit_intake(&self, commit: IntakeCommit) -> Result<IntakeRecords>;
}

pub type SharedStorage = Arc<dyn Storage>;

/// Zero-based row offset for a 1-based page
pub(crate) fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit.max(0))
}
