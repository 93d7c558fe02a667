//! In-memory storage
//!
//! Every table is a `BTreeMap` keyed by an incrementing integer id, all behind
//! one `RwLock`. Nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadwell_common::models::{
    AiInsight, Call, CallPatch, FormSubmission, FormSubmissionUpdate, IntakeCommit,
    IntakeRecords, Lead, LeadPatch, MarketingChannel, NewAiInsight, NewCall,
    NewFormSubmission, NewLead, NewMarketingChannel, NewProjectType, NewStat, NewUser,
    ProjectType, Stat, StatPatch, User, submission_status,
};
use leadwell_common::scoring::clamp_score;
use leadwell_common::{Error, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{page_offset, Page, Storage};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    leads: BTreeMap<i64, Lead>,
    calls: BTreeMap<i64, Call>,
    project_types: BTreeMap<i64, ProjectType>,
    marketing_channels: BTreeMap<i64, MarketingChannel>,
    insights: BTreeMap<i64, AiInsight>,
    stats: BTreeMap<i64, Stat>,
    form_submissions: BTreeMap<i64, FormSubmission>,
}

impl Tables {
    /// Ids are unique across tables, which keeps them strictly increasing per table
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_lead(&mut self, new: NewLead, now: DateTime<Utc>) -> Lead {
        let id = self.allocate_id();
        let lead = Lead {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            company: new.company,
            project_type: new.project_type,
            budget: new.budget,
            timeline: new.timeline,
            source: new.source,
            source_icon: new.source_icon,
            score: clamp_score(new.score),
            status: new.status,
            notes: new.notes,
            ai_qualified: new.ai_qualified,
            ai_qualification_reason: new.ai_qualification_reason,
            ai_processed: new.ai_processed,
            assigned_to: new.assigned_to,
            created_at: now,
            updated_at: now,
        };
        self.leads.insert(id, lead.clone());
        lead
    }

    fn insert_call(&mut self, new: NewCall, now: DateTime<Utc>) -> Result<Call> {
        if !self.leads.contains_key(&new.lead_id) {
            return Err(Error::InvalidInput(format!(
                "Lead {} does not exist",
                new.lead_id
            )));
        }

        let id = self.allocate_id();
        let details = new.details;
        let call = Call {
            id,
            lead_id: new.lead_id,
            scheduled_at: details.scheduled_at,
            duration: details.duration,
            title: details.title,
            notes: details.notes,
            completed: details.completed,
            attendees: details.attendees,
            ai_scheduled: details.ai_scheduled,
            ai_summary: None,
            follow_up_needed: details.follow_up_needed,
            follow_up_date: details.follow_up_date,
            created_at: now,
            updated_at: now,
        };
        self.calls.insert(id, call.clone());
        Ok(call)
    }
}

/// Process-local storage backend
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(rows_newest_first: Vec<&T>, page: i64, limit: i64) -> Page<T> {
    let total = rows_newest_first.len() as i64;
    let offset = page_offset(page, limit).max(0) as usize;
    let items = rows_newest_first
        .into_iter()
        .skip(offset)
        .take(limit.max(0) as usize)
        .cloned()
        .collect();
    Page { items, total }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == new.username) {
            return Err(Error::InvalidInput(format!(
                "Username '{}' is already taken",
                new.username
            )));
        }

        let id = tables.allocate_id();
        let user = User {
            id,
            username: new.username,
            name: new.name,
            role: new.role,
            email: new.email,
            phone: new.phone,
            job_title: new.job_title,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_leads(&self, page: i64, limit: i64) -> Result<Page<Lead>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.leads.values().rev().collect(), page, limit))
    }

    async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        Ok(self.tables.read().await.leads.get(&id).cloned())
    }

    async fn create_lead(&self, new: NewLead) -> Result<Lead> {
        let mut tables = self.tables.write().await;
        Ok(tables.insert_lead(new, Utc::now()))
    }

    async fn update_lead(&self, id: i64, patch: LeadPatch) -> Result<Option<Lead>> {
        let mut tables = self.tables.write().await;
        Ok(tables.leads.get_mut(&id).map(|lead| {
            patch.apply_to(lead);
            lead.updated_at = Utc::now();
            lead.clone()
        }))
    }

    async fn list_calls(&self, upcoming_after: Option<DateTime<Utc>>) -> Result<Vec<Call>> {
        let tables = self.tables.read().await;
        let mut calls: Vec<Call> = tables
            .calls
            .values()
            .filter(|call| match upcoming_after {
                Some(now) => call.scheduled_at >= now && !call.completed,
                None => true,
            })
            .cloned()
            .collect();
        calls.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        Ok(calls)
    }

    async fn get_call(&self, id: i64) -> Result<Option<Call>> {
        Ok(self.tables.read().await.calls.get(&id).cloned())
    }

    async fn create_call(&self, new: NewCall) -> Result<Call> {
        let mut tables = self.tables.write().await;
        tables.insert_call(new, Utc::now())
    }

    async fn update_call(&self, id: i64, patch: CallPatch) -> Result<Option<Call>> {
        let mut tables = self.tables.write().await;
        Ok(tables.calls.get_mut(&id).map(|call| {
            patch.apply_to(call);
            call.updated_at = Utc::now();
            call.clone()
        }))
    }

    async fn list_project_types(&self) -> Result<Vec<ProjectType>> {
        Ok(self.tables.read().await.project_types.values().cloned().collect())
    }

    async fn create_project_type(&self, new: NewProjectType) -> Result<ProjectType> {
        let mut tables = self.tables.write().await;
        if tables.project_types.values().any(|p| p.name == new.name) {
            return Err(Error::InvalidInput(format!(
                "Project type '{}' already exists",
                new.name
            )));
        }

        let id = tables.allocate_id();
        let project_type = ProjectType {
            id,
            name: new.name,
            description: new.description,
            min_budget: new.min_budget,
            average_timeline: new.average_timeline,
            created_at: Utc::now(),
        };
        tables.project_types.insert(id, project_type.clone());
        Ok(project_type)
    }

    async fn list_marketing_channels(&self) -> Result<Vec<MarketingChannel>> {
        Ok(self.tables.read().await.marketing_channels.values().cloned().collect())
    }

    async fn create_marketing_channel(&self, new: NewMarketingChannel) -> Result<MarketingChannel> {
        let mut tables = self.tables.write().await;
        if tables.marketing_channels.values().any(|c| c.name == new.name) {
            return Err(Error::InvalidInput(format!(
                "Marketing channel '{}' already exists",
                new.name
            )));
        }

        let id = tables.allocate_id();
        let channel = MarketingChannel {
            id,
            name: new.name,
            icon: new.icon,
            active: new.active,
            conversion_rate: new.conversion_rate,
            created_at: Utc::now(),
        };
        tables.marketing_channels.insert(id, channel.clone());
        Ok(channel)
    }

    async fn list_insights(&self) -> Result<Vec<AiInsight>> {
        Ok(self.tables.read().await.insights.values().rev().cloned().collect())
    }

    async fn create_insight(&self, new: NewAiInsight) -> Result<AiInsight> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let insight = AiInsight {
            id,
            title: new.title,
            description: new.description,
            insight_type: new.insight_type,
            icon: new.icon,
            action: new.action,
            action_url: new.action_url,
            related_leads: new.related_leads,
            priority: new.priority,
            created_at: Utc::now(),
            read: false,
        };
        tables.insights.insert(id, insight.clone());
        Ok(insight)
    }

    async fn mark_insight_read(&self, id: i64) -> Result<Option<AiInsight>> {
        let mut tables = self.tables.write().await;
        Ok(tables.insights.get_mut(&id).map(|insight| {
            insight.read = true;
            insight.clone()
        }))
    }

    async fn list_stats(&self, period: &str) -> Result<Vec<Stat>> {
        let tables = self.tables.read().await;
        Ok(tables
            .stats
            .values()
            .filter(|stat| stat.period == period)
            .cloned()
            .collect())
    }

    async fn create_stat(&self, new: NewStat) -> Result<Stat> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let now = Utc::now();
        let stat = Stat {
            id,
            name: new.name,
            value: new.value,
            change_percentage: new.change_percentage,
            icon: new.icon,
            period: new.period,
            created_at: now,
            updated_at: now,
        };
        tables.stats.insert(id, stat.clone());
        Ok(stat)
    }

    async fn update_stat(&self, id: i64, patch: StatPatch) -> Result<Option<Stat>> {
        let mut tables = self.tables.write().await;
        Ok(tables.stats.get_mut(&id).map(|stat| {
            patch.apply_to(stat);
            stat.updated_at = Utc::now();
            stat.clone()
        }))
    }

    async fn list_form_submissions(&self, page: i64, limit: i64) -> Result<Page<FormSubmission>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.form_submissions.values().rev().collect(), page, limit))
    }

    async fn get_form_submission(&self, id: i64) -> Result<Option<FormSubmission>> {
        Ok(self.tables.read().await.form_submissions.get(&id).cloned())
    }

    async fn create_form_submission(&self, new: NewFormSubmission) -> Result<FormSubmission> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let now = Utc::now();
        let submission = FormSubmission {
            id,
            form_type: new.form_type,
            source: new.source,
            content: new.content,
            raw_data: new.raw_data,
            lead_id: None,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            ai_processed: false,
            ai_response: None,
            status: submission_status::NEW.to_string(),
            is_scam: false,
            created_at: now,
            updated_at: now,
        };
        tables.form_submissions.insert(id, submission.clone());
        Ok(submission)
    }

    async fn update_form_submission(
        &self,
        id: i64,
        update: FormSubmissionUpdate,
    ) -> Result<Option<FormSubmission>> {
        let mut tables = self.tables.write().await;
        Ok(tables.form_submissions.get_mut(&id).map(|submission| {
            update.apply_to(submission);
            submission.updated_at = Utc::now();
            submission.clone()
        }))
    }

    async fn commit_intake(&self, commit: IntakeCommit) -> Result<IntakeRecords> {
        let mut tables = self.tables.write().await;

        // Check everything that can fail before the first mutation
        if !tables.form_submissions.contains_key(&commit.submission_id) {
            return Err(Error::NotFound(format!(
                "Form submission {}",
                commit.submission_id
            )));
        }

        let now = Utc::now();
        let lead = tables.insert_lead(commit.lead, now);
        let call = match commit.call {
            Some(details) => Some(tables.insert_call(
                NewCall {
                    lead_id: lead.id,
                    details,
                },
                now,
            )?),
            None => None,
        };

        let submission = tables
            .form_submissions
            .get_mut(&commit.submission_id)
            .map(|submission| {
                FormSubmissionUpdate {
                    status: Some(submission_status::PROCESSED.to_string()),
                    ai_processed: Some(true),
                    ai_response: Some(commit.ai_response),
                    is_scam: Some(false),
                    lead_id: Some(lead.id),
                }
                .apply_to(submission);
                submission.updated_at = now;
                submission.clone()
            })
            .ok_or_else(|| Error::Internal("Form submission vanished mid-commit".to_string()))?;

        Ok(IntakeRecords {
            submission,
            lead,
            call,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadwell_common::models::{CallDraft, lead_status, DEFAULT_CALL_DURATION_MINUTES};

    fn new_lead(name: &str) -> NewLead {
        NewLead {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            company: None,
            project_type: "Commercial Office".to_string(),
            budget: None,
            timeline: None,
            source: "Website".to_string(),
            source_icon: None,
            score: 150,
            status: lead_status::NEW.to_string(),
            notes: None,
            ai_qualified: None,
            ai_qualification_reason: None,
            ai_processed: false,
            assigned_to: None,
        }
    }

    fn draft(offset_hours: i64) -> CallDraft {
        CallDraft {
            scheduled_at: Utc::now() + chrono::Duration::hours(offset_hours),
            duration: DEFAULT_CALL_DURATION_MINUTES,
            title: "Consult".to_string(),
            notes: None,
            completed: false,
            attendees: Vec::new(),
            ai_scheduled: false,
            follow_up_needed: false,
            follow_up_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_lead_clamps_score_and_assigns_ids() {
        let storage = MemoryStorage::new();

        let a = storage.create_lead(new_lead("Alpha")).await.unwrap();
        let b = storage.create_lead(new_lead("Beta")).await.unwrap();

        assert_eq!(a.score, 100);
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_list_leads_newest_first_with_past_end_page() {
        let storage = MemoryStorage::new();
        for i in 0..24 {
            storage.create_lead(new_lead(&format!("Lead{}", i))).await.unwrap();
        }

        let first = storage.list_leads(1, 10).await.unwrap();
        assert_eq!(first.total, 24);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].name, "Lead23");

        let third = storage.list_leads(3, 10).await.unwrap();
        assert_eq!(third.items.len(), 4);

        let fourth = storage.list_leads(4, 10).await.unwrap();
        assert!(fourth.items.is_empty());
        assert_eq!(fourth.total, 24);
    }

    #[tokio::test]
    async fn test_create_call_requires_existing_lead() {
        let storage = MemoryStorage::new();

        let result = storage
            .create_call(NewCall { lead_id: 999, details: draft(1) })
            .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(storage.list_calls(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_calls_filter() {
        let storage = MemoryStorage::new();
        let lead = storage.create_lead(new_lead("Gamma")).await.unwrap();

        let past = storage.create_call(NewCall { lead_id: lead.id, details: draft(-2) }).await.unwrap();
        let later = storage.create_call(NewCall { lead_id: lead.id, details: draft(48) }).await.unwrap();
        let soon = storage.create_call(NewCall { lead_id: lead.id, details: draft(2) }).await.unwrap();
        let mut done = draft(5);
        done.completed = true;
        storage.create_call(NewCall { lead_id: lead.id, details: done }).await.unwrap();

        let upcoming = storage.list_calls(Some(Utc::now())).await.unwrap();
        let ids: Vec<i64> = upcoming.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![soon.id, later.id]);

        let all = storage.list_calls(None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, past.id);
    }

    #[tokio::test]
    async fn test_commit_intake_unknown_submission_writes_nothing() {
        let storage = MemoryStorage::new();

        let result = storage
            .commit_intake(IntakeCommit {
                submission_id: 42,
                lead: new_lead("Delta"),
                call: Some(draft(24)),
                ai_response: serde_json::json!({}),
            })
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(storage.list_leads(1, 10).await.unwrap().total, 0);
        assert!(storage.list_calls(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_project_type_rejected() {
        let storage = MemoryStorage::new();
        let new = NewProjectType {
            name: "Commercial Office".to_string(),
            description: None,
            min_budget: None,
            average_timeline: None,
        };

        storage.create_project_type(new.clone()).await.unwrap();
        let second = storage.create_project_type(new).await;

        assert!(matches!(second, Err(Error::InvalidInput(_))));
    }
}
