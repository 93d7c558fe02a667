//! Domain models shared by the storage layer, the services and the HTTP API
//!
//! Entity structs (`Lead`, `Call`, ...) are what the store returns. `New*`
//! records carry everything needed to insert a row; `*Patch` records carry a
//! partial update where `None` leaves the stored value untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conventional lead status values (string-typed, not enforced)
pub mod lead_status {
    pub const NEW: &str = "new";
    pub const CONTACTED: &str = "contacted";
    pub const QUALIFIED: &str = "qualified";
    pub const IN_PROGRESS: &str = "in-progress";
    pub const WON: &str = "won";
}

/// Form submission processing states
pub mod submission_status {
    /// Persisted, not yet analyzed
    pub const NEW: &str = "new";
    /// Analyzed and turned into a lead
    pub const PROCESSED: &str = "processed";
    /// Analyzed and rejected as spam/scam
    pub const SPAM: &str = "spam";
    /// Model call failed; no lead created
    pub const ERROR: &str = "error";
}

/// Default call length in minutes
pub const DEFAULT_CALL_DURATION_MINUTES: i64 = 30;

// ============================================================================
// Users
// ============================================================================

/// Operator identity (no authentication semantics)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
}

// ============================================================================
// Leads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub project_type: String,
    pub budget: Option<i64>,
    pub timeline: Option<String>,
    pub source: String,
    pub source_icon: Option<String>,
    /// 0-100, clamped on every write
    pub score: i64,
    pub status: String,
    pub notes: Option<String>,
    pub ai_qualified: Option<bool>,
    pub ai_qualification_reason: Option<String>,
    pub ai_processed: bool,
    pub assigned_to: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal lead projection embedded in call listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub id: i64,
    pub name: String,
    pub project_type: String,
}

impl From<&Lead> for LeadSummary {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            name: lead.name.clone(),
            project_type: lead.project_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub project_type: String,
    pub budget: Option<i64>,
    pub timeline: Option<String>,
    pub source: String,
    pub source_icon: Option<String>,
    pub score: i64,
    pub status: String,
    pub notes: Option<String>,
    pub ai_qualified: Option<bool>,
    pub ai_qualification_reason: Option<String>,
    pub ai_processed: bool,
    pub assigned_to: Option<i64>,
}

/// Partial lead update
///
/// Nullable columns use `Option<Option<T>>`: an absent key leaves the column
/// alone, an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub company: Option<Option<String>>,
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub budget: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub timeline: Option<Option<String>>,
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub source_icon: Option<Option<String>>,
    pub score: Option<i64>,
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub ai_qualified: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub ai_qualification_reason: Option<Option<String>>,
    pub ai_processed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub assigned_to: Option<Option<i64>>,
}

impl LeadPatch {
    /// Apply the patch in place. Score is clamped to [0, 100].
    pub fn apply_to(&self, lead: &mut Lead) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<Option<T>>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut lead.name, &self.name);
        set(&mut lead.email, &self.email);
        set_opt(&mut lead.phone, &self.phone);
        set_opt(&mut lead.company, &self.company);
        set(&mut lead.project_type, &self.project_type);
        set_opt(&mut lead.budget, &self.budget);
        set_opt(&mut lead.timeline, &self.timeline);
        set(&mut lead.source, &self.source);
        set_opt(&mut lead.source_icon, &self.source_icon);
        if let Some(score) = self.score {
            lead.score = crate::scoring::clamp_score(score);
        }
        set(&mut lead.status, &self.status);
        set_opt(&mut lead.notes, &self.notes);
        set_opt(&mut lead.ai_qualified, &self.ai_qualified);
        set_opt(&mut lead.ai_qualification_reason, &self.ai_qualification_reason);
        set(&mut lead.ai_processed, &self.ai_processed);
        set_opt(&mut lead.assigned_to, &self.assigned_to);
    }
}

// ============================================================================
// Calls
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: i64,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: i64,
    pub lead_id: i64,
    pub scheduled_at: DateTime<Utc>,
    /// Minutes
    pub duration: i64,
    pub title: String,
    pub notes: Option<String>,
    pub completed: bool,
    pub attendees: Vec<Attendee>,
    pub ai_scheduled: bool,
    pub ai_summary: Option<String>,
    pub follow_up_needed: bool,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Call joined with the minimal summary of its lead
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallWithLead {
    #[serde(flatten)]
    pub call: Call,
    pub lead: Option<LeadSummary>,
}

/// Everything about a call except the lead it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct CallDraft {
    pub scheduled_at: DateTime<Utc>,
    pub duration: i64,
    pub title: String,
    pub notes: Option<String>,
    pub completed: bool,
    pub attendees: Vec<Attendee>,
    pub ai_scheduled: bool,
    pub follow_up_needed: bool,
    pub follow_up_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCall {
    pub lead_id: i64,
    pub details: CallDraft,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPatch {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
    pub attendees: Option<Vec<Attendee>>,
    pub ai_scheduled: Option<bool>,
    pub ai_summary: Option<String>,
    pub follow_up_needed: Option<bool>,
    pub follow_up_date: Option<DateTime<Utc>>,
}

impl CallPatch {
    pub fn apply_to(&self, call: &mut Call) {
        if let Some(v) = self.scheduled_at {
            call.scheduled_at = v;
        }
        if let Some(v) = self.duration {
            call.duration = v;
        }
        if let Some(v) = &self.title {
            call.title = v.clone();
        }
        if let Some(v) = &self.notes {
            call.notes = Some(v.clone());
        }
        if let Some(v) = self.completed {
            call.completed = v;
        }
        if let Some(v) = &self.attendees {
            call.attendees = v.clone();
        }
        if let Some(v) = self.ai_scheduled {
            call.ai_scheduled = v;
        }
        if let Some(v) = &self.ai_summary {
            call.ai_summary = Some(v.clone());
        }
        if let Some(v) = self.follow_up_needed {
            call.follow_up_needed = v;
        }
        if let Some(v) = self.follow_up_date {
            call.follow_up_date = Some(v);
        }
    }
}

// ============================================================================
// Catalog: project types and marketing channels
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub min_budget: Option<i64>,
    pub average_timeline: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProjectType {
    pub name: String,
    pub description: Option<String>,
    pub min_budget: Option<i64>,
    pub average_timeline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingChannel {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub active: bool,
    pub conversion_rate: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMarketingChannel {
    pub name: String,
    pub icon: String,
    pub active: bool,
    pub conversion_rate: Option<i64>,
}

// ============================================================================
// Form submissions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: i64,
    pub form_type: String,
    pub source: String,
    pub content: String,
    /// Entire submitted body, never modified after insert
    pub raw_data: serde_json::Value,
    pub lead_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub ai_processed: bool,
    pub ai_response: Option<serde_json::Value>,
    pub status: String,
    pub is_scam: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFormSubmission {
    pub form_type: String,
    pub source: String,
    pub content: String,
    pub raw_data: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Mutable processing fields of a submission; `raw_data` is not updatable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmissionUpdate {
    pub status: Option<String>,
    pub ai_processed: Option<bool>,
    pub ai_response: Option<serde_json::Value>,
    pub is_scam: Option<bool>,
    pub lead_id: Option<i64>,
}

impl FormSubmissionUpdate {
    pub fn apply_to(&self, submission: &mut FormSubmission) {
        if let Some(v) = &self.status {
            submission.status = v.clone();
        }
        if let Some(v) = self.ai_processed {
            submission.ai_processed = v;
        }
        if let Some(v) = &self.ai_response {
            submission.ai_response = Some(v.clone());
        }
        if let Some(v) = self.is_scam {
            submission.is_scam = v;
        }
        if let Some(v) = self.lead_id {
            submission.lead_id = Some(v);
        }
    }
}

/// Everything the intake pipeline writes once the model has qualified a submission
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeCommit {
    pub submission_id: i64,
    pub lead: NewLead,
    pub call: Option<CallDraft>,
    pub ai_response: serde_json::Value,
}

/// Rows written by a successful [`IntakeCommit`]
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeRecords {
    pub submission: FormSubmission,
    pub lead: Lead,
    pub call: Option<Call>,
}

// ============================================================================
// AI insights
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Quality,
    Schedule,
    Trend,
    Source,
    Opportunity,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Quality => "quality",
            InsightType::Schedule => "schedule",
            InsightType::Trend => "trend",
            InsightType::Source => "source",
            InsightType::Opportunity => "opportunity",
        }
    }
}

impl std::str::FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "quality" => Ok(InsightType::Quality),
            "schedule" => Ok(InsightType::Schedule),
            "trend" => Ok(InsightType::Trend),
            "source" => Ok(InsightType::Source),
            "opportunity" => Ok(InsightType::Opportunity),
            other => Err(format!("unknown insight type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsight {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub icon: String,
    pub action: Option<String>,
    pub action_url: Option<String>,
    pub related_leads: Vec<i64>,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAiInsight {
    pub title: String,
    pub description: String,
    pub insight_type: InsightType,
    pub icon: String,
    pub action: Option<String>,
    pub action_url: Option<String>,
    pub related_leads: Vec<i64>,
    pub priority: String,
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub change_percentage: Option<i64>,
    pub icon: Option<String>,
    pub period: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStat {
    pub name: String,
    pub value: String,
    pub change_percentage: Option<i64>,
    pub icon: Option<String>,
    pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatPatch {
    pub name: Option<String>,
    pub value: Option<String>,
    pub change_percentage: Option<i64>,
    pub icon: Option<String>,
    pub period: Option<String>,
}

impl StatPatch {
    pub fn apply_to(&self, stat: &mut Stat) {
        if let Some(v) = &self.name {
            stat.name = v.clone();
        }
        if let Some(v) = &self.value {
            stat.value = v.clone();
        }
        if let Some(v) = self.change_percentage {
            stat.change_percentage = Some(v);
        }
        if let Some(v) = &self.icon {
            stat.icon = Some(v.clone());
        }
        if let Some(v) = &self.period {
            stat.period = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lead() -> Lead {
        let now = Utc::now();
        Lead {
            id: 1,
            name: "Dana Whitfield".to_string(),
            email: "dana@example.com".to_string(),
            phone: None,
            company: None,
            project_type: "Commercial Office".to_string(),
            budget: None,
            timeline: None,
            source: "Referrals".to_string(),
            source_icon: None,
            score: 40,
            status: lead_status::NEW.to_string(),
            notes: None,
            ai_qualified: None,
            ai_qualification_reason: None,
            ai_processed: false,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lead_patch_only_touches_supplied_fields() {
        let mut lead = sample_lead();
        let patch = LeadPatch {
            status: Some(lead_status::CONTACTED.to_string()),
            phone: Some(Some("555-0100".to_string())),
            ..Default::default()
        };

        patch.apply_to(&mut lead);

        assert_eq!(lead.status, "contacted");
        assert_eq!(lead.phone.as_deref(), Some("555-0100"));
        assert_eq!(lead.name, "Dana Whitfield");
        assert_eq!(lead.score, 40);
    }

    #[test]
    fn test_lead_patch_null_clears_nullable_fields() {
        let mut lead = sample_lead();
        lead.phone = Some("555-0100".to_string());
        lead.notes = Some("Call after 3pm".to_string());

        let patch: LeadPatch = serde_json::from_value(serde_json::json!({
            "phone": null,
            "notes": "Prefers email"
        }))
        .unwrap();
        assert_eq!(patch.phone, Some(None));
        assert_eq!(patch.company, None);

        patch.apply_to(&mut lead);

        assert_eq!(lead.phone, None);
        assert_eq!(lead.notes.as_deref(), Some("Prefers email"));
        assert_eq!(lead.name, "Dana Whitfield");
    }

    #[test]
    fn test_lead_patch_clamps_score() {
        let mut lead = sample_lead();
        LeadPatch { score: Some(250), ..Default::default() }.apply_to(&mut lead);
        assert_eq!(lead.score, 100);

        LeadPatch { score: Some(-5), ..Default::default() }.apply_to(&mut lead);
        assert_eq!(lead.score, 0);
    }

    #[test]
    fn test_lead_serializes_camel_case() {
        let value = serde_json::to_value(sample_lead()).unwrap();
        assert_eq!(value["projectType"], "Commercial Office");
        assert_eq!(value["aiProcessed"], false);
        assert!(value.get("project_type").is_none());
    }

    #[test]
    fn test_insight_type_wire_names() {
        let value = serde_json::to_value(InsightType::Opportunity).unwrap();
        assert_eq!(value, "opportunity");
        assert_eq!("trend".parse::<InsightType>().unwrap(), InsightType::Trend);
        assert!("banana".parse::<InsightType>().is_err());
    }

    #[test]
    fn test_call_with_lead_flattens_call_fields() {
        let now = Utc::now();
        let call = Call {
            id: 7,
            lead_id: 1,
            scheduled_at: now,
            duration: DEFAULT_CALL_DURATION_MINUTES,
            title: "Site walk".to_string(),
            notes: None,
            completed: false,
            attendees: vec![Attendee { id: 1, name: "Mike".to_string(), role: "PM".to_string() }],
            ai_scheduled: false,
            ai_summary: None,
            follow_up_needed: false,
            follow_up_date: None,
            created_at: now,
            updated_at: now,
        };
        let joined = CallWithLead { call, lead: Some(LeadSummary::from(&sample_lead())) };

        let value = serde_json::to_value(joined).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["leadId"], 1);
        assert_eq!(value["lead"]["projectType"], "Commercial Office");
        assert_eq!(value["attendees"][0]["role"], "PM");
    }
}
