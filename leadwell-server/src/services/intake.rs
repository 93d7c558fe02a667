//! Form-submission intake and qualification
//!
//! The submission is stored first, exactly as received. The model then
//! extracts contact details and a qualification verdict. Depending on the
//! answer the submission ends up `error`, `spam` or `processed`; only the
//! last creates a lead (and possibly a call), and those writes go through
//! [`Storage::commit_intake`] as one unit.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use leadwell_common::models::{
    lead_status, submission_status, Call, CallDraft, FormSubmission, FormSubmissionUpdate,
    IntakeCommit, Lead, NewFormSubmission, NewLead, DEFAULT_CALL_DURATION_MINUTES,
};
use leadwell_common::scoring::score_from_f64;
use leadwell_common::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::reasoning_client::{request_structured, ReasoningClient, ResponseSchema};
use crate::storage::Storage;

/// Model scores strictly above this qualify a lead (compared before rounding)
pub const QUALIFICATION_THRESHOLD: f64 = 70.0;
/// Icon given to every lead created from a form
pub const INTAKE_SOURCE_ICON: &str = "ri-global-line";
/// Project types the model may classify into
pub const PROJECT_TYPES: [&str; 4] = [
    "Residential Renovation",
    "Commercial Office",
    "Industrial Facility",
    "Residential New Build",
];
/// Classification for anything outside [`PROJECT_TYPES`]
pub const OTHER_PROJECT_TYPE: &str = "Other";

/// Hours ahead a call is booked when the model gives no usable date
const FALLBACK_CALL_DELAY_HOURS: i64 = 24;

/// The model's reading of a form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeAnalysis {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub project_type: Option<String>,
    #[serde(deserialize_with = "lenient_budget")]
    pub budget: Option<i64>,
    pub timeline: Option<String>,
    pub qualification_score: Option<f64>,
    pub qualification_reason: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub schedule_call: bool,
    pub call_date: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_scam: bool,
    pub scam_reason: Option<String>,
}

impl ResponseSchema for IntakeAnalysis {
    fn validate(mut self) -> std::result::Result<Self, String> {
        if self.is_scam {
            return Ok(self);
        }

        self.name = non_blank(self.name.take());
        self.email = non_blank(self.email.take());
        if self.name.is_none() {
            return Err("name is required for a non-spam submission".to_string());
        }
        if self.email.is_none() {
            return Err("email is required for a non-spam submission".to_string());
        }

        if let Some(score) = self.qualification_score {
            if !score.is_finite() {
                return Err("qualificationScore must be a finite number".to_string());
            }
        }

        self.phone = non_blank(self.phone.take());
        self.company = non_blank(self.company.take());
        self.timeline = non_blank(self.timeline.take());
        self.project_type = Some(normalize_project_type(self.project_type.as_deref()));

        Ok(self)
    }
}

impl IntakeAnalysis {
    /// Rounded, clamped qualification score (missing counts as 0)
    pub fn score(&self) -> i64 {
        self.qualification_score.map(score_from_f64).unwrap_or(0)
    }

    /// Whether the raw model score clears the threshold
    pub fn qualifies(&self) -> bool {
        self.qualification_score
            .map_or(false, |score| score > QUALIFICATION_THRESHOLD)
    }
}

/// Qualification verdict returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualification {
    pub score: i64,
    pub qualified: bool,
    pub reason: Option<String>,
}

/// Result of running one submission through intake
#[derive(Debug, Clone)]
pub enum IntakeOutcome {
    /// A lead was created (and possibly a call)
    Qualified {
        submission: FormSubmission,
        lead: Lead,
        call: Option<Call>,
        qualification: Qualification,
    },
    /// The model flagged the submission; nothing else was written
    Spam {
        submission: FormSubmission,
        reason: Option<String>,
    },
    /// The model could not be reached or answered unusably
    AiError {
        submission: FormSubmission,
        error: String,
    },
}

impl IntakeOutcome {
    pub fn submission(&self) -> &FormSubmission {
        match self {
            IntakeOutcome::Qualified { submission, .. }
            | IntakeOutcome::Spam { submission, .. }
            | IntakeOutcome::AiError { submission, .. } => submission,
        }
    }
}

/// Persist a submission, analyze it and act on the verdict
pub async fn process_submission(
    storage: &dyn Storage,
    client: &dyn ReasoningClient,
    new: NewFormSubmission,
) -> Result<IntakeOutcome> {
    let submission = storage.create_form_submission(new).await?;
    let submission_id = submission.id;
    tracing::info!(submission_id, source = %submission.source, "Form submission stored");

    let analysis =
        match request_structured::<IntakeAnalysis>(client, &intake_prompt(&submission.content)).await {
            Ok((analysis, _)) => analysis,
            Err(e) => {
                tracing::warn!(submission_id, error = %e, "Form analysis failed");
                let update = FormSubmissionUpdate {
                    status: Some(submission_status::ERROR.to_string()),
                    ai_response: Some(json!({ "error": e.to_string() })),
                    ..Default::default()
                };
                let submission = updated(storage, submission_id, update).await?;
                return Ok(IntakeOutcome::AiError {
                    submission,
                    error: e.to_string(),
                });
            }
        };

    let ai_response = serde_json::to_value(&analysis)?;

    if analysis.is_scam {
        tracing::info!(
            submission_id,
            reason = analysis.scam_reason.as_deref().unwrap_or(""),
            "Form submission flagged as spam"
        );
        let update = FormSubmissionUpdate {
            status: Some(submission_status::SPAM.to_string()),
            ai_processed: Some(true),
            ai_response: Some(ai_response),
            is_scam: Some(true),
            lead_id: None,
        };
        let submission = updated(storage, submission_id, update).await?;
        return Ok(IntakeOutcome::Spam {
            submission,
            reason: analysis.scam_reason,
        });
    }

    let score = analysis.score();
    let qualified = analysis.qualifies();
    let lead = lead_from_analysis(&analysis, &submission.source, score, qualified);
    let call = analysis
        .schedule_call
        .then(|| call_from_analysis(&analysis, Utc::now()));

    let records = storage
        .commit_intake(IntakeCommit {
            submission_id,
            lead,
            call,
            ai_response,
        })
        .await?;

    tracing::info!(
        submission_id,
        lead_id = records.lead.id,
        score,
        qualified,
        call_scheduled = records.call.is_some(),
        "Form submission converted to lead"
    );

    Ok(IntakeOutcome::Qualified {
        submission: records.submission,
        lead: records.lead,
        call: records.call,
        qualification: Qualification {
            score,
            qualified,
            reason: analysis.qualification_reason,
        },
    })
}

async fn updated(
    storage: &dyn Storage,
    id: i64,
    update: FormSubmissionUpdate,
) -> Result<FormSubmission> {
    storage
        .update_form_submission(id, update)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Form submission {}", id)))
}

fn lead_from_analysis(
    analysis: &IntakeAnalysis,
    source: &str,
    score: i64,
    qualified: bool,
) -> NewLead {
    NewLead {
        name: analysis.name.clone().unwrap_or_default(),
        email: analysis.email.clone().unwrap_or_default(),
        phone: analysis.phone.clone(),
        company: analysis.company.clone(),
        project_type: project_type_label(analysis).to_string(),
        budget: analysis.budget,
        timeline: analysis.timeline.clone(),
        source: source.to_string(),
        source_icon: Some(INTAKE_SOURCE_ICON.to_string()),
        score,
        status: if qualified {
            lead_status::QUALIFIED
        } else {
            lead_status::NEW
        }
        .to_string(),
        notes: None,
        ai_qualified: Some(qualified),
        ai_qualification_reason: analysis.qualification_reason.clone(),
        ai_processed: true,
        assigned_to: None,
    }
}

fn call_from_analysis(analysis: &IntakeAnalysis, now: DateTime<Utc>) -> CallDraft {
    let project_type = project_type_label(analysis);
    let budget = analysis
        .budget
        .map(|b| format!("${}", b))
        .unwrap_or_else(|| "not specified".to_string());
    let timeline = analysis.timeline.as_deref().unwrap_or("not specified");

    CallDraft {
        scheduled_at: resolve_call_date(analysis.call_date.as_deref(), now),
        duration: DEFAULT_CALL_DURATION_MINUTES,
        title: format!("Initial Consultation - {}", project_type),
        notes: Some(format!(
            "Auto-scheduled from form submission. Project details: {}, Budget: {}, Timeline: {}",
            project_type, budget, timeline
        )),
        completed: false,
        attendees: Vec::new(),
        ai_scheduled: true,
        follow_up_needed: false,
        follow_up_date: None,
    }
}

fn project_type_label(analysis: &IntakeAnalysis) -> &str {
    analysis.project_type.as_deref().unwrap_or(OTHER_PROJECT_TYPE)
}

/// Map free text onto the project-type taxonomy, case-insensitively
pub fn normalize_project_type(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default().trim();
    PROJECT_TYPES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(raw))
        .copied()
        .unwrap_or(OTHER_PROJECT_TYPE)
        .to_string()
}

/// Parse the suggested call time, falling back to `now + 24h`
///
/// Accepts RFC 3339, or a date-time without offset (read as UTC).
pub fn resolve_call_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let fallback = now + Duration::hours(FALLBACK_CALL_DELAY_HOURS);
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return fallback;
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc();
        }
    }

    tracing::debug!(call_date = raw, "Unparseable call date, using fallback");
    fallback
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Budget as a number, a numeric string (`"$45,000"`) or null
fn lenient_budget<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64),
        Some(Value::String(s)) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            digits.parse::<f64>().ok().map(|f| f.round() as i64)
        }
        _ => None,
    })
}

/// Boolean that treats null as false
fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn intake_prompt(content: &str) -> String {
    format!(
        "You are an AI assistant for a construction company. Analyze this form submission:\n\n\
         Form content: {}\n\n\
         Extract the following information in JSON format:\n\
         1. Customer name\n\
         2. Email address\n\
         3. Phone number\n\
         4. Company name\n\
         5. Project type (classify as: {}, or {})\n\
         6. Budget estimate (number in dollars)\n\
         7. Timeline (when they want to start the project)\n\
         8. A qualification score from 0-100 (how qualified this lead is)\n\
         9. Explanation for qualification score\n\
         10. Schedule a call? (true/false - should we schedule a follow-up call?)\n\
         11. Suggested call date (provide specific date and time if a call is recommended)\n\
         12. Is this possibly a scam or spam? (true/false)\n\
         13. Reason for scam/spam classification\n\n\
         Respond in this JSON format:\n\
         {{\n\
           \"name\": string,\n\
           \"email\": string,\n\
           \"phone\": string,\n\
           \"company\": string,\n\
           \"projectType\": string,\n\
           \"budget\": number,\n\
           \"timeline\": string,\n\
           \"qualificationScore\": number,\n\
           \"qualificationReason\": string,\n\
           \"scheduleCall\": boolean,\n\
           \"callDate\": string (ISO 8601),\n\
           \"isScam\": boolean,\n\
           \"scamReason\": string\n\
         }}",
        content,
        PROJECT_TYPES.join(", "),
        OTHER_PROJECT_TYPE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn analysis(value: Value) -> std::result::Result<IntakeAnalysis, String> {
        let parsed: IntakeAnalysis = serde_json::from_value(value).map_err(|e| e.to_string())?;
        parsed.validate()
    }

    #[test]
    fn test_project_type_normalization() {
        assert_eq!(normalize_project_type(Some("Commercial Office")), "Commercial Office");
        assert_eq!(normalize_project_type(Some("  industrial facility ")), "Industrial Facility");
        assert_eq!(normalize_project_type(Some("Swimming Pool")), "Other");
        assert_eq!(normalize_project_type(None), "Other");
    }

    #[test]
    fn test_call_date_parsing_and_fallback() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();

        let exact = resolve_call_date(Some("2026-05-06T15:30:00Z"), now);
        assert_eq!(exact, Utc.with_ymd_and_hms(2026, 5, 6, 15, 30, 0).unwrap());

        let offset = resolve_call_date(Some("2026-05-06T10:00:00-05:00"), now);
        assert_eq!(offset, Utc.with_ymd_and_hms(2026, 5, 6, 15, 0, 0).unwrap());

        let naive = resolve_call_date(Some("2026-05-07T09:00:00"), now);
        assert_eq!(naive, Utc.with_ymd_and_hms(2026, 5, 7, 9, 0, 0).unwrap());

        let fallback = now + Duration::hours(24);
        assert_eq!(resolve_call_date(Some("next Tuesday-ish"), now), fallback);
        assert_eq!(resolve_call_date(Some(""), now), fallback);
        assert_eq!(resolve_call_date(None, now), fallback);
    }

    #[test]
    fn test_non_spam_requires_name_and_email() {
        let missing_email = analysis(json!({ "name": "Jo", "qualificationScore": 80 }));
        assert!(missing_email.unwrap_err().contains("email"));

        let blank_name = analysis(json!({ "name": "  ", "email": "jo@example.com" }));
        assert!(blank_name.unwrap_err().contains("name"));
    }

    #[test]
    fn test_spam_skips_contact_checks() {
        let spam = analysis(json!({ "isScam": true, "scamReason": "crypto offer" })).unwrap();
        assert!(spam.is_scam);
        assert!(spam.name.is_none());
    }

    #[test]
    fn test_budget_accepts_numbers_and_money_strings() {
        let a = analysis(json!({ "name": "A", "email": "a@x.com", "budget": 45000 })).unwrap();
        assert_eq!(a.budget, Some(45000));

        let b = analysis(json!({ "name": "B", "email": "b@x.com", "budget": "$1,250,000" })).unwrap();
        assert_eq!(b.budget, Some(1_250_000));

        let c = analysis(json!({ "name": "C", "email": "c@x.com", "budget": "unknown" })).unwrap();
        assert_eq!(c.budget, None);
    }

    #[test]
    fn test_score_rounds_and_clamps() {
        let a = analysis(json!({ "name": "A", "email": "a@x.com", "qualificationScore": 70.6 })).unwrap();
        assert_eq!(a.score(), 71);

        let b = analysis(json!({ "name": "B", "email": "b@x.com", "qualificationScore": 140 })).unwrap();
        assert_eq!(b.score(), 100);

        let c = analysis(json!({ "name": "C", "email": "c@x.com" })).unwrap();
        assert_eq!(c.score(), 0);
    }

    #[test]
    fn test_threshold_uses_unrounded_score() {
        let above = analysis(json!({ "name": "A", "email": "a@x.com", "qualificationScore": 70.4 })).unwrap();
        assert!(above.qualifies());
        assert_eq!(above.score(), 70);

        let at = analysis(json!({ "name": "B", "email": "b@x.com", "qualificationScore": 70 })).unwrap();
        assert!(!at.qualifies());

        let missing = analysis(json!({ "name": "C", "email": "c@x.com" })).unwrap();
        assert!(!missing.qualifies());
    }

    #[test]
    fn test_null_flags_read_as_false() {
        let a = analysis(json!({
            "name": "A",
            "email": "a@x.com",
            "qualificationScore": 85,
            "scheduleCall": null,
            "isScam": null
        }))
        .unwrap();
        assert!(!a.schedule_call);
        assert!(!a.is_scam);
        assert!(a.qualifies());
    }

    #[test]
    fn test_call_draft_from_analysis() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        let a = analysis(json!({
            "name": "A",
            "email": "a@x.com",
            "projectType": "Commercial Office",
            "budget": 250000,
            "timeline": "Q3",
            "scheduleCall": true,
            "callDate": "not a date"
        }))
        .unwrap();

        let call = call_from_analysis(&a, now);

        assert_eq!(call.title, "Initial Consultation - Commercial Office");
        assert_eq!(call.duration, 30);
        assert!(call.ai_scheduled);
        assert_eq!(call.scheduled_at, now + Duration::hours(24));
        assert_eq!(
            call.notes.as_deref(),
            Some("Auto-scheduled from form submission. Project details: Commercial Office, Budget: $250000, Timeline: Q3")
        );
    }

    #[test]
    fn test_lead_from_analysis_threshold_fields() {
        let a = analysis(json!({ "name": "A", "email": "a@x.com", "qualificationReason": "solid" })).unwrap();

        let lead = lead_from_analysis(&a, "website", 71, true);
        assert_eq!(lead.status, "qualified");
        assert_eq!(lead.ai_qualified, Some(true));
        assert_eq!(lead.source, "website");
        assert_eq!(lead.source_icon.as_deref(), Some(INTAKE_SOURCE_ICON));
        assert_eq!(lead.project_type, "Other");
        assert!(lead.ai_processed);

        let lead = lead_from_analysis(&a, "website", 70, false);
        assert_eq!(lead.status, "new");
        assert_eq!(lead.ai_qualified, Some(false));
    }

    #[test]
    fn test_prompt_lists_taxonomy() {
        let prompt = intake_prompt("Need a warehouse fit-out");
        assert!(prompt.contains("Form content: Need a warehouse fit-out"));
        assert!(prompt.contains("Residential Renovation, Commercial Office, Industrial Facility, Residential New Build, or Other"));
    }
}
