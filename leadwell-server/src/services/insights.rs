//! Insight generation over recent leads
//!
//! Heuristic insights are always produced (top source, qualification rate,
//! top project type). Up to three model-written insights are appended when
//! the model answers with a usable batch; a model failure only means fewer
//! insights, never an error.

use leadwell_common::models::{AiInsight, InsightType, Lead, NewAiInsight};
use leadwell_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::reasoning_client::{request_structured, ReasoningClient, ResponseSchema};
use crate::storage::Storage;

/// Most recent leads considered
pub const INSIGHT_WINDOW: i64 = 100;
/// Leads shown to the model
pub const MODEL_SAMPLE_SIZE: usize = 10;
/// Model insights kept per run
pub const MAX_MODEL_INSIGHTS: usize = 3;
/// Score at or above which a lead counts as qualified for the rate insight
pub const QUALIFIED_SCORE: i64 = 70;

pub const DEFAULT_PRIORITY: &str = "medium";

const MODEL_TYPES: [InsightType; 4] = [
    InsightType::Trend,
    InsightType::Quality,
    InsightType::Schedule,
    InsightType::Opportunity,
];
const MODEL_ICONS: [&str; 4] = [
    "ri-robot-line",
    "ri-calendar-check-line",
    "ri-building-line",
    "ri-line-chart-line",
];

/// One insight as written by the model
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInsight {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub icon: String,
}

/// `{"insights": [...]}` or a bare array
///
/// Items stay raw until validation so one out-of-schema item cannot sink the
/// rest of the batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InsightBatch {
    Wrapped { insights: Vec<Value> },
    Bare(Vec<Value>),
}

impl InsightBatch {
    fn into_items(self) -> Vec<Value> {
        match self {
            InsightBatch::Wrapped { insights } | InsightBatch::Bare(insights) => insights,
        }
    }

    /// Items that parse as model insights, in batch order
    pub fn into_insights(self) -> Vec<ModelInsight> {
        self.into_items()
            .into_iter()
            .filter_map(|item| serde_json::from_value::<ModelInsight>(item).ok())
            .collect()
    }
}

fn usable_insight(item: &Value) -> bool {
    let insight = match serde_json::from_value::<ModelInsight>(item.clone()) {
        Ok(insight) => insight,
        Err(e) => {
            tracing::debug!(error = %e, "Dropping unparseable model insight");
            return false;
        }
    };

    let usable = !insight.title.trim().is_empty()
        && !insight.description.trim().is_empty()
        && MODEL_TYPES.contains(&insight.insight_type)
        && MODEL_ICONS.contains(&insight.icon.as_str());
    if !usable {
        tracing::debug!(title = %insight.title, "Dropping out-of-schema model insight");
    }
    usable
}

impl ResponseSchema for InsightBatch {
    fn validate(self) -> std::result::Result<Self, String> {
        let insights: Vec<Value> = self
            .into_items()
            .into_iter()
            .filter(usable_insight)
            .take(MAX_MODEL_INSIGHTS)
            .collect();

        Ok(InsightBatch::Wrapped { insights })
    }
}

/// Generate, persist and return insights for the recent lead window
///
/// No leads means no insights and nothing stored.
pub async fn generate_insights(
    storage: &dyn Storage,
    client: &dyn ReasoningClient,
) -> Result<Vec<AiInsight>> {
    let leads = storage.list_leads(1, INSIGHT_WINDOW).await?.items;
    if leads.is_empty() {
        tracing::info!("No leads yet, skipping insight generation");
        return Ok(Vec::new());
    }

    let mut drafts = heuristic_insights(&leads);
    let heuristic_count = drafts.len();

    match request_structured::<InsightBatch>(client, &insight_prompt(&leads)?).await {
        Ok((batch, _)) => drafts.extend(batch.into_insights().into_iter().map(from_model)),
        Err(e) => tracing::warn!(error = %e, "Model insight generation failed, keeping heuristic insights"),
    }

    let mut stored = Vec::with_capacity(drafts.len());
    for draft in drafts {
        stored.push(storage.create_insight(draft).await?);
    }

    tracing::info!(
        leads = leads.len(),
        heuristic = heuristic_count,
        model = stored.len() - heuristic_count,
        "Insights generated"
    );
    Ok(stored)
}

/// Deterministic insights from lead counts
pub fn heuristic_insights(leads: &[Lead]) -> Vec<NewAiInsight> {
    if leads.is_empty() {
        return Vec::new();
    }

    let mut insights = Vec::with_capacity(3);

    if let Some(top) = top_by(leads, |lead| lead.source.as_str()) {
        insights.push(NewAiInsight {
            title: format!("{} is Your Top Lead Source", top.name),
            description: format!(
                "{} has generated {} leads ({}% of total). Focus more resources on this channel.",
                top.name, top.count, top.percentage
            ),
            insight_type: InsightType::Source,
            icon: "ri-line-chart-line".to_string(),
            action: Some("Optimize Channel".to_string()),
            action_url: Some(format!("/marketing/{}", top.name.to_lowercase())),
            related_leads: top.lead_ids,
            priority: DEFAULT_PRIORITY.to_string(),
        });
    }

    let qualified = leads.iter().filter(|lead| lead.score >= QUALIFIED_SCORE).count();
    let rate = qualified as f64 / leads.len() as f64 * 100.0;
    let verdict = if rate > 50.0 {
        "Great job!"
    } else {
        "This is below industry average. Review your lead sources."
    };
    insights.push(NewAiInsight {
        title: "Lead Qualification Rate".to_string(),
        description: format!("Your lead qualification rate is {:.1}%. {}", rate, verdict),
        insight_type: InsightType::Quality,
        icon: "ri-shield-check-line".to_string(),
        action: Some("Improve Quality".to_string()),
        action_url: Some("/leads/quality".to_string()),
        related_leads: Vec::new(),
        priority: DEFAULT_PRIORITY.to_string(),
    });

    if let Some(top) = top_by(leads, |lead| lead.project_type.as_str()) {
        insights.push(NewAiInsight {
            title: "Popular Project Type".to_string(),
            description: format!(
                "{} is your most requested project type ({}%). Consider creating specialized workflows for these projects.",
                top.name, top.percentage
            ),
            insight_type: InsightType::Trend,
            icon: "ri-building-line".to_string(),
            action: Some("Create Workflow".to_string()),
            action_url: Some("/workflows/new".to_string()),
            related_leads: top.lead_ids,
            priority: DEFAULT_PRIORITY.to_string(),
        });
    }

    insights
}

struct TopGroup {
    name: String,
    count: usize,
    percentage: i64,
    lead_ids: Vec<i64>,
}

/// Largest group by key; ties go to the alphabetically first key
fn top_by<'a>(leads: &'a [Lead], key: impl Fn(&'a Lead) -> &'a str) -> Option<TopGroup> {
    let mut groups: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for lead in leads {
        groups.entry(key(lead)).or_default().push(lead.id);
    }

    let mut best: Option<(&str, Vec<i64>)> = None;
    for (name, ids) in groups {
        let better = best.as_ref().map_or(true, |(_, top)| ids.len() > top.len());
        if better {
            best = Some((name, ids));
        }
    }

    best.map(|(name, lead_ids)| TopGroup {
        name: name.to_string(),
        count: lead_ids.len(),
        percentage: (lead_ids.len() as f64 / leads.len() as f64 * 100.0).round() as i64,
        lead_ids,
    })
}

fn from_model(insight: ModelInsight) -> NewAiInsight {
    NewAiInsight {
        action_url: Some(format!("/insights/{}", insight.insight_type.as_str())),
        title: insight.title,
        description: insight.description,
        insight_type: insight.insight_type,
        icon: insight.icon,
        action: Some("View Details".to_string()),
        related_leads: Vec::new(),
        priority: DEFAULT_PRIORITY.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadSample<'a> {
    name: &'a str,
    email: &'a str,
    source: &'a str,
    project_type: &'a str,
    score: i64,
    status: &'a str,
    created_at: String,
}

fn insight_prompt(leads: &[Lead]) -> Result<String> {
    let sample: Vec<LeadSample<'_>> = leads
        .iter()
        .take(MODEL_SAMPLE_SIZE)
        .map(|lead| LeadSample {
            name: &lead.name,
            email: &lead.email,
            source: &lead.source,
            project_type: &lead.project_type,
            score: lead.score,
            status: &lead.status,
            created_at: lead.created_at.to_rfc3339(),
        })
        .collect();

    Ok(format!(
        "You are an expert AI assistant for a construction lead management platform. Analyze the following lead data:\n\n\
         {}\n\n\
         Analyze this data and provide {} key insights about:\n\
         1. Lead trends (sources, project types, etc.)\n\
         2. Conversion opportunities\n\
         3. Process improvement suggestions\n\n\
         Format each insight as a JSON object with:\n\
         - title (short and attention-grabbing)\n\
         - description (2-3 sentences with specific data points)\n\
         - type (choose one: trend, quality, schedule, opportunity)\n\
         - icon (choose one: {})\n\n\
         Respond with a JSON object of the form {{\"insights\": [...]}} holding exactly {} insight objects.",
        serde_json::to_string_pretty(&sample)?,
        MAX_MODEL_INSIGHTS,
        MODEL_ICONS.join(", "),
        MAX_MODEL_INSIGHTS,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadwell_common::models::lead_status;
    use serde_json::json;

    fn lead(id: i64, source: &str, project_type: &str, score: i64) -> Lead {
        let now = Utc::now();
        Lead {
            id,
            name: format!("Lead {}", id),
            email: format!("lead{}@example.com", id),
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
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_heuristic_insights_content() {
        let leads = vec![
            lead(1, "Website", "Commercial Office", 90),
            lead(2, "Website", "Commercial Office", 40),
            lead(3, "Referrals", "Industrial Facility", 75),
            lead(4, "Website", "Residential Renovation", 20),
        ];

        let insights = heuristic_insights(&leads);
        assert_eq!(insights.len(), 3);

        let source = &insights[0];
        assert_eq!(source.title, "Website is Your Top Lead Source");
        assert_eq!(
            source.description,
            "Website has generated 3 leads (75% of total). Focus more resources on this channel."
        );
        assert_eq!(source.insight_type, InsightType::Source);
        assert_eq!(source.action_url.as_deref(), Some("/marketing/website"));
        assert_eq!(source.related_leads, vec![1, 2, 4]);

        let quality = &insights[1];
        assert_eq!(
            quality.description,
            "Your lead qualification rate is 50.0%. This is below industry average. Review your lead sources."
        );

        let trend = &insights[2];
        assert_eq!(trend.insight_type, InsightType::Trend);
        assert!(trend.description.starts_with("Commercial Office is your most requested project type (50%)."));
    }

    #[test]
    fn test_qualification_rate_praise_above_half() {
        let leads = vec![
            lead(1, "Google", "Commercial Office", 70),
            lead(2, "Google", "Commercial Office", 85),
            lead(3, "Google", "Commercial Office", 10),
        ];

        let insights = heuristic_insights(&leads);
        assert_eq!(
            insights[1].description,
            "Your lead qualification rate is 66.7%. Great job!"
        );
    }

    #[test]
    fn test_ties_broken_by_name() {
        let leads = vec![
            lead(1, "Website", "Residential New Build", 50),
            lead(2, "Facebook", "Commercial Office", 50),
        ];

        let insights = heuristic_insights(&leads);
        assert_eq!(insights[0].title, "Facebook is Your Top Lead Source");
        assert!(insights[2].description.starts_with("Commercial Office"));
    }

    #[test]
    fn test_no_leads_no_insights() {
        assert!(heuristic_insights(&[]).is_empty());
    }

    #[test]
    fn test_batch_accepts_wrapped_and_bare_forms() {
        let item = json!({ "title": "T", "description": "D", "type": "trend", "icon": "ri-robot-line" });

        let wrapped: InsightBatch = serde_json::from_value(json!({ "insights": [item.clone()] })).unwrap();
        assert_eq!(wrapped.validate().unwrap().into_insights().len(), 1);

        let bare: InsightBatch = serde_json::from_value(json!([item])).unwrap();
        assert_eq!(bare.validate().unwrap().into_insights().len(), 1);
    }

    #[test]
    fn test_batch_drops_out_of_schema_items_and_caps_at_three() {
        let good = |n: i64| json!({ "title": format!("T{}", n), "description": "D", "type": "opportunity", "icon": "ri-building-line" });
        let batch: InsightBatch = serde_json::from_value(json!({
            "insights": [
                { "title": "bad icon", "description": "D", "type": "trend", "icon": "ri-fire-line" },
                { "title": "bad type", "description": "D", "type": "source", "icon": "ri-robot-line" },
                good(1), good(2), good(3), good(4)
            ]
        }))
        .unwrap();

        let titles: Vec<String> = batch
            .validate()
            .unwrap()
            .into_insights()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn test_unparseable_item_does_not_sink_the_batch() {
        let batch: InsightBatch = serde_json::from_value(json!([
            { "title": "Office demand rising", "description": "D", "type": "trend", "icon": "ri-line-chart-line" },
            { "title": "Wrong type", "description": "D", "type": "Insight", "icon": "ri-robot-line" },
            { "title": "No icon", "description": "D", "type": "quality" },
            { "title": "Weekend calls", "description": "D", "type": "schedule", "icon": "ri-calendar-check-line" }
        ]))
        .unwrap();

        let titles: Vec<String> = batch
            .validate()
            .unwrap()
            .into_insights()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Office demand rising", "Weekend calls"]);
    }

    #[test]
    fn test_model_insight_gets_view_details_action() {
        let draft = from_model(ModelInsight {
            title: "Weekend inquiries spike".to_string(),
            description: "D".to_string(),
            insight_type: InsightType::Schedule,
            icon: "ri-calendar-check-line".to_string(),
        });
        assert_eq!(draft.action.as_deref(), Some("View Details"));
        assert_eq!(draft.action_url.as_deref(), Some("/insights/schedule"));
        assert_eq!(draft.priority, "medium");
    }

    #[test]
    fn test_prompt_samples_first_ten_leads() {
        let leads: Vec<Lead> = (1..=15).map(|i| lead(i, "Website", "Commercial Office", 50)).collect();
        let prompt = insight_prompt(&leads).unwrap();
        assert!(prompt.contains("lead10@example.com"));
        assert!(!prompt.contains("lead11@example.com"));
        assert!(prompt.contains("\"projectType\""));
    }
}
