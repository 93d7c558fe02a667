//! Lead scoring: heuristic blended with a model assessment
//!
//! `final = heuristic * 100 * 0.4 + model_score * 0.6`, rounded and clamped.
//! Any model failure falls back to the heuristic alone.

use leadwell_common::scoring::{heuristic_score, score_from_f64, ScoringInput};
use serde::Deserialize;

use super::reasoning_client::{request_structured, ReasoningClient, ResponseSchema};

const HEURISTIC_WEIGHT: f64 = 0.4;
const MODEL_WEIGHT: f64 = 0.6;

/// Model answer: `{ "score": number, "reason": string, "isScam": boolean }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAssessment {
    pub score: f64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_scam: bool,
}

impl ResponseSchema for LeadAssessment {
    fn validate(self) -> Result<Self, String> {
        if !self.score.is_finite() {
            return Err("score must be a finite number".to_string());
        }
        Ok(self)
    }
}

/// Integer 0-100 score for a lead about to be stored
pub async fn score_lead(client: &dyn ReasoningClient, input: &ScoringInput<'_>) -> i64 {
    let heuristic = heuristic_score(input);

    match request_structured::<LeadAssessment>(client, &scoring_prompt(input)).await {
        Ok((assessment, _)) => {
            let blended = heuristic * 100.0 * HEURISTIC_WEIGHT
                + assessment.score.clamp(0.0, 100.0) * MODEL_WEIGHT;
            tracing::debug!(
                heuristic,
                model_score = assessment.score,
                blended,
                "Lead scored with model assessment"
            );
            score_from_f64(blended)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Model lead scoring failed, using heuristic score");
            score_from_f64(heuristic * 100.0)
        }
    }
}

fn scoring_prompt(input: &ScoringInput<'_>) -> String {
    let or_missing = |value: Option<&str>| -> String {
        value
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("Not provided")
            .to_string()
    };

    format!(
        "You are an expert at evaluating construction leads. Please analyze this lead information:\n\
         - Name: {}\n\
         - Email: {}\n\
         - Phone: {}\n\
         - Company: {}\n\
         - Project Type: {}\n\
         - Source: {}\n\n\
         Score this lead from 0-100 based on:\n\
         1. How likely they are to convert to a paying customer\n\
         2. The potential value of their project\n\
         3. How well their project aligns with what construction companies typically handle\n\
         4. How complete their information is\n\n\
         Respond with a JSON object in this format:\n\
         {{ \"score\": number, \"reason\": \"detailed explanation\", \"isScam\": boolean }}",
        or_missing(input.name),
        or_missing(input.email),
        or_missing(input.phone),
        or_missing(input.company),
        or_missing(input.project_type),
        or_missing(input.source),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reasoning_client::ReasoningError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Fixed(Result<Value, ()>);

    #[async_trait]
    impl ReasoningClient for Fixed {
        async fn complete_json(&self, _prompt: &str) -> Result<Value, ReasoningError> {
            self.0.clone().map_err(|_| ReasoningError::Timeout)
        }

        async fn complete_text(&self, _prompt: &str) -> Result<String, ReasoningError> {
            Err(ReasoningError::EmptyResponse)
        }
    }

    fn input() -> ScoringInput<'static> {
        ScoringInput {
            name: Some("Ana Ruiz"),
            email: Some("ana@ruizbuild.com"),
            phone: Some("555-0134"),
            company: Some("Ruiz Build"),
            project_type: Some("Industrial Facility"),
            source: Some("LinkedIn"),
        }
    }

    #[tokio::test]
    async fn test_blends_heuristic_and_model() {
        // heuristic 0.91 -> 91 * 0.4 = 36.4; model 50 * 0.6 = 30
        let client = Fixed(Ok(json!({ "score": 50, "reason": "ok", "isScam": false })));
        assert_eq!(score_lead(&client, &input()).await, 66);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_heuristic() {
        let client = Fixed(Err(()));
        assert_eq!(score_lead(&client, &input()).await, 91);
    }

    #[tokio::test]
    async fn test_malformed_answer_falls_back_to_heuristic() {
        let client = Fixed(Ok(json!({ "reason": "no score here" })));
        assert_eq!(score_lead(&client, &input()).await, 91);
    }

    #[tokio::test]
    async fn test_out_of_range_model_score_is_bounded() {
        let client = Fixed(Ok(json!({ "score": 900 })));
        let score = score_lead(&client, &input()).await;
        assert!((0..=100).contains(&score));
        assert_eq!(score, 96);
    }

    #[test]
    fn test_prompt_marks_missing_fields() {
        let prompt = scoring_prompt(&ScoringInput {
            phone: None,
            company: Some(" "),
            ..input()
        });
        assert!(prompt.contains("- Phone: Not provided"));
        assert!(prompt.contains("- Company: Not provided"));
        assert!(prompt.contains("- Project Type: Industrial Facility"));
    }
}
