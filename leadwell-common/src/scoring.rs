//! Lead scoring heuristic
//!
//! Pure, deterministic scoring from project type, source and how complete the
//! contact details are. Output is always in [0.0, 1.0]; callers scale it to
//! the 0-100 lead score.

use crate::models::{Lead, NewLead};

/// Score for project types not in the table
pub const DEFAULT_PROJECT_TYPE_SCORE: f64 = 0.5;
/// Score for sources not in the table
pub const DEFAULT_SOURCE_SCORE: f64 = 0.6;

const PROJECT_TYPE_WEIGHT: f64 = 0.3;
const SOURCE_WEIGHT: f64 = 0.3;
const COMPLETENESS_WEIGHT: f64 = 0.4;
const COMPLETENESS_STEP: f64 = 0.2;

const PROJECT_TYPE_SCORES: &[(&str, f64)] = &[
    ("Commercial Office", 0.9),
    ("Industrial Facility", 0.85),
    ("Residential New Build", 0.8),
    ("Residential Renovation", 0.7),
];

const SOURCE_SCORES: &[(&str, f64)] = &[
    ("Referrals", 0.95),
    ("LinkedIn", 0.85),
    ("Website", 0.8),
    ("Google", 0.75),
    ("Facebook", 0.7),
];

/// The fields the heuristic looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringInput<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub project_type: Option<&'a str>,
    pub source: Option<&'a str>,
}

impl<'a> From<&'a NewLead> for ScoringInput<'a> {
    fn from(lead: &'a NewLead) -> Self {
        Self {
            name: Some(&lead.name),
            email: Some(&lead.email),
            phone: lead.phone.as_deref(),
            company: lead.company.as_deref(),
            project_type: Some(&lead.project_type),
            source: Some(&lead.source),
        }
    }
}

impl<'a> From<&'a Lead> for ScoringInput<'a> {
    fn from(lead: &'a Lead) -> Self {
        Self {
            name: Some(&lead.name),
            email: Some(&lead.email),
            phone: lead.phone.as_deref(),
            company: lead.company.as_deref(),
            project_type: Some(&lead.project_type),
            source: Some(&lead.source),
        }
    }
}

/// Table lookup; unknown categories score [`DEFAULT_PROJECT_TYPE_SCORE`]
pub fn project_type_score(project_type: &str) -> f64 {
    lookup(PROJECT_TYPE_SCORES, project_type).unwrap_or(DEFAULT_PROJECT_TYPE_SCORE)
}

/// Table lookup; unknown channels score [`DEFAULT_SOURCE_SCORE`]
pub fn source_score(source: &str) -> f64 {
    lookup(SOURCE_SCORES, source).unwrap_or(DEFAULT_SOURCE_SCORE)
}

/// 0.2 per populated field among name, email, phone, company, project type
pub fn completeness_score(input: &ScoringInput<'_>) -> f64 {
    let populated = [
        input.name,
        input.email,
        input.phone,
        input.company,
        input.project_type,
    ]
    .iter()
    .filter(|field| is_populated(**field))
    .count();

    (populated as f64 * COMPLETENESS_STEP).min(1.0)
}

/// Weighted heuristic in [0.0, 1.0]
pub fn heuristic_score(input: &ScoringInput<'_>) -> f64 {
    let project_type = project_type_score(input.project_type.unwrap_or_default());
    let source = source_score(input.source.unwrap_or_default());
    let completeness = completeness_score(input);

    let score = project_type * PROJECT_TYPE_WEIGHT
        + source * SOURCE_WEIGHT
        + completeness * COMPLETENESS_WEIGHT;

    score.clamp(0.0, 1.0)
}

/// Clamp an integer lead score to [0, 100]
pub fn clamp_score(score: i64) -> i64 {
    score.clamp(0, 100)
}

/// Round a fractional 0-100 score to the stored integer form
pub fn score_from_f64(score: f64) -> i64 {
    if score.is_nan() {
        return 0;
    }
    clamp_score(score.round() as i64)
}

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, score)| *score)
}

fn is_populated(field: Option<&str>) -> bool {
    field.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> ScoringInput<'static> {
        ScoringInput {
            name: Some("Ana Ruiz"),
            email: Some("ana@ruizbuild.com"),
            phone: Some("555-0134"),
            company: Some("Ruiz Build"),
            project_type: Some("Commercial Office"),
            source: Some("Referrals"),
        }
    }

    #[test]
    fn test_project_type_table_and_default() {
        assert_eq!(project_type_score("Commercial Office"), 0.9);
        assert_eq!(project_type_score("Industrial Facility"), 0.85);
        assert_eq!(project_type_score("Residential New Build"), 0.8);
        assert_eq!(project_type_score("Residential Renovation"), 0.7);
        assert_eq!(project_type_score("Treehouse"), DEFAULT_PROJECT_TYPE_SCORE);
        assert_eq!(project_type_score(""), DEFAULT_PROJECT_TYPE_SCORE);
    }

    #[test]
    fn test_source_table_and_default() {
        assert_eq!(source_score("Referrals"), 0.95);
        assert_eq!(source_score("Facebook"), 0.7);
        assert_eq!(source_score("Billboard"), DEFAULT_SOURCE_SCORE);
    }

    #[test]
    fn test_completeness_counts_non_blank_fields() {
        assert!((completeness_score(&full_input()) - 1.0).abs() < 1e-9);

        let partial = ScoringInput {
            phone: None,
            company: Some("   "),
            ..full_input()
        };
        assert!((completeness_score(&partial) - 0.6).abs() < 1e-9);

        assert_eq!(completeness_score(&ScoringInput::default()), 0.0);
    }

    #[test]
    fn test_heuristic_weighting() {
        // 0.3*0.9 + 0.3*0.95 + 0.4*1.0
        let expected = 0.27 + 0.285 + 0.4;
        assert!((heuristic_score(&full_input()) - expected).abs() < 1e-9);

        // Unknown everything, nothing populated: 0.3*0.5 + 0.3*0.6
        let empty = heuristic_score(&ScoringInput::default());
        assert!((empty - 0.33).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_is_deterministic_and_bounded() {
        let input = full_input();
        let first = heuristic_score(&input);
        for _ in 0..10 {
            assert_eq!(heuristic_score(&input), first);
        }

        for project_type in ["Commercial Office", "Other", ""] {
            for source in ["Referrals", "Website", "Carrier pigeon"] {
                let score = heuristic_score(&ScoringInput {
                    project_type: Some(project_type),
                    source: Some(source),
                    ..full_input()
                });
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_score_from_f64_rounds_and_clamps() {
        assert_eq!(score_from_f64(70.4), 70);
        assert_eq!(score_from_f64(70.5), 71);
        assert_eq!(score_from_f64(130.0), 100);
        assert_eq!(score_from_f64(-3.0), 0);
        assert_eq!(score_from_f64(f64::NAN), 0);
    }
}
