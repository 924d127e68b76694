use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single recommendable supplement from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplementRecord {
    /// Stable identifier, e.g. "vitamin_d3", "magnesium"
    pub id: String,
    pub name: String,
    pub description: String,
    /// Grouping key, e.g. "vitamins", "adaptogens"
    pub category: String,
    /// Short claims, in display order
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub scientific_basis: String,
    #[serde(default)]
    pub recommended_dosage: String,
    #[serde(default)]
    pub time_to_effect: String,
    #[serde(default)]
    pub natural_sources: String,
    /// Author-assigned score within 0..=100
    pub efficacy_score: u8,
    #[serde(default)]
    pub cautions: Option<String>,
    #[serde(default)]
    pub compatible_diets: BTreeSet<String>,
    #[serde(default)]
    pub target_symptoms: BTreeSet<String>,
    #[serde(default)]
    pub target_goals: BTreeSet<String>,
}

/// A supplement category (e.g. "minerals: Minerals").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub display_name: String,
    pub supplement_count: usize,
}

/// Which lookup produced a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum MatchReason {
    Symptom(String),
    Goal(String),
    Fallback,
}

impl MatchReason {
    pub fn label(&self) -> String {
        match self {
            MatchReason::Symptom(key) => format!("symptom:{key}"),
            MatchReason::Goal(key) => format!("goal:{key}"),
            MatchReason::Fallback => "fallback".to_string(),
        }
    }
}

/// A provisional recommendation produced by one matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub id: String,
    pub category: String,
    pub relevance_score: f32,
    pub reason: MatchReason,
    /// Declaration index in the catalog, used as the ranking tie-break.
    pub position: usize,
}

impl RecommendationCandidate {
    /// Record category followed by the label of the path that produced this candidate.
    pub fn categories(&self) -> Vec<String> {
        vec![self.category.clone(), self.reason.label()]
    }
}
