use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RecommendParams {
    /// Symptom answers from the quiz, e.g. "fatigue" or "poor sleep".
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Objective answers from the quiz, e.g. "more_energy".
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSupplementParams {
    /// Stable supplement ID such as "magnesium" or "vitamin_d3".
    pub supplement_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCategoryParams {
    /// Category key such as "vitamins" or "adaptogens".
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TermAnnotation {
    /// Byte offset of the first character of the term in `description`.
    pub start: usize,
    /// Byte offset one past the last character of the term.
    pub end: usize,
    pub term: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Record category followed by the reason labels of the path that produced it.
    pub categories: Vec<String>,
    /// Heuristic ranking score, not a probability.
    pub relevance_score: f32,
    pub description: String,
    pub annotations: Vec<TermAnnotation>,
    pub benefits: Vec<String>,
    pub recommended_dosage: String,
    pub time_to_effect: String,
    pub efficacy_score: u8,
    pub cautions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendResponse {
    pub catalog_version: String,
    pub recommendations: Vec<Recommendation>,
    /// Neutral message to show instead of an empty list.
    pub fallback_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SupplementDetailResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub benefits: Vec<String>,
    pub scientific_basis: String,
    pub recommended_dosage: String,
    pub time_to_effect: String,
    pub natural_sources: String,
    pub efficacy_score: u8,
    pub cautions: Option<String>,
    pub compatible_diets: Vec<String>,
    pub target_symptoms: Vec<String>,
    pub target_goals: Vec<String>,
    pub annotations: Vec<TermAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryInfo {
    pub key: String,
    pub display_name: String,
    pub supplement_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SupplementSummary {
    pub id: String,
    pub name: String,
    pub efficacy_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryListResponse {
    pub category: CategoryInfo,
    pub supplements: Vec<SupplementSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizOptionsResponse {
    pub catalog_version: String,
    pub symptoms: Vec<String>,
    pub goals: Vec<String>,
    pub categories: Vec<CategoryInfo>,
}
