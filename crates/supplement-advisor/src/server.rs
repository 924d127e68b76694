/// MCP server implementation for the supplement advisor.
///
/// Exposes four tools:
/// - `recommend_supplements`: Rank supplements for quiz answers
/// - `get_supplement`: Look up one catalog record by ID
/// - `list_category`: List the supplements of a category
/// - `list_quiz_options`: Symptom and goal answers the quiz can offer
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::annotate::Annotation;
use crate::cache::{RecommendKey, RecommendationCache};
use crate::catalog::normalize_key;
use crate::error::AppError;
use crate::matcher::{Matcher, Recommendation};
use crate::model::SupplementRecord;
use funnel_common::mcp_api::{
    CategoryInfo, CategoryListResponse, GetSupplementParams, ListCategoryParams,
    QuizOptionsResponse, RecommendParams, RecommendResponse, Recommendation as ApiRecommendation,
    SupplementDetailResponse, SupplementSummary, TermAnnotation,
};

const NO_MATCH_MESSAGE: &str =
    "We could not match a supplement to these answers yet. A balanced diet, regular sleep and a \
     conversation with a healthcare professional are a good place to start.";

#[derive(Clone)]
pub struct SupplementAdvisorServer {
    matcher: Arc<Matcher>,
    cache: Arc<RecommendationCache>,
    tool_router: ToolRouter<SupplementAdvisorServer>,
}

impl SupplementAdvisorServer {
    pub fn new(matcher: Arc<Matcher>, cache: Arc<RecommendationCache>) -> Self {
        Self {
            matcher,
            cache,
            tool_router: Self::tool_router(),
        }
    }

    /// Build the response for a set of quiz answers, consulting the cache only when ranking
    /// is deterministic.
    pub async fn recommend(&self, symptoms: &[String], goals: &[String]) -> RecommendResponse {
        let symptoms = normalize_all(symptoms);
        let goals = normalize_all(goals);
        let catalog_version = self.matcher.catalog().version().to_string();

        let key = self.matcher.is_deterministic().then(|| {
            RecommendKey::new(&catalog_version, &symptoms, &goals, self.matcher.limit())
        });
        if let Some(key) = &key {
            if let Some(cached) = self.cache.get_recommendations(key).await {
                info!(key = key.as_str(), "recommendation cache hit");
                return cached;
            }
        }

        let recommendations: Vec<ApiRecommendation> = self
            .matcher
            .recommend(&symptoms, &goals)
            .iter()
            .map(to_api_recommendation)
            .collect();
        info!(
            symptoms = symptoms.len(),
            goals = goals.len(),
            results = recommendations.len(),
            "recommendations ranked"
        );

        let fallback_message = recommendations
            .is_empty()
            .then(|| NO_MATCH_MESSAGE.to_string());
        let response = RecommendResponse {
            catalog_version,
            recommendations,
            fallback_message,
        };

        if let Some(key) = &key {
            self.cache.set_recommendations(key, &response).await;
        }
        response
    }
}

#[tool_router]
impl SupplementAdvisorServer {
    #[tool(description = "Recommend up to five supplements for the symptoms and goals selected in the health quiz. Returns ranked results; an empty list comes with a neutral fallback_message.")]
    async fn recommend_supplements(
        &self,
        Parameters(params): Parameters<RecommendParams>,
    ) -> Result<Json<RecommendResponse>, String> {
        Ok(Json(self.recommend(&params.symptoms, &params.goals).await))
    }

    #[tool(description = "Get the full catalog record of a supplement by ID (e.g. 'magnesium', 'vitamin_d3').")]
    async fn get_supplement(
        &self,
        Parameters(params): Parameters<GetSupplementParams>,
    ) -> Result<Json<SupplementDetailResponse>, String> {
        let supplement_id = params.supplement_id.trim().to_string();
        if supplement_id.is_empty() {
            return Err("supplement_id must not be empty".to_string());
        }

        let catalog = self.matcher.catalog();
        let record = catalog
            .find(&supplement_id)
            .ok_or_else(|| AppError::NotFound(supplement_id.clone()).to_string())?;

        if let Some(cached) = self.cache.get_supplement(catalog.version(), &record.id).await {
            return Ok(Json(cached));
        }

        let detail = to_api_detail(record, self.matcher.glossary().annotate(&record.description));
        self.cache.set_supplement(catalog.version(), &detail).await;
        Ok(Json(detail))
    }

    #[tool(description = "List all supplements in a catalog category such as 'vitamins', 'minerals' or 'adaptogens'.")]
    async fn list_category(
        &self,
        Parameters(params): Parameters<ListCategoryParams>,
    ) -> Result<Json<CategoryListResponse>, String> {
        let category_key = params.category.trim().to_string();
        if category_key.is_empty() {
            return Err("category must not be empty".to_string());
        }

        let catalog = self.matcher.catalog();
        let category = catalog
            .find_category(&category_key)
            .map_err(|e| e.to_string())?;

        let supplements: Vec<SupplementSummary> = catalog
            .records_in_category(&category.key)
            .into_iter()
            .map(|r| SupplementSummary {
                id: r.id.clone(),
                name: r.name.clone(),
                efficacy_score: r.efficacy_score,
            })
            .collect();

        Ok(Json(CategoryListResponse {
            category: CategoryInfo {
                key: category.key,
                display_name: category.display_name,
                supplement_count: category.supplement_count,
            },
            supplements,
        }))
    }

    #[tool(description = "List the symptom and goal answers the health quiz can offer, plus the catalog categories.")]
    async fn list_quiz_options(&self) -> Result<Json<QuizOptionsResponse>, String> {
        let catalog = self.matcher.catalog();
        Ok(Json(QuizOptionsResponse {
            catalog_version: catalog.version().to_string(),
            symptoms: catalog.known_symptoms(),
            goals: catalog.known_goals(),
            categories: catalog
                .categories()
                .into_values()
                .map(|c| CategoryInfo {
                    key: c.key,
                    display_name: c.display_name,
                    supplement_count: c.supplement_count,
                })
                .collect(),
        }))
    }
}

/// Normalized, sorted and deduplicated answers: the form both the cache key and the matcher
/// see, so permuted selections share one response.
fn normalize_all(answers: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = answers.iter().filter_map(|a| normalize_key(a)).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

fn to_api_annotations(annotations: &[Annotation]) -> Vec<TermAnnotation> {
    annotations
        .iter()
        .map(|a| TermAnnotation {
            start: a.start,
            end: a.end,
            term: a.term.clone(),
            tag: a.tag.clone(),
        })
        .collect()
}

fn to_api_recommendation(rec: &Recommendation<'_>) -> ApiRecommendation {
    let record = rec.record;
    ApiRecommendation {
        id: record.id.clone(),
        name: record.name.clone(),
        category: record.category.clone(),
        categories: rec.candidate.categories(),
        relevance_score: rec.candidate.relevance_score,
        description: record.description.clone(),
        annotations: to_api_annotations(&rec.annotations),
        benefits: record.benefits.clone(),
        recommended_dosage: record.recommended_dosage.clone(),
        time_to_effect: record.time_to_effect.clone(),
        efficacy_score: record.efficacy_score,
        cautions: record.cautions.clone(),
    }
}

fn to_api_detail(record: &SupplementRecord, annotations: Vec<Annotation>) -> SupplementDetailResponse {
    SupplementDetailResponse {
        id: record.id.clone(),
        name: record.name.clone(),
        description: record.description.clone(),
        category: record.category.clone(),
        benefits: record.benefits.clone(),
        scientific_basis: record.scientific_basis.clone(),
        recommended_dosage: record.recommended_dosage.clone(),
        time_to_effect: record.time_to_effect.clone(),
        natural_sources: record.natural_sources.clone(),
        efficacy_score: record.efficacy_score,
        cautions: record.cautions.clone(),
        compatible_diets: record.compatible_diets.iter().cloned().collect(),
        target_symptoms: record.target_symptoms.iter().cloned().collect(),
        target_goals: record.target_goals.iter().cloned().collect(),
        annotations: to_api_annotations(&annotations),
    }
}

#[tool_handler]
impl ServerHandler for SupplementAdvisorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "supplement-advisor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Supplement advisor MCP server. Use list_quiz_options to discover the quiz \
                 answers, recommend_supplements to rank supplements for a set of symptoms and \
                 goals, get_supplement for a full record, and list_category to browse the \
                 catalog."
                    .to_string(),
            ),
        }
    }
}
