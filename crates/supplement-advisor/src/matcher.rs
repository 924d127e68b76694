/// Rule-based recommendation matcher.
///
/// Quiz answers are looked up in the catalog's symptom and goal tables. Every hit becomes a
/// candidate with a fixed base score (goals weigh more than symptoms); when nothing hits, the
/// fallback list is used with a lower base. Candidates are deduplicated by id keeping the
/// higher score, ranked by score with catalog declaration order as the tie-break, and
/// truncated to the configured limit.
use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::annotate::{Annotation, TermGlossary};
use crate::catalog::{normalize_key, Catalog};
use crate::model::{MatchReason, RecommendationCandidate, SupplementRecord};

pub const DEFAULT_LIMIT: usize = 5;
pub const SYMPTOM_BASE_SCORE: f32 = 0.6;
pub const GOAL_BASE_SCORE: f32 = 0.7;
pub const FALLBACK_BASE_SCORE: f32 = 0.5;

/// How candidate scores are perturbed before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScoringMode {
    /// Base scores only; identical inputs give identical rankings.
    #[default]
    Deterministic,
    /// Adds a uniform `0..max` offset to every candidate for result variety.
    Jittered { max: f32 },
}

/// A ranked candidate together with its catalog record and description annotations.
#[derive(Debug, Clone)]
pub struct Recommendation<'a> {
    pub candidate: RecommendationCandidate,
    pub record: &'a SupplementRecord,
    pub annotations: Vec<Annotation>,
}

pub struct Matcher {
    catalog: Arc<Catalog>,
    glossary: TermGlossary,
    limit: usize,
    mode: ScoringMode,
}

impl Matcher {
    pub fn new(catalog: Arc<Catalog>, glossary: TermGlossary) -> Self {
        Self {
            catalog,
            glossary,
            limit: DEFAULT_LIMIT,
            mode: ScoringMode::Deterministic,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_scoring_mode(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn glossary(&self) -> &TermGlossary {
        &self.glossary
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_deterministic(&self) -> bool {
        self.jitter_bound().is_none()
    }

    /// Rank candidates for the given answers using the configured scoring mode.
    pub fn match_candidates(
        &self,
        symptoms: &[String],
        goals: &[String],
    ) -> Vec<RecommendationCandidate> {
        match self.jitter_bound() {
            None => self.rank(symptoms, goals, || 0.0),
            Some(_) => self.match_with_rng(symptoms, goals, &mut rand::thread_rng()),
        }
    }

    /// Same as [`Matcher::match_candidates`] with an explicit randomness source, so jittered
    /// rankings can be reproduced from a seed.
    pub fn match_with_rng<R: Rng>(
        &self,
        symptoms: &[String],
        goals: &[String],
        rng: &mut R,
    ) -> Vec<RecommendationCandidate> {
        match self.jitter_bound() {
            None => self.rank(symptoms, goals, || 0.0),
            Some(max) => self.rank(symptoms, goals, || rng.gen_range(0.0..max)),
        }
    }

    /// Full pipeline: rank, then attach records and description annotations.
    pub fn recommend(&self, symptoms: &[String], goals: &[String]) -> Vec<Recommendation<'_>> {
        self.match_candidates(symptoms, goals)
            .into_iter()
            .filter_map(|candidate| {
                let record = self.catalog.get(&candidate.id)?;
                Some(Recommendation {
                    annotations: self.glossary.annotate(&record.description),
                    record,
                    candidate,
                })
            })
            .collect()
    }

    fn jitter_bound(&self) -> Option<f32> {
        match self.mode {
            ScoringMode::Jittered { max } if max > 0.0 => Some(max),
            _ => None,
        }
    }

    fn rank(
        &self,
        symptoms: &[String],
        goals: &[String],
        mut jitter: impl FnMut() -> f32,
    ) -> Vec<RecommendationCandidate> {
        let tables = self.catalog.tables();
        let mut candidates = Vec::new();

        for symptom in normalized_answers(symptoms) {
            match tables.symptoms.get(&symptom) {
                Some(ids) => self.push_candidates(
                    &mut candidates,
                    ids,
                    SYMPTOM_BASE_SCORE,
                    MatchReason::Symptom(symptom.clone()),
                    &mut jitter,
                ),
                None => debug!(symptom, "no mapping for symptom"),
            }
        }

        for goal in normalized_answers(goals) {
            match tables.goals.get(&goal) {
                Some(ids) => self.push_candidates(
                    &mut candidates,
                    ids,
                    GOAL_BASE_SCORE,
                    MatchReason::Goal(goal.clone()),
                    &mut jitter,
                ),
                None => debug!(goal, "no mapping for goal"),
            }
        }

        if candidates.is_empty() {
            self.push_candidates(
                &mut candidates,
                &tables.fallback,
                FALLBACK_BASE_SCORE,
                MatchReason::Fallback,
                &mut jitter,
            );
        }

        let mut ranked = keep_highest_per_id(candidates);
        ranked.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then(a.position.cmp(&b.position))
        });
        ranked.truncate(self.limit);
        ranked
    }

    fn push_candidates(
        &self,
        candidates: &mut Vec<RecommendationCandidate>,
        ids: &[String],
        base: f32,
        reason: MatchReason,
        jitter: &mut impl FnMut() -> f32,
    ) {
        for id in ids {
            let (Some(position), Some(record)) = (self.catalog.position(id), self.catalog.get(id))
            else {
                debug!(id = %id, reason = %reason.label(), "skipping unknown supplement id");
                continue;
            };
            candidates.push(RecommendationCandidate {
                id: record.id.clone(),
                category: record.category.clone(),
                relevance_score: base + jitter(),
                reason: reason.clone(),
                position,
            });
        }
    }
}

/// Normalize answers, drop blanks and repeats, and sort them so the answer order never
/// changes which reason a tied candidate keeps.
fn normalized_answers(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = raw.iter().filter_map(|a| normalize_key(a)).collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Collapse candidates sharing an id into the one with the highest score. On a tie the
/// first one produced is kept.
fn keep_highest_per_id(candidates: Vec<RecommendationCandidate>) -> Vec<RecommendationCandidate> {
    let mut kept: Vec<RecommendationCandidate> = Vec::with_capacity(candidates.len());
    let mut slots: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        match slots.get(&candidate.id) {
            Some(&slot) => {
                if candidate.relevance_score > kept[slot].relevance_score {
                    kept[slot] = candidate;
                }
            }
            None => {
                slots.insert(candidate.id.clone(), kept.len());
                kept.push(candidate);
            }
        }
    }
    kept
}
