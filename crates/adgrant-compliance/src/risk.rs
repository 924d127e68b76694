/// Weighted semantic risk scoring.
///
/// Each configured pattern contributes its weight at most once. A text that carries any
/// safe-context phrase anywhere is not scored at all.
use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::policy::CompliancePolicy;
use crate::text::PhraseList;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskMatch {
    pub label: String,
    /// First substring the pattern matched.
    pub matched: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskAssessment {
    pub risk_score: f32,
    pub is_risky: bool,
    pub matches: Vec<RiskMatch>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    label: String,
    pattern: Regex,
    weight: f32,
    exception: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct RiskScorer {
    patterns: Vec<CompiledPattern>,
    safe_contexts: PhraseList,
    threshold: f32,
}

fn compile(pattern: &str) -> Result<Regex, AppError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| AppError::Policy {
            pattern: pattern.to_string(),
            source,
        })
}

impl RiskScorer {
    pub fn new(policy: &CompliancePolicy) -> Result<Self, AppError> {
        let patterns = policy
            .risk_patterns
            .iter()
            .map(|p| {
                Ok(CompiledPattern {
                    label: p.label.clone(),
                    pattern: compile(&p.pattern)?,
                    weight: p.weight,
                    exception: p.safe_exception.as_deref().map(compile).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            patterns,
            safe_contexts: PhraseList::new(&policy.safe_contexts),
            threshold: policy.risk_threshold,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn assess(&self, text: &str) -> RiskAssessment {
        if self.safe_contexts.contained_in(text) {
            return RiskAssessment {
                risk_score: 0.0,
                is_risky: false,
                matches: Vec::new(),
            };
        }

        let matches: Vec<RiskMatch> = self
            .patterns
            .iter()
            .filter(|p| !p.exception.as_ref().is_some_and(|e| e.is_match(text)))
            .filter_map(|p| {
                p.pattern.find(text).map(|m| RiskMatch {
                    label: p.label.clone(),
                    matched: m.as_str().to_string(),
                    weight: p.weight,
                })
            })
            .collect();

        let risk_score: f32 = matches.iter().map(|m| m.weight).sum();
        RiskAssessment {
            risk_score,
            is_risky: risk_score > self.threshold,
            matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RiskPattern;

    fn scorer() -> RiskScorer {
        RiskScorer::new(&CompliancePolicy::default()).unwrap()
    }

    fn labels(assessment: &RiskAssessment) -> Vec<&str> {
        assessment.matches.iter().map(|m| m.label.as_str()).collect()
    }

    #[test]
    fn promotional_copy_is_risky() {
        let assessment = scorer().assess("Buy now and get 20% off, limited time only!");
        assert_eq!(labels(&assessment), vec!["call_to_buy", "percent_off", "limited_time"]);
        assert_eq!(assessment.risk_score, 11.0);
        assert!(assessment.is_risky);
    }

    #[test]
    fn each_pattern_counts_once() {
        let assessment = scorer().assess("Miracle! A miracle! Truly a MIRACLE.");
        assert_eq!(assessment.risk_score, 3.0);
        assert_eq!(assessment.matches[0].matched, "Miracle");
        assert!(!assessment.is_risky);
    }

    #[test]
    fn threshold_is_exclusive() {
        // cure_claim alone weighs exactly 5.0
        let assessment = scorer().assess("This tea cures headaches.");
        assert_eq!(assessment.risk_score, 5.0);
        assert!(!assessment.is_risky);
    }

    #[test]
    fn safe_exception_cancels_its_pattern() {
        let assessment = scorer().assess("Magnesium is not a cure for anything. Buy now!");
        assert_eq!(labels(&assessment), vec!["call_to_buy"]);

        let assessment = scorer().assess("Your $25 donation funds free shipping of test kits.");
        assert_eq!(labels(&assessment), vec!["free_shipping"]);
    }

    #[test]
    fn safe_phrase_anywhere_skips_scoring() {
        let text = "Research shows vitamin D matters. Buy now, 50% off, limited time, miracle cure!";
        let assessment = scorer().assess(text);
        assert_eq!(assessment.risk_score, 0.0);
        assert!(!assessment.is_risky);
        assert!(assessment.matches.is_empty());
    }

    #[test]
    fn neutral_text_scores_zero() {
        let assessment = scorer().assess("Omega-3 fatty acids are found in oily fish.");
        assert_eq!(assessment.risk_score, 0.0);
        assert!(scorer().assess("").matches.is_empty());
    }

    #[test]
    fn invalid_pattern_is_a_policy_error() {
        let policy = CompliancePolicy {
            risk_patterns: vec![RiskPattern {
                label: "broken".to_string(),
                pattern: "(unclosed".to_string(),
                weight: 1.0,
                safe_exception: None,
            }],
            ..CompliancePolicy::default()
        };
        match RiskScorer::new(&policy) {
            Err(AppError::Policy { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected policy error, got {other:?}"),
        }
    }
}
