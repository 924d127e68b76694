use crate::banned::BannedTermDetector;
use crate::error::AppError;
use crate::filter::{ComplianceFilter, ScanReport};
use crate::policy::CompliancePolicy;
use crate::risk::{RiskAssessment, RiskScorer};

/// The three scanners compiled from one policy.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    filter: ComplianceFilter,
    risk: RiskScorer,
    banned: BannedTermDetector,
}

impl ComplianceEngine {
    pub fn new(policy: &CompliancePolicy) -> Result<Self, AppError> {
        Ok(Self {
            filter: ComplianceFilter::new(policy)?,
            risk: RiskScorer::new(policy)?,
            banned: BannedTermDetector::new(policy)?,
        })
    }

    pub fn scan(&self, text: &str) -> ScanReport {
        self.filter.scan(text)
    }

    pub fn assess_risk(&self, text: &str) -> RiskAssessment {
        self.risk.assess(text)
    }

    pub fn detect_banned_terms(&self, text: &str) -> Vec<String> {
        self.banned.detect(text)
    }

    pub fn risk_threshold(&self) -> f32 {
        self.risk.threshold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RiskPattern;

    #[test]
    fn builtin_policy_compiles() {
        let engine = ComplianceEngine::new(&CompliancePolicy::default()).unwrap();
        assert_eq!(engine.risk_threshold(), 5.0);
        assert!(engine.scan("Vitamin C and collagen").is_clean());
    }

    #[test]
    fn scanners_disagree_where_designed_to() {
        let engine = ComplianceEngine::new(&CompliancePolicy::default()).unwrap();
        let text = "According to studies, checkout lines are long and most people dislike \
                    waiting in queues at busy stores. Buy now!";
        // the window around "buy" is outside the safe phrase
        assert_eq!(engine.scan(text).terms, vec!["buy".to_string()]);
        // the whole text carries a safe phrase
        assert_eq!(engine.assess_risk(text).risk_score, 0.0);
        assert_eq!(engine.detect_banned_terms(text), vec!["checkout", "buy"]);
    }

    #[test]
    fn bad_exception_pattern_fails_construction() {
        let policy = CompliancePolicy {
            risk_patterns: vec![RiskPattern {
                label: "x".to_string(),
                pattern: "x".to_string(),
                weight: 1.0,
                safe_exception: Some("[".to_string()),
            }],
            ..CompliancePolicy::default()
        };
        assert!(matches!(
            ComplianceEngine::new(&policy),
            Err(AppError::Policy { .. })
        ));
    }
}
