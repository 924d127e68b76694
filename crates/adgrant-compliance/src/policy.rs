/// Compliance policy: the term lists, allow-lists and risk patterns the scanners apply.
///
/// The built-in policy is `CompliancePolicy::default()`. A TOML file can override any subset
/// of fields; missing fields keep their built-in value:
///
/// ```toml
/// safe_contexts = ["according to studies", "for educational purposes"]
/// risk_threshold = 6.0
///
/// [[risk_patterns]]
/// label = "call_to_buy"
/// pattern = '\b(?:buy|order)\s+now\b'
/// weight = 4.0
/// ```
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_CONTEXT_RADIUS: usize = 50;
pub const DEFAULT_RISK_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPattern {
    pub label: String,
    /// Case-insensitive regular expression.
    pub pattern: String,
    pub weight: f32,
    /// When this also matches the text, the pattern does not count.
    #[serde(default)]
    pub safe_exception: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompliancePolicy {
    /// Commercial terms flagged by `scan`.
    pub banned_terms: Vec<String>,
    /// Phrases that make a surrounding window safe.
    pub safe_contexts: Vec<String>,
    /// Characters kept on each side of a match.
    pub context_radius: usize,
    pub risk_patterns: Vec<RiskPattern>,
    /// Text is risky when its score is strictly above this value.
    pub risk_threshold: f32,
    /// Stricter term list used by `detect_banned_terms`.
    pub strict_terms: Vec<String>,
    /// Whole-text phrases that exempt `disclaimer_exempt_terms` from strict detection.
    pub educational_disclaimers: Vec<String>,
    pub disclaimer_exempt_terms: Vec<String>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn risk(label: &str, pattern: &str, weight: f32, safe_exception: Option<&str>) -> RiskPattern {
    RiskPattern {
        label: label.to_string(),
        pattern: pattern.to_string(),
        weight,
        safe_exception: safe_exception.map(str::to_string),
    }
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self {
            banned_terms: owned(&[
                "offer",
                "discount",
                "buy",
                "sale",
                "price",
                "promo",
                "deal",
                "coupon",
                "purchase",
                "cheap",
                "exclusive",
                "save",
                "free shipping",
                "limited time",
                "order now",
            ]),
            safe_contexts: owned(&[
                "scientific study",
                "scientific studies",
                "according to studies",
                "according to research",
                "research shows",
                "studies show",
                "clinical trial",
                "peer-reviewed",
                "for educational purposes",
                "educational purposes only",
                "non-commercial",
                "not a commercial offer",
            ]),
            context_radius: DEFAULT_CONTEXT_RADIUS,
            risk_patterns: vec![
                risk("call_to_buy", r"\b(?:buy|order|shop)\s+(?:now|today)\b", 4.0, None),
                risk("percent_off", r"\b\d{1,3}\s?%\s*off\b", 4.0, None),
                risk("limited_time", r"\blimited[- ]time\b", 3.0, None),
                risk("free_shipping", r"\bfree\s+shipping\b", 3.0, None),
                risk("money_back", r"\bmoney[- ]back\s+guarantee\b", 3.0, None),
                risk(
                    "cure_claim",
                    r"\b(?:cures?|cured)\b",
                    5.0,
                    Some(r"\b(?:no|not|never|cannot)\s+(?:a\s+)?cure"),
                ),
                risk("miracle_claim", r"\bmiracle\b", 3.0, None),
                risk(
                    "price_tag",
                    r"[$€£]\s?\d+(?:[.,]\d{2})?",
                    3.0,
                    Some(r"\b(?:donations?|grants?)\b"),
                ),
                risk(
                    "urgency",
                    r"\b(?:hurry|last chance|while supplies last)\b",
                    3.0,
                    None,
                ),
                risk(
                    "guarantee",
                    r"\bguaranteed?\b",
                    2.0,
                    Some(r"\b(?:no|not)\s+guaranteed?\b"),
                ),
            ],
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            strict_terms: owned(&[
                "buy",
                "purchase",
                "order",
                "sale",
                "discount",
                "price",
                "offer",
                "promo",
                "coupon",
                "deal",
                "shop",
                "cart",
                "checkout",
                "subscription",
                "free trial",
                "shipping",
                "money-back",
            ]),
            educational_disclaimers: owned(&[
                "non-commercial",
                "for educational purposes",
                "educational purposes only",
                "informational purposes only",
            ]),
            disclaimer_exempt_terms: owned(&["sale"]),
        }
    }
}

impl CompliancePolicy {
    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        toml::from_str(content).map_err(|e| AppError::PolicyFile(e.to_string()))
    }

    /// Load from `path` when given, otherwise the built-in policy.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::PolicyFile(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}
