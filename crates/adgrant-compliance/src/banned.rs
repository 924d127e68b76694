use regex::Regex;

use crate::error::AppError;
use crate::policy::CompliancePolicy;
use crate::text::{canonical_term, compile_terms, PhraseList};

/// Strict banned-term detection over the whole text, without context windows.
///
/// Terms listed in `disclaimer_exempt_terms` are dropped when the text carries an
/// educational disclaimer anywhere.
#[derive(Debug, Clone)]
pub struct BannedTermDetector {
    terms: Option<Regex>,
    disclaimers: PhraseList,
    exempt: Vec<String>,
}

impl BannedTermDetector {
    pub fn new(policy: &CompliancePolicy) -> Result<Self, AppError> {
        Ok(Self {
            terms: compile_terms(&policy.strict_terms)?,
            disclaimers: PhraseList::new(&policy.educational_disclaimers),
            exempt: policy
                .disclaimer_exempt_terms
                .iter()
                .map(|t| canonical_term(t))
                .collect(),
        })
    }

    pub fn detect(&self, text: &str) -> Vec<String> {
        let Some(terms) = &self.terms else {
            return Vec::new();
        };

        let mut found: Vec<String> = Vec::new();
        for m in terms.find_iter(text) {
            let term = canonical_term(m.as_str());
            if !found.contains(&term) {
                found.push(term);
            }
        }

        if !found.is_empty() && self.disclaimers.contained_in(text) {
            found.retain(|t| !self.exempt.contains(t));
        }
        found
    }
}
