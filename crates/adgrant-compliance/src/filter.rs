/// Banned-term scan with contextual allow-listing.
///
/// Every banned-term match gets a context window of `context_radius` characters on each side.
/// If the window contains a safe-context phrase the occurrence is recorded as safe and does
/// not count towards `terms`; `terms` lists each unsafe term once, in order of first
/// appearance.
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::policy::CompliancePolicy;
use crate::text::{canonical_term, compile_terms, window_bounds, PhraseList};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TermContext {
    /// Matched term, lowercased.
    pub term: String,
    /// Text surrounding the match.
    pub context: String,
    /// True when the context contains a safe-context phrase.
    pub is_safe: bool,
    /// Byte offset of the match in the scanned text.
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScanReport {
    /// Distinct flagged terms.
    pub terms: Vec<String>,
    /// Every occurrence, safe or not.
    pub contexts: Vec<TermContext>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn unsafe_contexts(&self) -> impl Iterator<Item = &TermContext> {
        self.contexts.iter().filter(|c| !c.is_safe)
    }
}

#[derive(Debug, Clone)]
pub struct ComplianceFilter {
    banned: Option<Regex>,
    safe_contexts: PhraseList,
    radius: usize,
}

impl ComplianceFilter {
    pub fn new(policy: &CompliancePolicy) -> Result<Self, AppError> {
        Ok(Self {
            banned: compile_terms(&policy.banned_terms)?,
            safe_contexts: PhraseList::new(&policy.safe_contexts),
            radius: policy.context_radius,
        })
    }

    pub fn scan(&self, text: &str) -> ScanReport {
        let Some(banned) = &self.banned else {
            return ScanReport::default();
        };

        let mut report = ScanReport::default();
        for m in banned.find_iter(text) {
            let (from, to) = window_bounds(text, m.start(), m.end(), self.radius);
            let context = &text[from..to];
            let is_safe = self.safe_contexts.contained_in(context);
            let term = canonical_term(m.as_str());

            if !is_safe && !report.terms.contains(&term) {
                report.terms.push(term.clone());
            }
            report.contexts.push(TermContext {
                term,
                context: context.to_string(),
                is_safe,
                start: m.start(),
                end: m.end(),
            });
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ComplianceFilter {
        ComplianceFilter::new(&CompliancePolicy::default()).unwrap()
    }

    #[test]
    fn flags_promotional_copy() {
        let report = filter().scan("Limited offer: buy now and save on this exclusive promo!");
        for term in ["offer", "buy", "promo", "save", "exclusive"] {
            assert!(report.terms.contains(&term.to_string()), "missing {term}");
        }
        assert!(report.contexts.iter().all(|c| !c.is_safe));
        assert!(!report.is_clean());
    }

    #[test]
    fn safe_context_suppresses_the_term() {
        let report = filter().scan("According to studies, the offer demonstrated no effect.");
        assert!(report.terms.is_empty());
        assert_eq!(report.contexts.len(), 1);
        assert_eq!(report.contexts[0].term, "offer");
        assert!(report.contexts[0].is_safe);
    }

    #[test]
    fn repeated_terms_are_reported_once() {
        let report = filter().scan("Discount here. Another DISCOUNT there. discount everywhere.");
        assert_eq!(report.terms, vec!["discount".to_string()]);
        assert_eq!(report.contexts.len(), 3);
        assert_eq!(report.unsafe_contexts().count(), 3);
    }

    #[test]
    fn safe_phrase_outside_the_window_does_not_help() {
        let padding = "x".repeat(80);
        let text = format!("A scientific study was published. {padding} Big sale this week.");
        let report = filter().scan(&text);
        assert_eq!(report.terms, vec!["sale".to_string()]);
    }

    #[test]
    fn mixed_occurrences_keep_the_unsafe_one() {
        let padding = "y".repeat(80);
        let text = format!("In a clinical trial the price was irrelevant. {padding} Check our price!");
        let report = filter().scan(&text);
        assert_eq!(report.terms, vec!["price".to_string()]);
        assert!(report.contexts[0].is_safe);
        assert!(!report.contexts[1].is_safe);
    }

    #[test]
    fn clean_and_empty_text_scan_clean() {
        assert!(filter().scan("").is_clean());
        let report = filter().scan("Magnesium supports restful sleep.");
        assert!(report.contexts.is_empty());
        // "wholesale" must not trip "sale"
        assert!(filter().scan("Wholesale nutrition facts").contexts.is_empty());
    }

    #[test]
    fn context_is_clamped_around_the_match() {
        let text = format!("{}buy{}", "a ".repeat(40), " b".repeat(40));
        let report = filter().scan(&text);
        let context = &report.contexts[0].context;
        assert_eq!(context.chars().count(), 50 + 3 + 50);
        assert_eq!(&text[report.contexts[0].start..report.contexts[0].end], "buy");
    }

    #[test]
    fn empty_term_list_never_matches() {
        let policy = CompliancePolicy {
            banned_terms: vec![],
            ..CompliancePolicy::default()
        };
        let filter = ComplianceFilter::new(&policy).unwrap();
        assert_eq!(filter.scan("buy now"), ScanReport::default());
    }
}
