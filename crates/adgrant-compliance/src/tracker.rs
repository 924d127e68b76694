/// Compliance issue tracking.
///
/// An issue is one unsafe banned-term occurrence found on a page location. Its id is a stable
/// digest of `location|term|context`, so scanning the same page twice records it once.
/// Severity is chosen by the caller when the scan is recorded.
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use funnel_common::session::stable_digest;

use crate::error::AppError;
use crate::filter::ScanReport;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(AppError::UnknownSeverity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceIssue {
    pub id: String,
    pub term: String,
    pub context: String,
    pub is_safe: bool,
    pub severity: Severity,
    /// Page or element the text came from.
    pub location: String,
    /// Unix seconds.
    pub detected_at: u64,
    pub resolved: bool,
}

impl ComplianceIssue {
    pub fn issue_id(location: &str, term: &str, context: &str) -> String {
        stable_digest(&[location, term, context])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceSummary {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    /// Unresolved issues by severity.
    pub active_by_severity: SeverityCounts,
}

/// Storage for the issues of one session.
pub trait IssueRepository {
    /// Insert an issue. Returns `false` when an issue with the same id already exists.
    fn add(&mut self, issue: ComplianceIssue) -> bool;

    /// Mark an issue resolved or reopen it.
    fn resolve(&mut self, id: &str, resolved: bool) -> Result<&ComplianceIssue, AppError>;

    fn list_all(&self) -> Vec<&ComplianceIssue>;

    fn list_active(&self) -> Vec<&ComplianceIssue> {
        self.list_all().into_iter().filter(|i| !i.resolved).collect()
    }

    fn summary(&self) -> ComplianceSummary {
        let mut summary = ComplianceSummary::default();
        for issue in self.list_all() {
            summary.total += 1;
            if issue.resolved {
                summary.resolved += 1;
            } else {
                summary.active += 1;
                summary.active_by_severity.bump(issue.severity);
            }
        }
        summary
    }
}

/// In-memory issue log, kept in detection order. Serializable so a session can be persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueLog {
    issues: Vec<ComplianceIssue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl IssueRepository for IssueLog {
    fn add(&mut self, issue: ComplianceIssue) -> bool {
        if self.issues.iter().any(|i| i.id == issue.id) {
            return false;
        }
        self.issues.push(issue);
        true
    }

    fn resolve(&mut self, id: &str, resolved: bool) -> Result<&ComplianceIssue, AppError> {
        let issue = self
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::IssueNotFound(id.to_string()))?;
        issue.resolved = resolved;
        Ok(issue)
    }

    fn list_all(&self) -> Vec<&ComplianceIssue> {
        self.issues.iter().collect()
    }
}

/// Turn the occurrences of a scan into issues. Safe occurrences are skipped unless
/// `include_safe` is set.
pub fn issues_from_scan(
    report: &ScanReport,
    location: &str,
    severity: Severity,
    include_safe: bool,
    detected_at: u64,
) -> Vec<ComplianceIssue> {
    report
        .contexts
        .iter()
        .filter(|c| include_safe || !c.is_safe)
        .map(|c| ComplianceIssue {
            id: ComplianceIssue::issue_id(location, &c.term, &c.context),
            term: c.term.clone(),
            context: c.context.clone(),
            is_safe: c.is_safe,
            severity,
            location: location.to_string(),
            detected_at,
            resolved: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TermContext;

    fn issue(term: &str, severity: Severity) -> ComplianceIssue {
        ComplianceIssue {
            id: ComplianceIssue::issue_id("/landing", term, "ctx"),
            term: term.to_string(),
            context: "ctx".to_string(),
            is_safe: false,
            severity,
            location: "/landing".to_string(),
            detected_at: 1_700_000_000,
            resolved: false,
        }
    }

    fn occurrence(term: &str, context: &str, is_safe: bool) -> TermContext {
        TermContext {
            term: term.to_string(),
            context: context.to_string(),
            is_safe,
            start: 0,
            end: term.len(),
        }
    }

    #[test]
    fn severity_parses_and_serializes_lowercase() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!(matches!(
            "urgent".parse::<Severity>(),
            Err(AppError::UnknownSeverity(_))
        ));
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(Severity::default(), Severity::Medium);
    }

    #[test]
    fn duplicate_ids_are_not_added_twice() {
        let mut log = IssueLog::new();
        assert!(log.add(issue("buy", Severity::High)));
        assert!(!log.add(issue("buy", Severity::Low)));
        assert_eq!(log.len(), 1);
        assert_eq!(log.list_all()[0].severity, Severity::High);
    }

    #[test]
    fn resolve_moves_issue_out_of_active() {
        let mut log = IssueLog::new();
        let buy = issue("buy", Severity::High);
        let id = buy.id.clone();
        log.add(buy);
        log.add(issue("sale", Severity::Low));

        assert!(log.resolve(&id, true).unwrap().resolved);
        let active: Vec<&str> = log.list_active().iter().map(|i| i.term.as_str()).collect();
        assert_eq!(active, vec!["sale"]);

        log.resolve(&id, false).unwrap();
        assert_eq!(log.list_active().len(), 2);
    }

    #[test]
    fn resolve_unknown_id_is_an_error() {
        let mut log = IssueLog::new();
        assert!(matches!(
            log.resolve("missing", true),
            Err(AppError::IssueNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn summary_counts_active_issues_by_severity() {
        let mut log = IssueLog::new();
        log.add(issue("buy", Severity::Critical));
        log.add(issue("sale", Severity::High));
        log.add(issue("promo", Severity::High));
        let promo_id = ComplianceIssue::issue_id("/landing", "promo", "ctx");
        log.resolve(&promo_id, true).unwrap();

        let summary = log.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(
            summary.active_by_severity,
            SeverityCounts {
                critical: 1,
                high: 1,
                medium: 0,
                low: 0
            }
        );
    }

    #[test]
    fn scan_conversion_skips_safe_occurrences_by_default() {
        let report = ScanReport {
            terms: vec!["buy".to_string()],
            contexts: vec![
                occurrence("offer", "according to studies, the offer", true),
                occurrence("buy", "buy now", false),
            ],
        };
        let issues = issues_from_scan(&report, "/home", Severity::High, false, 42);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].term, "buy");
        assert_eq!(issues[0].id, ComplianceIssue::issue_id("/home", "buy", "buy now"));
        assert_eq!(issues[0].detected_at, 42);

        let all = issues_from_scan(&report, "/home", Severity::High, true, 42);
        assert_eq!(all.len(), 2);
        assert!(all[0].is_safe);
    }

    #[test]
    fn same_term_on_other_location_is_a_new_issue() {
        assert_ne!(
            ComplianceIssue::issue_id("/a", "buy", "buy now"),
            ComplianceIssue::issue_id("/b", "buy", "buy now")
        );
    }
}
