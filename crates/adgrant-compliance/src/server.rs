/// MCP server implementation for ad-grant compliance checks.
///
/// Stateless tools:
/// - `scan_text`: Banned terms with their context windows
/// - `assess_risk`: Weighted risk score of a text
/// - `detect_banned_terms`: Strict term list, no context exemptions
///
/// Session tools track issues found across the pages of a site:
/// - `start_session` / `end_session`
/// - `record_scan`: Scan a page and record its unsafe occurrences as issues
/// - `resolve_issue`, `list_issues`, `compliance_summary`
use std::collections::HashMap;
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use funnel_common::session::{new_session_id, unix_now, SessionId};

use crate::engine::ComplianceEngine;
use crate::error::AppError;
use crate::filter::ScanReport;
use crate::risk::RiskAssessment;
use crate::store::IssueStore;
use crate::tracker::{
    issues_from_scan, ComplianceIssue, ComplianceSummary, IssueLog, IssueRepository, Severity,
};

#[derive(Clone)]
pub struct ComplianceServer {
    engine: Arc<ComplianceEngine>,
    store: Arc<IssueStore>,
    sessions: Arc<RwLock<HashMap<SessionId, IssueLog>>>,
    tool_router: ToolRouter<ComplianceServer>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TextParams {
    text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SessionParams {
    session_id: SessionId,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RecordScanParams {
    session_id: SessionId,
    /// Page or element the text was taken from, e.g. "/landing#hero".
    location: String,
    text: String,
    /// critical, high, medium (default) or low.
    #[serde(default)]
    severity: Option<String>,
    /// Also record occurrences found in a safe context.
    #[serde(default)]
    include_safe: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ResolveIssueParams {
    session_id: SessionId,
    issue_id: String,
    /// Pass false to reopen. Defaults to true.
    #[serde(default)]
    resolved: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListIssuesParams {
    session_id: SessionId,
    #[serde(default)]
    include_resolved: Option<bool>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    /// Whether issue logs survive a restart.
    pub persistent: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct EndSessionResponse {
    pub session_id: SessionId,
    pub issues_dropped: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BannedTermsResponse {
    pub terms: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RecordScanResponse {
    pub session_id: SessionId,
    pub location: String,
    pub report: ScanReport,
    /// Issues added by this scan.
    pub new_issues: Vec<ComplianceIssue>,
    /// Occurrences already tracked from an earlier scan.
    pub duplicates: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct IssueListResponse {
    pub session_id: SessionId,
    pub issues: Vec<ComplianceIssue>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionSummaryResponse {
    pub session_id: SessionId,
    pub summary: ComplianceSummary,
}

fn required(value: &str, field: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(value.to_string())
}

/// Add each issue to the repository, keeping the ones that were new.
fn record_issues<R: IssueRepository>(
    repo: &mut R,
    issues: Vec<ComplianceIssue>,
) -> Vec<ComplianceIssue> {
    issues.into_iter().filter(|i| repo.add(i.clone())).collect()
}

impl ComplianceServer {
    pub fn new(engine: Arc<ComplianceEngine>, store: Arc<IssueStore>) -> Self {
        Self {
            engine,
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            tool_router: Self::tool_router(),
        }
    }

    /// Read a session without creating it in memory. A session held only by the store is
    /// read from there; an unknown one reads as empty.
    async fn read_session<T>(&self, session_id: &str, f: impl FnOnce(&IssueLog) -> T) -> T {
        {
            let sessions = self.sessions.read().await;
            if let Some(log) = sessions.get(session_id) {
                return f(log);
            }
        }
        let restored = self.store.load(session_id).await.unwrap_or_default();
        f(&restored)
    }

    /// Apply `f` to a session and persist the result. A session missing from memory is
    /// restored from the store (or started empty) and kept only when `f` succeeds.
    async fn update_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut IssueLog) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions.write().await;
        if let Some(log) = sessions.get_mut(session_id) {
            let out = f(&mut *log)?;
            self.store.save(session_id, log).await;
            return Ok(out);
        }

        let mut log = self.store.load(session_id).await.unwrap_or_default();
        let out = f(&mut log)?;
        self.store.save(session_id, &log).await;
        sessions.insert(session_id.to_string(), log);
        Ok(out)
    }

    pub async fn open_session(&self) -> StartSessionResponse {
        let session_id = new_session_id();
        let log = IssueLog::new();
        self.store.save(&session_id, &log).await;
        self.sessions.write().await.insert(session_id.clone(), log);
        info!(session_id = %session_id, "compliance session started");
        StartSessionResponse {
            session_id,
            persistent: self.store.is_persistent(),
        }
    }

    pub async fn close_session(&self, session_id: &str) -> EndSessionResponse {
        let removed = self.sessions.write().await.remove(session_id);
        let issues_dropped = match removed {
            Some(log) => log.len(),
            None => self.store.load(session_id).await.map_or(0, |log| log.len()),
        };
        self.store.delete(session_id).await;
        info!(session_id, issues_dropped, "compliance session ended");
        EndSessionResponse {
            session_id: session_id.to_string(),
            issues_dropped,
        }
    }

    pub async fn record_page(
        &self,
        session_id: &str,
        location: &str,
        text: &str,
        severity: Severity,
        include_safe: bool,
    ) -> Result<RecordScanResponse, AppError> {
        let report = self.engine.scan(text);
        let found = issues_from_scan(
            &report,
            location,
            severity,
            include_safe,
            unix_now().as_secs(),
        );
        let found_count = found.len();
        let new_issues = self
            .update_session(session_id, |log| Ok(record_issues(log, found)))
            .await?;
        let duplicates = found_count - new_issues.len();

        info!(
            session_id,
            location,
            terms = report.terms.len(),
            new_issues = new_issues.len(),
            duplicates,
            "scan recorded"
        );
        Ok(RecordScanResponse {
            session_id: session_id.to_string(),
            location: location.to_string(),
            report,
            new_issues,
            duplicates,
        })
    }

    pub async fn set_resolved(
        &self,
        session_id: &str,
        issue_id: &str,
        resolved: bool,
    ) -> Result<ComplianceIssue, AppError> {
        let issue = self
            .update_session(session_id, |log| log.resolve(issue_id, resolved).cloned())
            .await?;
        info!(session_id, issue_id, resolved, "issue updated");
        Ok(issue)
    }

    pub async fn session_issues(&self, session_id: &str, include_resolved: bool) -> Vec<ComplianceIssue> {
        self.read_session(session_id, |log| {
            let issues = if include_resolved {
                log.list_all()
            } else {
                log.list_active()
            };
            issues.into_iter().cloned().collect()
        })
        .await
    }

    pub async fn summary(&self, session_id: &str) -> ComplianceSummary {
        self.read_session(session_id, |log| log.summary()).await
    }
}

#[tool_router]
impl ComplianceServer {
    #[tool(description = "Start a compliance session. Issues recorded with record_scan are tracked per session.")]
    async fn start_session(&self) -> Result<Json<StartSessionResponse>, String> {
        Ok(Json(self.open_session().await))
    }

    #[tool(description = "End a compliance session and drop its recorded issues.")]
    async fn end_session(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<EndSessionResponse>, String> {
        let session_id = required(&params.session_id, "session_id")?;
        Ok(Json(self.close_session(&session_id).await))
    }

    #[tool(description = "Scan text for commercial banned terms. Each occurrence comes with its surrounding context; occurrences near a scientific or educational phrase are marked safe and left out of `terms`.")]
    async fn scan_text(
        &self,
        Parameters(params): Parameters<TextParams>,
    ) -> Result<Json<ScanReport>, String> {
        Ok(Json(self.engine.scan(&params.text)))
    }

    #[tool(description = "Score promotional risk of a text with weighted patterns (calls to buy, discounts, urgency, cure claims). `is_risky` is true when the score exceeds the policy threshold.")]
    async fn assess_risk(
        &self,
        Parameters(params): Parameters<TextParams>,
    ) -> Result<Json<RiskAssessment>, String> {
        Ok(Json(self.engine.assess_risk(&params.text)))
    }

    #[tool(description = "Detect terms from the strict commercial term list anywhere in the text. Only 'sale' is exempted, and only when the text carries an educational disclaimer.")]
    async fn detect_banned_terms(
        &self,
        Parameters(params): Parameters<TextParams>,
    ) -> Result<Json<BannedTermsResponse>, String> {
        Ok(Json(BannedTermsResponse {
            terms: self.engine.detect_banned_terms(&params.text),
        }))
    }

    #[tool(description = "Scan the text of a page location and record its unsafe banned-term occurrences as issues in the session. Re-scanning unchanged text does not duplicate issues.")]
    async fn record_scan(
        &self,
        Parameters(params): Parameters<RecordScanParams>,
    ) -> Result<Json<RecordScanResponse>, String> {
        let session_id = required(&params.session_id, "session_id")?;
        let location = required(&params.location, "location")?;
        let severity = match params.severity.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse::<Severity>().map_err(|e| e.to_string())?
            }
            _ => Severity::default(),
        };
        self.record_page(
            &session_id,
            &location,
            &params.text,
            severity,
            params.include_safe.unwrap_or(false),
        )
        .await
        .map(Json)
        .map_err(|e| e.to_string())
    }

    #[tool(description = "Mark a recorded issue as resolved, or reopen it with resolved=false.")]
    async fn resolve_issue(
        &self,
        Parameters(params): Parameters<ResolveIssueParams>,
    ) -> Result<Json<ComplianceIssue>, String> {
        let session_id = required(&params.session_id, "session_id")?;
        let issue_id = required(&params.issue_id, "issue_id")?;
        self.set_resolved(
            &session_id,
            &issue_id,
            params.resolved.unwrap_or(true),
        )
        .await
        .map(Json)
        .map_err(|e| e.to_string())
    }

    #[tool(description = "List the issues of a session in detection order. Resolved issues are included only when include_resolved is true.")]
    async fn list_issues(
        &self,
        Parameters(params): Parameters<ListIssuesParams>,
    ) -> Result<Json<IssueListResponse>, String> {
        let session_id = required(&params.session_id, "session_id")?;
        let issues = self
            .session_issues(&session_id, params.include_resolved.unwrap_or(false))
            .await;
        Ok(Json(IssueListResponse { session_id, issues }))
    }

    #[tool(description = "Summarize a session: total, active and resolved issues, with active issues counted by severity.")]
    async fn compliance_summary(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<SessionSummaryResponse>, String> {
        let session_id = required(&params.session_id, "session_id")?;
        let summary = self.summary(&session_id).await;
        Ok(Json(SessionSummaryResponse {
            session_id,
            summary,
        }))
    }
}

#[tool_handler]
impl ServerHandler for ComplianceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "adgrant-compliance".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Ad-grant compliance MCP server. Use scan_text, assess_risk and \
                 detect_banned_terms to check copy for commercial language. To track issues \
                 across pages, call start_session, then record_scan per page, and review with \
                 list_issues, resolve_issue and compliance_summary."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::policy::CompliancePolicy;
    use funnel_common::redis::RedisStore;

    fn server() -> ComplianceServer {
        let engine = Arc::new(ComplianceEngine::new(&CompliancePolicy::default()).unwrap());
        let store = Arc::new(IssueStore::new(RedisStore::disabled(), 60));
        ComplianceServer::new(engine, store)
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = ComplianceServer::tool_router().list_all();
        for name in [
            "start_session",
            "end_session",
            "scan_text",
            "assess_risk",
            "detect_banned_terms",
            "record_scan",
            "resolve_issue",
            "list_issues",
            "compliance_summary",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn rescanning_a_page_does_not_duplicate_issues() {
        let server = server();
        let session = server.open_session().await;
        assert!(!session.persistent);

        let text = "Limited offer: buy now!";
        let first = server
            .record_page(&session.session_id, "/landing", text, Severity::High, false)
            .await
            .unwrap();
        assert_eq!(first.new_issues.len(), 2);
        assert_eq!(first.duplicates, 0);

        let second = server
            .record_page(&session.session_id, "/landing", text, Severity::High, false)
            .await
            .unwrap();
        assert!(second.new_issues.is_empty());
        assert_eq!(second.duplicates, 2);
        assert_eq!(server.session_issues(&session.session_id, true).await.len(), 2);
    }

    #[tokio::test]
    async fn resolving_updates_the_summary() {
        let server = server();
        let session_id = server.open_session().await.session_id;
        let recorded = server
            .record_page(&session_id, "/pricing", "Huge discount today", Severity::Critical, false)
            .await
            .unwrap();
        let issue_id = recorded.new_issues[0].id.clone();

        let summary = server.summary(&session_id).await;
        assert_eq!(summary.active, 1);
        assert_eq!(summary.active_by_severity.critical, 1);

        let issue = server.set_resolved(&session_id, &issue_id, true).await.unwrap();
        assert!(issue.resolved);
        assert!(server.session_issues(&session_id, false).await.is_empty());
        assert_eq!(server.summary(&session_id).await.resolved, 1);

        assert!(matches!(
            server.set_resolved(&session_id, "nope", true).await,
            Err(AppError::IssueNotFound(_))
        ));
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_can_end() {
        let server = server();
        let a = server.open_session().await.session_id;
        let b = server.open_session().await.session_id;
        server
            .record_page(&a, "/", "Save with this coupon", Severity::Low, false)
            .await
            .unwrap();

        assert_eq!(server.session_issues(&a, false).await.len(), 2);
        assert!(server.session_issues(&b, false).await.is_empty());

        let ended = server.close_session(&a).await;
        assert_eq!(ended.issues_dropped, 2);
        assert_eq!(server.summary(&a).await.total, 0);
    }

    #[tokio::test]
    async fn reading_unknown_sessions_keeps_no_state() {
        let server = server();
        for i in 0..100 {
            let session_id = format!("unknown-{i}");
            assert_eq!(server.summary(&session_id).await.total, 0);
            assert!(server.session_issues(&session_id, true).await.is_empty());
        }
        assert!(server.sessions.read().await.is_empty());

        assert!(matches!(
            server.set_resolved("unknown-x", "nope", true).await,
            Err(AppError::IssueNotFound(_))
        ));
        assert!(server.sessions.read().await.is_empty());

        let known = server.open_session().await.session_id;
        server.summary(&known).await;
        assert_eq!(server.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn safe_occurrences_are_recorded_only_on_request() {
        let server = server();
        let session_id = server.open_session().await.session_id;
        let text = "According to studies, the offer was declined.";

        let skipped = server
            .record_page(&session_id, "/blog", text, Severity::Medium, false)
            .await
            .unwrap();
        assert!(skipped.new_issues.is_empty());
        assert_eq!(skipped.report.contexts.len(), 1);

        let kept = server
            .record_page(&session_id, "/blog", text, Severity::Medium, true)
            .await
            .unwrap();
        assert_eq!(kept.new_issues.len(), 1);
        assert!(kept.new_issues[0].is_safe);
    }

    #[test]
    fn required_fields_are_trimmed() {
        assert_eq!(required("  abc ", "session_id").unwrap(), "abc");
        assert_eq!(
            required("   ", "location").unwrap_err(),
            "location must not be empty"
        );
    }
}
