use funnel_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid policy pattern '{pattern}': {source}")]
    Policy {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("policy file error: {0}")]
    PolicyFile(String),

    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
}
