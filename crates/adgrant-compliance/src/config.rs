use std::path::{Path, PathBuf};

use funnel_common::session::DEFAULT_SESSION_TTL_SECS;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL. `None` keeps issue logs in memory only.
    pub redis_url: Option<String>,
    /// TOML policy file overriding the built-in lists.
    pub policy_path: Option<PathBuf>,
    pub session_ttl_secs: u64,
}

impl Config {
    /// Optional:
    /// - `REDIS_URL`: Redis connection string
    /// - `COMPLIANCE_POLICY_PATH`: TOML policy file (default: built-in policy)
    /// - `SESSION_TTL_SECS`: lifetime of persisted issue logs, default 86400
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let policy_path = match lookup("COMPLIANCE_POLICY_PATH") {
            Some(raw) if !raw.trim().is_empty() => {
                let path = Path::new(raw.trim()).to_path_buf();
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "policy file not found: {}",
                        path.display()
                    )));
                }
                Some(path)
            }
            _ => None,
        };

        let session_ttl_secs = match lookup("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "SESSION_TTL_SECS must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        Ok(Self {
            redis_url: lookup("REDIS_URL"),
            policy_path,
            session_ttl_secs,
        })
    }
}
