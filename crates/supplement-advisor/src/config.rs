use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::matcher::{ScoringMode, DEFAULT_LIMIT};

/// Application configuration loaded explicitly from environment variables.
///
/// Redis URL is optional; if absent, the server runs without caching.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    /// Catalog document to load instead of the embedded one.
    pub catalog_path: Option<PathBuf>,
    /// Maximum number of recommendations returned per request.
    pub recommendation_limit: usize,
    /// Upper bound of the per-candidate score jitter. `0.0` keeps ranking deterministic.
    pub jitter: f32,
}

impl Config {
    /// Optional:
    /// - `REDIS_URL`: Redis connection string
    /// - `SUPPLEMENT_CATALOG_PATH`: JSON catalog file (default: embedded catalog)
    /// - `RECOMMENDATION_LIMIT`: default 5, at least 1
    /// - `RECOMMENDATION_JITTER`: default 0, within `0..=1`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let catalog_path = match lookup("SUPPLEMENT_CATALOG_PATH") {
            Some(raw) if !raw.trim().is_empty() => {
                let path = Path::new(raw.trim()).to_path_buf();
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "catalog file not found: {}",
                        path.display()
                    )));
                }
                Some(path)
            }
            _ => None,
        };

        let recommendation_limit = match lookup("RECOMMENDATION_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "RECOMMENDATION_LIMIT must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => DEFAULT_LIMIT,
        };

        let jitter = match lookup("RECOMMENDATION_JITTER") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| (0.0..=1.0).contains(v))
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "RECOMMENDATION_JITTER must be a number within 0..=1, got '{raw}'"
                    ))
                })?,
            None => 0.0,
        };

        Ok(Self {
            redis_url: lookup("REDIS_URL"),
            catalog_path,
            recommendation_limit,
            jitter,
        })
    }

    pub fn scoring_mode(&self) -> ScoringMode {
        if self.jitter > 0.0 {
            ScoringMode::Jittered { max: self.jitter }
        } else {
            ScoringMode::Deterministic
        }
    }
}
