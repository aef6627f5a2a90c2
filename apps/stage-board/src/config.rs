use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline_client::{CandidateQuery, DEFAULT_TIMEOUT_SECS};

const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 1800;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline_api_url: String,
    pub pipeline_api_token: Option<String>,
    pub pipeline_timeout_secs: u64,
    pub candidate_status_filter: String,
    pub candidate_sort_by: String,
    pub candidate_sort_desc: bool,
    /// Board sessions untouched for this long are dropped.
    pub session_idle_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            pipeline_api_url: require_env("PIPELINE_API_URL")?,
            pipeline_api_token: optional_env("PIPELINE_API_TOKEN"),
            pipeline_timeout_secs: optional_env("PIPELINE_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("PIPELINE_TIMEOUT_SECS must be a whole number of seconds")?
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            candidate_status_filter: optional_env("CANDIDATE_STATUS_FILTER").unwrap_or_default(),
            candidate_sort_by: optional_env("CANDIDATE_SORT_BY").unwrap_or_default(),
            candidate_sort_desc: optional_env("CANDIDATE_SORT_DESC")
                .map(|v| parse_flag(&v))
                .transpose()
                .context("CANDIDATE_SORT_DESC must be true or false")?
                .unwrap_or(false),
            session_idle_ttl_secs: optional_env("SESSION_IDLE_TTL_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?
                .unwrap_or(DEFAULT_SESSION_IDLE_TTL_SECS),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_ttl_secs)
    }

    /// Filtering and ordering applied to every candidate listing.
    pub fn candidate_query(&self) -> CandidateQuery {
        CandidateQuery {
            status: self.candidate_status_filter.clone(),
            sort_by: self.candidate_sort_by.clone(),
            descending: self.candidate_sort_desc,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => anyhow::bail!("unrecognised flag value '{other}'"),
    }
}
