//! Process-wide configuration.
//!
//! Built once at startup and handed to the orchestrator; nothing in the
//! pipeline reads the environment directly.

use std::time::Duration;

use crate::backoff::BackoffPolicy;

pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_STUDENT_SECRET: &str = "STUDENT_SECRET";
pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";
pub const ENV_LLM_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_NOTIFY_MAX_ATTEMPTS: &str = "NOTIFY_MAX_ATTEMPTS";
pub const ENV_NOTIFY_BASE_DELAY_SECS: &str = "NOTIFY_BASE_DELAY_SECS";

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Errors raised while assembling configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Generation provider settings.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Repository host settings.
#[derive(Clone)]
pub struct GithubConfig {
    pub owner: String,
    pub token: String,
    pub api_url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub llm: LlmConfig,
    pub expected_secret: String,
    pub notify: BackoffPolicy,
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup (used by tests and the CLI).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let github = GithubConfig {
            owner: required(ENV_GITHUB_OWNER)?,
            token: required(ENV_GITHUB_TOKEN)?,
            api_url: optional(ENV_GITHUB_API_URL, DEFAULT_GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
        };
        let expected_secret = required(ENV_STUDENT_SECRET)?;
        let llm = LlmConfig {
            api_key: required(ENV_LLM_API_KEY)?,
            base_url: optional(ENV_LLM_BASE_URL, DEFAULT_LLM_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: optional(ENV_LLM_MODEL, DEFAULT_LLM_MODEL),
        };

        let mut notify = BackoffPolicy::default();
        if let Some(raw) = lookup(ENV_NOTIFY_MAX_ATTEMPTS) {
            let attempts: u32 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_NOTIFY_MAX_ATTEMPTS,
                reason: format!("{raw:?} is not a positive integer"),
            })?;
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    key: ENV_NOTIFY_MAX_ATTEMPTS,
                    reason: "must be at least 1".to_string(),
                });
            }
            notify.max_attempts = attempts;
        }
        if let Some(raw) = lookup(ENV_NOTIFY_BASE_DELAY_SECS) {
            let secs: f64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_NOTIFY_BASE_DELAY_SECS,
                reason: format!("{raw:?} is not a number of seconds"),
            })?;
            notify.base_delay = Duration::try_from_secs_f64(secs).map_err(|e| {
                ConfigError::Invalid {
                    key: ENV_NOTIFY_BASE_DELAY_SECS,
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(AppConfig {
            github,
            llm,
            expected_secret,
            notify,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("github_owner", &self.github.owner)
            .field("github_api_url", &self.github.api_url)
            .field("llm_base_url", &self.llm.base_url)
            .field("llm_model", &self.llm.model)
            .field("notify", &self.notify)
            .finish_non_exhaustive()
    }
}
