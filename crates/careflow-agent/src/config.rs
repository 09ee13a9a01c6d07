//! Engine configuration.

use std::time::Duration;

use crate::error::{AgentError, Result};

/// Configuration for the request coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// When set, every action reports what it *would* do instead of calling
    /// the backend.  Checked after validation, before dispatch.
    pub dry_run: bool,

    /// Upper bound on a single planner invocation.  On expiry the request
    /// falls back to the rule-based interpreter.
    pub planner_timeout: Duration,

    /// Maximum number of actions executed per request; longer plans are
    /// truncated with a warning.
    pub max_actions: usize,

    /// Model identifier sent to the planner backend.
    pub model: String,

    /// Base URL of the OpenAI-compatible planner endpoint.
    pub planner_base_url: String,

    /// API key for the planner endpoint.  Absent key means the planner is
    /// disabled and every request takes the rule-based path.
    pub planner_api_key: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            planner_timeout: Duration::from_secs(30),
            max_actions: 5,
            model: "gpt-4o-mini".to_string(),
            planner_base_url: "https://api.openai.com/v1".to_string(),
            planner_api_key: None,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from `CAREFLOW_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("CAREFLOW_DRY_RUN") {
            config.dry_run = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Ok(v) = std::env::var("CAREFLOW_PLANNER_TIMEOUT_SECS") {
            let secs: u64 = v.parse().map_err(|_| AgentError::Config {
                reason: format!("CAREFLOW_PLANNER_TIMEOUT_SECS is not a number: {v}"),
            })?;
            config.planner_timeout = Duration::from_secs(secs);
        }
        if let Ok(v) = std::env::var("CAREFLOW_MAX_ACTIONS") {
            config.max_actions = v.parse().map_err(|_| AgentError::Config {
                reason: format!("CAREFLOW_MAX_ACTIONS is not a number: {v}"),
            })?;
        }
        if let Ok(v) = std::env::var("CAREFLOW_MODEL") {
            config.model = v;
        }
        if let Ok(v) = std::env::var("CAREFLOW_PLANNER_URL") {
            config.planner_base_url = v;
        }
        if let Ok(v) = std::env::var("CAREFLOW_API_KEY")
            && !v.is_empty()
        {
            config.planner_api_key = Some(v);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = CoordinatorConfig::default();
        assert!(!config.dry_run);
        assert_eq!(config.max_actions, 5);
        assert_eq!(config.planner_timeout, Duration::from_secs(30));
        assert!(config.planner_api_key.is_none());
    }
}
