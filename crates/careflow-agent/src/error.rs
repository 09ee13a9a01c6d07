//! Agent error types.
//!
//! All orchestration subsystems surface errors through [`AgentError`].  The
//! variants map onto the propagation policy: `Validation` and `Backend` stay
//! local to a step, `Planner` triggers the rule-based fallback, and the rest
//! terminate a single request (never the process).

use careflow_backend::BackendError;

/// Unified error type for the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The request was declined on disallowed-topic grounds.
    #[error("request refused: {reason}")]
    Refused { reason: String },

    /// An action's arguments failed pre-dispatch validation.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The backend collaborator raised during a call.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The intent named an action the dispatch table does not know.
    #[error("unsupported action: {name}")]
    UnsupportedAction { name: String },

    /// The planner was unreachable, timed out, or returned unusable text.
    /// Always recovered by falling back to the rule-based interpreter.
    #[error("planner failed: {reason}")]
    Planner { reason: String },

    /// Neither interpreter produced any intents.
    #[error("plan contains no actions")]
    EmptyPlan,

    /// Configuration loading or validation failed.
    #[error("config error: {reason}")]
    Config { reason: String },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.  Prefer a typed variant
    /// whenever possible.
    #[error("internal agent error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Planner {
            reason: err.to_string(),
        }
    }
}
