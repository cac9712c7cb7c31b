//! Error types for the animator state machine.
//!
//! Every variant is a programmer or configuration error. Nothing is retried
//! internally; callers are expected to validate state tables and rules up front.

use serde::{Deserialize, Serialize};

/// Errors surfaced by state table construction, lifecycle calls and ticking.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimatorError {
    /// A state table defines one of the reserved transition targets.
    #[error("State name '{name}' is reserved and cannot be defined")]
    ReservedName { name: String },

    /// `start` or a transition/interrupt named a state the table does not have.
    #[error("State not found: {name}")]
    StateNotFound { name: String },

    /// The instance was used before `start` or after `stop`.
    #[error("Animator has not been started")]
    NotStarted,

    /// The resolution loop took more steps than allowed in a single tick.
    #[error("Iteration limit of {limit} steps exceeded in state '{state}'")]
    IterationLimitExceeded { state: String, limit: usize },

    /// `update` was called from inside one of the same instance's callbacks.
    #[error("Animator update re-entered from one of its own callbacks")]
    ReentrantUpdate,

    /// An easing name was not registered.
    #[error("Easing function not found: {name}")]
    EasingNotFound { name: String },

    /// A timing value or config field is out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON config or stored state table could not be read.
    #[error("Parse error: {reason}")]
    Parse { reason: String },
}

impl AnimatorError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ReservedName { .. } | Self::InvalidConfig { .. } | Self::Parse { .. } => {
                "config"
            }
            Self::StateNotFound { .. } | Self::EasingNotFound { .. } => "lookup",
            Self::NotStarted | Self::ReentrantUpdate => "lifecycle",
            Self::IterationLimitExceeded { .. } => "runaway",
        }
    }

    pub(crate) fn state_not_found(name: impl Into<String>) -> Self {
        Self::StateNotFound { name: name.into() }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AnimatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}
