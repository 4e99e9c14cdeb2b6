//! Typed failures that `main` maps to user-facing messages and exit codes.
//!
//! Everything else flows through `anyhow::Error`; these variants are raised
//! into it and recovered with `downcast_ref` at the boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Invalid or conflicting job options, malformed e-mail, bad config file.
    #[error("{0}")]
    Configuration(String),

    /// A parameter lookup on a case missed.
    #[error("Case {trace}: Parameter {key} does not exist.")]
    NotFound { trace: String, key: String },

    /// A build, launcher or scheduler invocation could not complete.
    #[error("{tool}: {detail}")]
    ExternalTool { tool: String, detail: String },

    /// An engine method was called out of order.
    #[error("engine {operation} not allowed in state {state}")]
    Programming {
        operation: &'static str,
        state: String,
    },
}

impl ToolchainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn external(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Errors the user can fix themselves; rendered as a single line.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Programming { .. })
    }
}
