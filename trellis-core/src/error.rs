//! Error Types
//!
//! Tracking and triggering are total and never fail. Errors only surface at
//! the edges: component renders, scheduler flushes and configuration.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the runtime and the renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// A component's render function returned an error.
    #[error("component `{component}` failed to render: {source}")]
    Render {
        component: String,
        #[source]
        source: RenderError,
    },

    /// A component's render function panicked.
    #[error("component `{component}` panicked while rendering: {message}")]
    RenderPanic { component: String, message: String },

    /// A job kept re-queuing itself within one flush.
    #[error("maximum recursive updates exceeded: a job ran more than {limit} times in one flush")]
    RecursionLimit { limit: usize },

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Error returned by a component render function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for RenderError {
    fn from(message: &str) -> Self {
        Self(message.to_owned())
    }
}

impl From<String> for RenderError {
    fn from(message: String) -> Self {
        Self(message)
    }
}
