//! Error types for the switchboard crate.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed tool/resource descriptor or request parameters
    #[error("validation error: {0}")]
    Validation(String),

    /// Invocation of an unregistered tool
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Retrieval of an unregistered resource
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Lookup of an unregistered agent
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// Failure raised inside a tool or route handler
    #[error("handler error: {0}")]
    Handler(String),

    /// Failure raised inside a resource handler
    #[error("resource '{name}' failed: {message}")]
    Resource { name: String, message: String },

    /// Agent failed to start
    #[error("agent '{agent_id}' failed to start: {message}")]
    Startup { agent_id: String, message: String },

    /// Configuration error
    #[error("config error: {0}")]
    ConfigError(String),

    /// Transport or social platform I/O failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Shorthand for handler failures built from any displayable value
    pub fn handler(msg: impl std::fmt::Display) -> Self {
        ApiError::Handler(msg.to_string())
    }

    /// True for the not-found family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::ToolNotFound(_) | ApiError::ResourceNotFound(_) | ApiError::AgentNotFound(_)
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        assert!(ApiError::ToolNotFound("x".into()).is_not_found());
        assert!(ApiError::ResourceNotFound("x".into()).is_not_found());
        assert!(ApiError::AgentNotFound("x".into()).is_not_found());
        assert!(!ApiError::handler("boom").is_not_found());
    }

    #[test]
    fn test_display_messages() {
        let err = ApiError::Resource {
            name: "stats".to_string(),
            message: "db down".to_string(),
        };
        assert_eq!(err.to_string(), "resource 'stats' failed: db down");

        let err = ApiError::Startup {
            agent_id: "content".to_string(),
            message: "bad tool".to_string(),
        };
        assert!(err.to_string().contains("content"));
    }
}
