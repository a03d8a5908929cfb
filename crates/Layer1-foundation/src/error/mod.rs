//! Error types for Baton
//!
//! Every layer reports through this one enum so a caller of `Swarm::run`
//! sees routing, registration and turn failures side by side.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Baton error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Context store
    // ========================================================================
    #[error("Context type error: key '{key}' expected {expected}, found {found}")]
    ContextType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    // ========================================================================
    // Routing / registration
    // ========================================================================
    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Registration error: {0}")]
    Registration(String),

    // ========================================================================
    // Turn execution
    // ========================================================================
    #[error("Agent turn failed: {agent} - {message}")]
    AgentTurn { agent: String, message: String },

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // Config
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that signal misconfiguration and must end a run without retry
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Routing(_) | Error::Registration(_))
    }

    /// Errors whose message is meant for the person driving the run
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::InvalidInput(_) | Error::Cancelled
        )
    }

    pub fn context_type(
        key: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Error::ContextType {
            key: key.into(),
            expected,
            found,
        }
    }

    pub fn agent_turn(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Error::AgentTurn {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::context_type("attempts", "integer", "string");
        assert_eq!(
            err.to_string(),
            "Context type error: key 'attempts' expected integer, found string"
        );

        let err = Error::agent_turn("processor", "upstream timeout");
        assert_eq!(
            err.to_string(),
            "Agent turn failed: processor - upstream timeout"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Routing("no fallback".into()).is_fatal());
        assert!(Error::Registration("unknown agent".into()).is_fatal());
        assert!(!Error::agent_turn("a", "b").is_fatal());
        assert!(!Error::Cancelled.is_fatal());
    }

    #[test]
    fn test_from_str() {
        let err: Error = "boom".into();
        assert!(matches!(err, Error::Internal(ref m) if m == "boom"));
        assert!(!err.is_user_facing());
    }
}
