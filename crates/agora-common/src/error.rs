//! Agora Error Types
//!
//! Centralized error handling for all Agora components

use std::fmt;

/// Main error type for Agora operations
#[derive(Debug)]
pub enum AgoraError {
    /// Generic error with message
    Generic(String),
    /// IO-related errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(serde_json::Error),
    /// Configuration errors
    Config(String),
    /// Rejected discussion settings
    InvalidSettings(String),
    /// The send-message collaborator failed for an agent
    SendMessageFailed { agent_id: String, reason: String },
    /// Agent/persona related errors
    Agent(String),
}

impl fmt::Display for AgoraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgoraError::Generic(msg) => write!(f, "Agora error: {}", msg),
            AgoraError::Io(err) => write!(f, "IO error: {}", err),
            AgoraError::Serde(err) => write!(f, "Serialization error: {}", err),
            AgoraError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AgoraError::InvalidSettings(msg) => write!(f, "Invalid settings: {}", msg),
            AgoraError::SendMessageFailed { agent_id, reason } => {
                write!(f, "Failed to send message for agent {}: {}", agent_id, reason)
            }
            AgoraError::Agent(msg) => write!(f, "Agent error: {}", msg),
        }
    }
}

impl std::error::Error for AgoraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgoraError::Io(err) => Some(err),
            AgoraError::Serde(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience result type for Agora operations
pub type Result<T> = std::result::Result<T, AgoraError>;

impl From<std::io::Error> for AgoraError {
    fn from(err: std::io::Error) -> Self {
        AgoraError::Io(err)
    }
}

impl From<serde_json::Error> for AgoraError {
    fn from(err: serde_json::Error) -> Self {
        AgoraError::Serde(err)
    }
}

impl From<anyhow::Error> for AgoraError {
    fn from(err: anyhow::Error) -> Self {
        AgoraError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_failure_display_names_agent() {
        let err = AgoraError::SendMessageFailed {
            agent_id: "skeptic".to_string(),
            reason: "provider timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to send message for agent skeptic: provider timeout"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: AgoraError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("IO error"));
    }
}
