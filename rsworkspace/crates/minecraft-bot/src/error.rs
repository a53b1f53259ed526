//! Error types for minecraft-bot

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures at the game-session boundary. None of them are fatal.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not connected to the game session")]
    NotConnected,

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Session closed")]
    Closed,

    #[error("Send error: {0}")]
    Send(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        assert_eq!(
            SessionError::NotConnected.to_string(),
            "Not connected to the game session"
        );
    }

    #[test]
    fn test_connect_error_display() {
        let err = SessionError::Connect("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: SessionError = json_err.into();
        assert!(err.to_string().starts_with("Protocol error:"));
    }
}
