//! Structured command response produced for the privileged in-game admin

use serde::{Deserialize, Serialize};

/// Leading character every executable game command must start with.
pub const COMMAND_MARKER: char = '/';

/// Commands to execute (in order) plus an optional chat reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<String>,
}

impl CommandResponse {
    /// A reply that carries only chat text.
    pub fn chat_only(chat: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            chat: Some(chat.into()),
        }
    }

    /// True when there is neither a command to run nor text to say.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.chat.is_none()
    }
}

/// Trim `raw` and make sure it starts with [`COMMAND_MARKER`].
pub fn normalize_command(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with(COMMAND_MARKER) {
        trimmed.to_string()
    } else {
        format!("{COMMAND_MARKER}{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_existing_marker() {
        assert_eq!(normalize_command("/time set day"), "/time set day");
    }

    #[test]
    fn normalize_adds_missing_marker() {
        assert_eq!(normalize_command("weather clear"), "/weather clear");
    }

    #[test]
    fn normalize_trims_before_checking() {
        assert_eq!(normalize_command("  /tp bob  "), "/tp bob");
        assert_eq!(normalize_command("  tp bob"), "/tp bob");
    }

    #[test]
    fn chat_only_has_no_commands() {
        let resp = CommandResponse::chat_only("hello");
        assert!(resp.commands.is_empty());
        assert_eq!(resp.chat.as_deref(), Some("hello"));
        assert!(!resp.is_empty());
    }

    #[test]
    fn default_is_empty() {
        assert!(CommandResponse::default().is_empty());
    }

    #[test]
    fn chat_omitted_from_json_when_none() {
        let resp = CommandResponse {
            commands: vec!["/say hi".into()],
            chat: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("chat"));
    }
}
