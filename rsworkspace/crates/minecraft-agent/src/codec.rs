//! Command protocol codec for replies to the privileged admin.
//!
//! The model is asked for `{"commands": [...], "chat": "..."}`. When the reply
//! is not that shape we fall back to splitting on `&` and keeping only the
//! segments that look like commands.

use minecraft_types::{COMMAND_MARKER, CommandResponse, normalize_command};
use tracing::debug;

/// Separator used by the fallback grammar.
pub const FALLBACK_SEPARATOR: char = '&';

/// Decode a backend reply. Never fails: malformed input takes the fallback path.
pub fn decode(raw: &str) -> CommandResponse {
    match parse_structured(raw) {
        Some(response) => response,
        None => {
            debug!("Reply is not structured, using fallback grammar");
            parse_fallback(raw)
        }
    }
}

/// `Some` only for a JSON object whose `commands` field is an array.
pub fn parse_structured(raw: &str) -> Option<CommandResponse> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    let commands = value.get("commands")?.as_array()?;

    let commands = commands
        .iter()
        .filter_map(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(normalize_command)
        .collect();
    let chat = value
        .get("chat")
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string);

    Some(CommandResponse { commands, chat })
}

/// Segments starting with the command marker become commands; the rest is
/// dropped. With no command segment at all, the whole reply is chat.
pub fn parse_fallback(raw: &str) -> CommandResponse {
    let commands: Vec<String> = raw
        .split(FALLBACK_SEPARATOR)
        .map(str::trim)
        .filter(|s| s.starts_with(COMMAND_MARKER))
        .map(str::to_string)
        .collect();

    if !commands.is_empty() {
        return CommandResponse {
            commands,
            chat: None,
        };
    }
    if raw.trim().is_empty() {
        return CommandResponse::default();
    }
    CommandResponse::chat_only(raw)
}
