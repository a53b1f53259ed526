//! Shared types for the Minecraft chat relay

pub mod commands;
pub mod completion;
pub mod events;

pub use commands::{COMMAND_MARKER, CommandResponse, normalize_command};
pub use completion::{ChatCompletionRequest, ChatCompletionResponse, CompletionMessage, Usage};
pub use events::{Channel, ChatEvent};
