//! OpenAI-compatible chat-completion wire types.
//!
//! Every configured backend speaks this dialect, so one request/response shape
//! covers all of them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body POSTed to `<endpoint><path>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// A non-streaming request with one system turn and one user turn.
    pub fn new(model: impl Into<String>, system: &str, query: &str) -> Self {
        Self {
            model: model.into(),
            messages: vec![CompletionMessage::system(system), CompletionMessage::user(query)],
            stream: false,
        }
    }
}

/// Only the fields the relay reads. Everything else in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the backend returned one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.usage.and_then(|u| u.total_tokens)
    }
}
