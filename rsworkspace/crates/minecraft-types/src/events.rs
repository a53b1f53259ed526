//! Chat events captured from the game session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a message reached the bot, and therefore how a reply goes back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Public chat, visible to every player.
    Public,
    /// A whisper addressed to the bot.
    Private,
}

/// A single chat line from another player. Immutable once captured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEvent {
    pub sender: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
    pub channel: Channel,
}

impl ChatEvent {
    /// Capture a public chat line, stamped with the current time.
    pub fn public(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(sender, body, Channel::Public)
    }

    /// Capture a whisper, stamped with the current time.
    pub fn private(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(sender, body, Channel::Private)
    }

    pub fn new(sender: impl Into<String>, body: impl Into<String>, channel: Channel) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            received_at: Utc::now(),
            channel,
        }
    }

    pub fn is_private(&self) -> bool {
        self.channel == Channel::Private
    }
}
