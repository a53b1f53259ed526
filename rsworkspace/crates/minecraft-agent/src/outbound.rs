//! Rate-limited delivery of replies and commands into the game.
//!
//! Deliveries are sequential within one call only. Concurrent tasks share the
//! dispatcher without coordination, so their lines may interleave.

use std::sync::Arc;
use std::time::Duration;

use minecraft_bot::ChatSink;
use minecraft_types::{ChatEvent, CommandResponse};
use tokio::time::sleep;
use tracing::{info, warn};

/// Where a reply goes: public chat, or a whisper back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Public,
    Private(String),
}

impl Route {
    /// Reply on the channel the event arrived on.
    pub fn reply_to(event: &ChatEvent) -> Self {
        if event.is_private() {
            Self::Private(event.sender.clone())
        } else {
            Self::Public
        }
    }
}

#[derive(Clone)]
pub struct OutputDispatcher {
    sink: Arc<dyn ChatSink>,
    line_delay: Duration,
    command_delay: Duration,
}

impl OutputDispatcher {
    pub fn new(sink: Arc<dyn ChatSink>, line_delay: Duration, command_delay: Duration) -> Self {
        Self {
            sink,
            line_delay,
            command_delay,
        }
    }

    /// Username of the live session, if logged in.
    pub fn own_username(&self) -> Option<String> {
        self.sink.username()
    }

    /// Send one line. Failures are logged, never retried.
    pub fn send_line(&self, route: &Route, text: &str) -> bool {
        let result = match route {
            Route::Public => self.sink.chat(text),
            Route::Private(target) => self.sink.whisper(target, text),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, ?route, "Failed to send line");
                false
            }
        }
    }

    /// Split `text` on newlines and send each non-blank line, pausing
    /// `line_delay` between consecutive sends.
    pub async fn deliver_lines(&self, route: &Route, text: &str) {
        let lines = text.split('\n').filter(|l| !l.trim().is_empty());
        for (i, line) in lines.enumerate() {
            if i > 0 {
                sleep(self.line_delay).await;
            }
            self.send_line(route, line.trim_end_matches('\r'));
        }
    }

    /// Run each command publicly, in order, pausing `command_delay` after each.
    pub async fn execute_commands(&self, commands: &[String]) {
        for command in commands {
            info!(command = %command, "Executing command");
            if let Err(e) = self.sink.chat(command) {
                warn!(error = %e, command = %command, "Command failed, continuing");
            }
            sleep(self.command_delay).await;
        }
    }

    /// Commands first (always public), then any chat on `route`.
    pub async fn deliver_response(&self, route: &Route, response: &CommandResponse) {
        self.execute_commands(&response.commands).await;
        if let Some(chat) = &response.chat {
            self.deliver_lines(route, chat).await;
        }
    }
}
