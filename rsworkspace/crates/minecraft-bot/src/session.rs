//! Session manager: owns the single live game connection.
//!
//! Flow per session:
//! 1. Tear down the previous session (unsubscribe, disconnect).
//! 2. Connect and subscribe to events.
//! 3. Pump events: chat/whisper land in the [`IntakeBuffer`], login resets the
//!    reconnect counter and sends the initial action.
//! 4. On end (or a failed connect) wait the fixed delay and start over. Forever.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use minecraft_types::ChatEvent;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::{ConnectOptions, GameClient, GameConnector, SessionEvent};
use crate::error::SessionError;
use crate::intake::IntakeBuffer;

/// Default pause between a disconnect and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Where outbound lines go. Implemented by [`SessionHandle`] in production.
pub trait ChatSink: Send + Sync + 'static {
    /// The bot's own name on the server, once known.
    fn username(&self) -> Option<String>;

    fn chat(&self, text: &str) -> Result<(), SessionError>;

    fn whisper(&self, target: &str, text: &str) -> Result<(), SessionError>;
}

struct HandleInner {
    client: RwLock<Option<Arc<dyn GameClient>>>,
    username: RwLock<Option<String>>,
    reconnect_attempts: AtomicU32,
}

/// Shared view of whichever session is live right now.
///
/// Every send goes through here, so a send issued after a reconnect reaches
/// the new session and a send issued while disconnected fails with
/// [`SessionError::NotConnected`].
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                client: RwLock::new(None),
                username: RwLock::new(None),
                reconnect_attempts: AtomicU32::new(0),
            }),
        }
    }

    /// Consecutive reconnects since the last successful login.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    fn current(&self) -> Option<Arc<dyn GameClient>> {
        self.inner
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, client: Option<Arc<dyn GameClient>>) -> Option<Arc<dyn GameClient>> {
        let mut slot = self
            .inner
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, client)
    }

    fn set_username(&self, username: &str) {
        *self
            .inner
            .username
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(username.to_string());
    }
}

impl ChatSink for SessionHandle {
    fn username(&self) -> Option<String> {
        self.inner
            .username
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn chat(&self, text: &str) -> Result<(), SessionError> {
        self.current().ok_or(SessionError::NotConnected)?.chat(text)
    }

    fn whisper(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.current()
            .ok_or(SessionError::NotConnected)?
            .whisper(target, text)
    }
}

/// Tunables for the session lifecycle.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub reconnect_delay: Duration,
    /// Sent once after every successful login.
    pub initial_action: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            initial_action: None,
        }
    }
}

enum Flow {
    Continue,
    Disconnected,
}

pub struct SessionManager<C: GameConnector> {
    connector: C,
    options: ConnectOptions,
    settings: SessionSettings,
    handle: SessionHandle,
    intake: IntakeBuffer,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl<C: GameConnector> SessionManager<C> {
    pub fn new(
        connector: C,
        options: ConnectOptions,
        settings: SessionSettings,
        intake: IntakeBuffer,
    ) -> Self {
        let handle = SessionHandle::new();
        handle.set_username(&options.username);
        Self {
            connector,
            options,
            settings,
            handle,
            intake,
            events: None,
        }
    }

    /// A handle that follows this manager's live session across reconnects.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Replace any prior session with a fresh one. Returns `false` when the
    /// connection could not be opened.
    pub async fn start(&mut self) -> bool {
        self.teardown();

        info!(
            host = %self.options.host,
            port = self.options.port,
            username = %self.options.username,
            "Connecting to game session"
        );

        match self.connector.connect(&self.options).await {
            Ok(connection) => {
                self.handle.install(Some(connection.client));
                self.events = Some(connection.events);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to open game session");
                false
            }
        }
    }

    /// Run forever: connect, pump events, reconnect after every disconnect.
    pub async fn run(mut self) {
        loop {
            if self.start().await {
                self.pump().await;
            }
            self.schedule_reconnect().await;
        }
    }

    async fn pump(&mut self) {
        let Some(mut events) = self.events.take() else {
            return;
        };
        while let Some(event) = events.recv().await {
            if let Flow::Disconnected = self.on_event(event) {
                return;
            }
        }
        info!("Game session event stream closed");
    }

    fn teardown(&mut self) {
        // Dropping the receiver unsubscribes from the old session.
        self.events = None;
        if let Some(previous) = self.handle.install(None) {
            debug!("Closing previous game session");
            previous.disconnect();
        }
    }

    fn on_event(&self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Login { username } => {
                info!(username = %username, "Logged in");
                self.handle.set_username(&username);
                self.handle.inner.reconnect_attempts.store(0, Ordering::SeqCst);
                if let Some(action) = self.settings.initial_action.as_deref()
                    && let Err(e) = self.handle.chat(action)
                {
                    warn!(error = %e, "Initial action failed");
                }
            }
            SessionEvent::Chat { username, message } => {
                self.intake.push(ChatEvent::public(username, message));
            }
            SessionEvent::Whisper { username, message } => {
                self.intake.push(ChatEvent::private(username, message));
            }
            SessionEvent::Message { text } => {
                debug!(text = %text, "Server message");
            }
            SessionEvent::Error { message } => {
                error!(error = %message, "Game session error");
            }
            SessionEvent::Kicked { reason } => {
                warn!(reason = %reason, "Kicked from game session");
            }
            SessionEvent::End => {
                info!("Disconnected from game session");
                return Flow::Disconnected;
            }
        }
        Flow::Continue
    }

    async fn schedule_reconnect(&mut self) {
        self.teardown();
        let attempt = self
            .handle
            .inner
            .reconnect_attempts
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        info!(
            attempt,
            delay = ?self.settings.reconnect_delay,
            "Reconnecting to game session"
        );
        tokio::time::sleep(self.settings.reconnect_delay).await;
    }
}
