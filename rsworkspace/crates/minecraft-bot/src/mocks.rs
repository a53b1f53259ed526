//! In-memory doubles for unit testing without a game server.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! minecraft-bot = { path = "...", features = ["test-support"] }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::client::{ConnectOptions, Connection, GameClient, GameConnector, SessionEvent};
use crate::error::SessionError;
use crate::session::ChatSink;

// ── MockChatSink ──────────────────────────────────────────────────────────────

/// One outbound line as seen by a [`MockChatSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentLine {
    Chat(String),
    Whisper { target: String, text: String },
}

impl SentLine {
    pub fn text(&self) -> &str {
        match self {
            Self::Chat(text) => text,
            Self::Whisper { text, .. } => text,
        }
    }
}

/// Records every send together with the (tokio) instant it happened.
#[derive(Clone, Default)]
pub struct MockChatSink {
    username: Option<String>,
    sent: Arc<Mutex<Vec<(Instant, SentLine)>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl MockChatSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    /// Make any send whose text equals `text` fail.
    pub fn fail_on(&self, text: impl Into<String>) {
        self.failing.lock().unwrap().push(text.into());
    }

    pub fn sent(&self) -> Vec<SentLine> {
        self.sent.lock().unwrap().iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().iter().map(|l| l.text().to_string()).collect()
    }

    pub fn sent_with_times(&self) -> Vec<(Instant, SentLine)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().unwrap().is_empty()
    }

    fn record(&self, line: SentLine) -> Result<(), SessionError> {
        if self.failing.lock().unwrap().iter().any(|t| t == line.text()) {
            return Err(SessionError::Send(format!("rejected: {}", line.text())));
        }
        self.sent.lock().unwrap().push((Instant::now(), line));
        Ok(())
    }
}

impl ChatSink for MockChatSink {
    fn username(&self) -> Option<String> {
        self.username.clone()
    }

    fn chat(&self, text: &str) -> Result<(), SessionError> {
        self.record(SentLine::Chat(text.to_string()))
    }

    fn whisper(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.record(SentLine::Whisper {
            target: target.to_string(),
            text: text.to_string(),
        })
    }
}

// ── MockGameClient ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockGameClient {
    sent: Mutex<Vec<SentLine>>,
    disconnected: AtomicBool,
}

impl MockGameClient {
    pub fn chats(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|l| match l {
                SentLine::Chat(t) => Some(t.clone()),
                SentLine::Whisper { .. } => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<SentLine> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl GameClient for MockGameClient {
    fn chat(&self, text: &str) -> Result<(), SessionError> {
        if self.is_disconnected() {
            return Err(SessionError::Closed);
        }
        self.sent.lock().unwrap().push(SentLine::Chat(text.to_string()));
        Ok(())
    }

    fn whisper(&self, target: &str, text: &str) -> Result<(), SessionError> {
        if self.is_disconnected() {
            return Err(SessionError::Closed);
        }
        self.sent.lock().unwrap().push(SentLine::Whisper {
            target: target.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

// ── MockConnector ─────────────────────────────────────────────────────────────

/// What the next `connect` call does.
#[derive(Debug, Clone)]
pub enum Script {
    /// The connection attempt fails.
    Fail,
    /// Deliver these events. When `hold` is false the stream closes afterwards.
    Events { events: Vec<SessionEvent>, hold: bool },
}

impl Script {
    /// Deliver `events`, then close the stream.
    pub fn events(events: Vec<SessionEvent>) -> Self {
        Self::Events { events, hold: false }
    }

    /// Deliver `events`, then keep the session open indefinitely.
    pub fn hold(events: Vec<SessionEvent>) -> Self {
        Self::Events { events, hold: true }
    }
}

#[derive(Default)]
struct ConnectorState {
    scripts: VecDeque<Script>,
    clients: Vec<Arc<MockGameClient>>,
    connect_times: Vec<Instant>,
    held: Vec<mpsc::UnboundedSender<SessionEvent>>,
}

/// Plays back one [`Script`] per connection attempt. Once the scripts run
/// out every further connection is held open with no events.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectorState {
                scripts: scripts.into(),
                ..ConnectorState::default()
            })),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connect_times.len()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connect_times.clone()
    }

    /// The client handed out by the `index`-th successful connection.
    pub fn client(&self, index: usize) -> Arc<MockGameClient> {
        Arc::clone(&self.state.lock().unwrap().clients[index])
    }
}

impl GameConnector for MockConnector {
    async fn connect(&self, _options: &ConnectOptions) -> Result<Connection, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.connect_times.push(Instant::now());

        let script = state.scripts.pop_front().unwrap_or(Script::hold(vec![]));
        let (events, hold) = match script {
            Script::Fail => return Err(SessionError::Connect("scripted failure".into())),
            Script::Events { events, hold } => (events, hold),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            let _ = tx.send(event);
        }
        if hold {
            state.held.push(tx);
        }

        let client = Arc::new(MockGameClient::default());
        state.clients.push(Arc::clone(&client));
        Ok(Connection {
            client,
            events: rx,
        })
    }
}
