//! The black-box game protocol client, seen from the relay.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Account authentication used when logging in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Online,
    #[default]
    Offline,
}

impl AuthMode {
    pub fn from_online_flag(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

/// Everything needed to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub auth: AuthMode,
}

/// Lifecycle and chat events emitted by a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Login { username: String },
    Chat { username: String, message: String },
    Whisper { username: String, message: String },
    /// Any other server-originated line.
    Message { text: String },
    Error { message: String },
    Kicked { reason: String },
    /// The connection ended. Nothing else arrives after this.
    End,
}

/// Outbound operations on one live session.
///
/// Sends are fire-and-forget: `Ok` means the line was handed to the
/// connection, not that the server accepted it.
pub trait GameClient: Send + Sync + 'static {
    fn chat(&self, text: &str) -> Result<(), SessionError>;

    fn whisper(&self, target: &str, text: &str) -> Result<(), SessionError>;

    /// Close the connection. Idempotent.
    fn disconnect(&self);
}

/// A freshly opened session: the client plus its event subscription.
/// Dropping `events` unsubscribes.
pub struct Connection {
    pub client: Arc<dyn GameClient>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Opens sessions. One implementation per transport.
pub trait GameConnector: Send + Sync + 'static {
    fn connect(
        &self,
        options: &ConnectOptions,
    ) -> impl Future<Output = Result<Connection, SessionError>> + Send;
}
