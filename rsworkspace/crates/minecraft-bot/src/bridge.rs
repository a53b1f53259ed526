//! JSON-lines bridge to the game protocol client.
//!
//! The protocol client runs as a sidecar. We speak one JSON object per line
//! over TCP: `connect`/`chat`/`whisper`/`quit` out, lifecycle and chat events
//! in. EOF on the socket counts as `end`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::{AuthMode, ConnectOptions, Connection, GameClient, GameConnector, SessionEvent};
use crate::error::SessionError;

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum OutboundFrame {
    Connect {
        host: String,
        port: u16,
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        auth: AuthMode,
    },
    Chat {
        text: String,
    },
    Whisper {
        target: String,
        text: String,
    },
    Quit {},
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum InboundFrame {
    Login { username: String },
    Chat { username: String, message: String },
    Whisper { username: String, message: String },
    Message { text: String },
    Error { message: String },
    Kicked { reason: String },
    End {},
}

impl From<InboundFrame> for SessionEvent {
    fn from(frame: InboundFrame) -> Self {
        match frame {
            InboundFrame::Login { username } => Self::Login { username },
            InboundFrame::Chat { username, message } => Self::Chat { username, message },
            InboundFrame::Whisper { username, message } => Self::Whisper { username, message },
            InboundFrame::Message { text } => Self::Message { text },
            InboundFrame::Error { message } => Self::Error { message },
            InboundFrame::Kicked { reason } => Self::Kicked { reason },
            InboundFrame::End {} => Self::End,
        }
    }
}

/// Connects to the bridge sidecar at `addr` (`host:port`).
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    addr: String,
}

impl BridgeConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl GameConnector for BridgeConnector {
    async fn connect(&self, options: &ConnectOptions) -> Result<Connection, SessionError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| SessionError::Connect(format!("{}: {e}", self.addr)))?;
        let (read, write) = stream.into_split();

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        out_tx
            .send(OutboundFrame::Connect {
                host: options.host.clone(),
                port: options.port,
                username: options.username.clone(),
                password: options.password.clone(),
                auth: options.auth,
            })
            .map_err(|_| SessionError::Closed)?;

        tokio::spawn(write_frames(write, out_rx));
        tokio::spawn(read_frames(read, event_tx));

        Ok(Connection {
            client: Arc::new(BridgeClient { outbound: out_tx }),
            events: event_rx,
        })
    }
}

struct BridgeClient {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl BridgeClient {
    fn send(&self, frame: OutboundFrame) -> Result<(), SessionError> {
        self.outbound.send(frame).map_err(|_| SessionError::Closed)
    }
}

impl GameClient for BridgeClient {
    fn chat(&self, text: &str) -> Result<(), SessionError> {
        self.send(OutboundFrame::Chat {
            text: text.to_string(),
        })
    }

    fn whisper(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.send(OutboundFrame::Whisper {
            target: target.to_string(),
            text: text.to_string(),
        })
    }

    fn disconnect(&self) {
        let _ = self.send(OutboundFrame::Quit {});
    }
}

async fn write_frames(
    mut write: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    while let Some(frame) = frames.recv().await {
        let quit = matches!(frame, OutboundFrame::Quit {});
        let mut line = match serde_json::to_string(&frame) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize bridge frame");
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = write.write_all(line.as_bytes()).await {
            warn!(error = %e, "Bridge write failed");
            break;
        }
        if quit {
            let _ = write.shutdown().await;
            break;
        }
    }
    debug!("Bridge writer stopped");
}

/// Frames are split on raw newlines so a malformed frame (bad JSON or bad
/// UTF-8) surfaces as an `Error` event without ending the session.
async fn read_frames(read: OwnedReadHalf, events: mpsc::UnboundedSender<SessionEvent>) {
    let mut reader = BufReader::new(read);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.trim_ascii().is_empty() {
                    continue;
                }
                let event = match serde_json::from_slice::<InboundFrame>(&buf) {
                    Ok(frame) => SessionEvent::from(frame),
                    Err(e) => SessionEvent::Error {
                        message: format!("unparseable bridge frame: {e}"),
                    },
                };
                let ended = event == SessionEvent::End;
                if events.send(event).is_err() || ended {
                    return;
                }
            }
            Err(e) => {
                let _ = events.send(SessionEvent::Error {
                    message: format!("bridge read failed: {e}"),
                });
                break;
            }
        }
    }
    let _ = events.send(SessionEvent::End);
}
