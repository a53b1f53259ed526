//! Game session side of the Minecraft chat relay.
//!
//! The protocol client itself is a black box behind [`GameConnector`] /
//! [`GameClient`]. This crate owns the single live session, reconnects it
//! forever, and buffers inbound chat for the agent to drain.

pub mod bridge;
pub mod client;
pub mod error;
pub mod intake;
#[cfg(any(test, feature = "test-support"))]
pub mod mocks;
pub mod session;

pub use bridge::BridgeConnector;
pub use client::{AuthMode, ConnectOptions, Connection, GameClient, GameConnector, SessionEvent};
pub use error::{Result, SessionError};
pub use intake::IntakeBuffer;
pub use session::{ChatSink, SessionHandle, SessionManager, SessionSettings};
