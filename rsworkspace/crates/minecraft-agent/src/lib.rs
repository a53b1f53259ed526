//! Chat relay between a Minecraft session and language-model backends.
//!
//! Inbound chat is buffered by `minecraft-bot`; this crate drains it,
//! decides who gets an answer, calls the backend and paces the reply.

pub mod bans;
pub mod codec;
pub mod config;
pub mod error;
pub mod outbound;
pub mod processor;
pub mod provider;
pub mod scheduler;
pub mod signal;
pub mod usage;

#[cfg(test)]
mod testing;

pub use bans::{AdminDirective, BanStorage, BanStore, JsonFileBanStorage};
pub use config::{ReadEnv, RelayConfig, SystemEnv};
pub use error::{BanStoreError, ConfigError, ProviderError};
pub use outbound::{OutputDispatcher, Route};
pub use processor::MessageProcessor;
pub use provider::{BackendTransport, Completion, HttpTransport, Provider, ProviderRegistry};
pub use scheduler::DrainScheduler;
pub use usage::{UsageReport, UsageStats};
