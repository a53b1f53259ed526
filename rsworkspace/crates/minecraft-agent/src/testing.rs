//! Scripted backend and wiring helpers for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use minecraft_bot::mocks::MockChatSink;

use crate::bans::{BanStorage, BanStore};
use crate::config::RelayConfig;
use crate::error::{BanStoreError, ProviderError};
use crate::outbound::OutputDispatcher;
use crate::processor::MessageProcessor;
use crate::provider::{BackendTransport, ProviderRegistry, TransportResponse};
use crate::usage::UsageStats;

pub(crate) const BOT_NAME: &str = "DeepBot";
pub(crate) const ADMIN: &str = "Steve";
pub(crate) const BOT_ADMIN: &str = "Alex";
pub(crate) const DELAY: Duration = Duration::from_millis(600);

/// Admin `Steve`, bot admin `Alex`, Gemini and Grok enabled.
pub(crate) fn relay_config() -> RelayConfig {
    let mut config = RelayConfig {
        admin_name: Some(ADMIN.into()),
        bot_admin: Some(BOT_ADMIN.into()),
        ..RelayConfig::default()
    };
    config.prompts.standard = "standard".into();
    config.prompts.admin = "admin {admin}".into();
    for provider in &mut config.providers {
        if provider.name == "Gemini" || provider.name == "Grok" {
            provider.api_key = Some(format!("{}-key", provider.name.to_lowercase()));
        }
    }
    config
}

pub(crate) fn memory_bans() -> BanStore {
    BanStore::open(Box::new(MemoryBanStorage))
}

pub(crate) fn build_processor(
    sink: &MockChatSink,
    transport: Arc<MockTransport>,
    bans: BanStore,
) -> MessageProcessor<Arc<MockTransport>> {
    let config = relay_config();
    let registry = ProviderRegistry::from_config(&config);
    let usage = Arc::new(UsageStats::new(
        registry.providers().iter().map(|p| p.name.clone()),
    ));
    let dispatcher = OutputDispatcher::new(Arc::new(sink.clone()), DELAY, DELAY);
    MessageProcessor::new(registry, transport, bans, usage, dispatcher, config.bot_admin)
}

/// Keeps nothing.
pub(crate) struct MemoryBanStorage;

impl BanStorage for MemoryBanStorage {
    fn load(&self) -> Result<Option<Vec<String>>, BanStoreError> {
        Ok(None)
    }

    fn save(&self, _names: &[String]) -> Result<(), BanStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

/// Plays back queued replies in order; an empty queue answers `"ok"`.
#[derive(Default)]
pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<Result<TransportResponse, ProviderError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits `delay` (tokio time) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reply_content(&self, content: &str, total_tokens: Option<u64>) {
        self.reply_raw(200, &completion_body(content, total_tokens));
    }

    pub fn reply_raw(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn fail(&self, error: ProviderError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub(crate) fn completion_body(content: &str, total_tokens: Option<u64>) -> String {
    let mut body = serde_json::json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    });
    if let Some(tokens) = total_tokens {
        body["usage"] = serde_json::json!({"total_tokens": tokens});
    }
    body.to_string()
}

impl BackendTransport for MockTransport {
    async fn call(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &serde_json::Value,
    ) -> Result<TransportResponse, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: body.clone(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(TransportResponse {
                status: 200,
                body: completion_body("ok", None),
            })
        })
    }
}
