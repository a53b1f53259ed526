//! End-to-end test for the relay pipeline.
//!
//! Run with:
//!   cargo test -p minecraft-agent --test relay_e2e
//!
//! What this test verifies:
//!   1. Chat arriving on the game session lands in the intake buffer
//!   2. The drain scheduler hands it to the processor
//!   3. The processor calls the (mocked) backend over real HTTP
//!   4. Acknowledgment, commands and reply go back out through the session

use std::sync::Arc;
use std::time::Duration;

use minecraft_agent::{
    BanStore, DrainScheduler, HttpTransport, JsonFileBanStorage, MessageProcessor, OutputDispatcher,
    ProviderRegistry, RelayConfig, UsageStats,
};
use minecraft_bot::mocks::{MockConnector, Script};
use minecraft_bot::{IntakeBuffer, SessionEvent, SessionManager};
use tempfile::TempDir;

// ── Shared helper ─────────────────────────────────────────────────────────────

struct Relay {
    connector: MockConnector,
    usage: Arc<UsageStats>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    _dir: TempDir,
}

impl Drop for Relay {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn start_relay(base_url: &str, events: Vec<SessionEvent>) -> Relay {
    let dir = TempDir::new().unwrap();
    let mut config = RelayConfig {
        admin_name: Some("Steve".into()),
        ban_file: dir.path().join("banned.json"),
        ..RelayConfig::default()
    };
    config.timing.drain_interval_ms = 20;
    config.timing.line_delay_ms = 5;
    config.timing.command_delay_ms = 5;
    config.timing.reconnect_delay_ms = 50;
    let gemini = config.providers.iter_mut().find(|p| p.name == "Gemini").unwrap();
    gemini.endpoint = base_url.to_string();
    gemini.api_key = Some("test-key".into());

    let connector = MockConnector::new(vec![Script::hold(events)]);
    let intake = IntakeBuffer::new();
    let manager = SessionManager::new(
        connector.clone(),
        config.game.connect_options(),
        config.session_settings(),
        intake.clone(),
    );

    let registry = ProviderRegistry::from_config(&config);
    let usage = Arc::new(UsageStats::new(
        registry.providers().iter().map(|p| p.name.clone()),
    ));
    let dispatcher = OutputDispatcher::new(
        Arc::new(manager.handle()),
        config.timing.line_delay(),
        config.timing.command_delay(),
    );
    let processor = Arc::new(MessageProcessor::new(
        registry,
        HttpTransport::new(),
        BanStore::open(Box::new(JsonFileBanStorage::new(&config.ban_file))),
        Arc::clone(&usage),
        dispatcher,
        config.bot_admin.clone(),
    ));
    let scheduler = DrainScheduler::new(intake, processor, config.timing.drain_interval());

    Relay {
        connector,
        usage,
        tasks: vec![tokio::spawn(manager.run()), tokio::spawn(scheduler.run())],
        _dir: dir,
    }
}

async fn wait_for_chats(relay: &Relay, count: usize) -> Vec<String> {
    for _ in 0..200 {
        if relay.connector.connect_count() > 0 {
            let chats = relay.connector.client(0).chats();
            if chats.len() >= count {
                return chats;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {count} chat lines");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_question_is_answered_through_the_session() {
    let mock_server = httpmock::MockServer::start_async().await;
    let mock = mock_server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .body_contains("where do I find diamonds?");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    "{\"choices\":[{\"message\":{\"content\":\"Deep underground.\\nBring iron.\"}}],\
                     \"usage\":{\"total_tokens\":17}}",
                );
        })
        .await;

    let relay = start_relay(
        &mock_server.base_url(),
        vec![
            SessionEvent::Login { username: "DeepBot".into() },
            SessionEvent::Chat {
                username: "alice".into(),
                message: "#gemini where do I find diamonds?".into(),
            },
        ],
    );

    let chats = wait_for_chats(&relay, 3).await;
    assert_eq!(
        chats,
        vec!["Received, thinking...", "Deep underground.", "Bring iron."]
    );
    mock.assert_async().await;
    assert_eq!(relay.usage.calls("Gemini"), 1);
    assert_eq!(relay.usage.total_tokens(), 17);
}

#[tokio::test]
async fn admin_request_executes_commands() {
    let mock_server = httpmock::MockServer::start_async().await;
    mock_server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/chat/completions");
            then.status(200).header("content-type", "application/json").body(
                r#"{"choices":[{"message":{"content":
                    "{\"commands\":[\"time set day\",\"/weather clear\"],\"chat\":\"Done.\"}"}}]}"#,
            );
        })
        .await;

    let relay = start_relay(
        &mock_server.base_url(),
        vec![
            SessionEvent::Login { username: "DeepBot".into() },
            SessionEvent::Chat {
                username: "Steve".into(),
                message: "#gemini make it a sunny day".into(),
            },
        ],
    );

    let chats = wait_for_chats(&relay, 4).await;
    assert_eq!(
        chats,
        vec!["Received, thinking...", "/time set day", "/weather clear", "Done."]
    );
}

#[tokio::test]
async fn backend_error_is_reported_to_sender() {
    let mock_server = httpmock::MockServer::start_async().await;
    mock_server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/chat/completions");
            then.status(503).body("upstream overloaded");
        })
        .await;

    let relay = start_relay(
        &mock_server.base_url(),
        vec![
            SessionEvent::Login { username: "DeepBot".into() },
            SessionEvent::Chat {
                username: "alice".into(),
                message: "#gemini hello?".into(),
            },
        ],
    );

    let chats = wait_for_chats(&relay, 2).await;
    assert_eq!(chats[1], "Gemini request failed: HTTP 503: upstream overloaded");
    assert_eq!(relay.usage.calls("Gemini"), 0);
}
