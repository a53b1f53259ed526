//! Message processor - one chat event from filter to reply
//!
//! Steps run strictly in order within one event: self filter, bot-admin
//! directives, ban check, help, provider match, acknowledgment, backend
//! call, then delivery. Nothing here is shared-exclusive across events.

#[path = "processor_tests.rs"]
mod processor_tests;

use std::sync::Arc;

use minecraft_types::ChatEvent;
use tracing::{debug, info, warn};

use crate::bans::{AdminDirective, BanStore};
use crate::codec;
use crate::outbound::{OutputDispatcher, Route};
use crate::provider::{BackendTransport, ProviderRegistry, failure_message};
use crate::usage::UsageStats;

/// Sent on the event's channel before the backend call starts.
pub const ACKNOWLEDGMENT: &str = "Received, thinking...";

/// Literal players type to get the help text.
pub const HELP_DIRECTIVE: &str = "#bot help";

/// Everything one processing task needs, shared by all of them.
pub struct MessageProcessor<T: BackendTransport> {
    registry: ProviderRegistry,
    transport: T,
    bans: BanStore,
    usage: Arc<UsageStats>,
    dispatcher: OutputDispatcher,
    bot_admin: Option<String>,
}

impl<T: BackendTransport> MessageProcessor<T> {
    pub fn new(
        registry: ProviderRegistry,
        transport: T,
        bans: BanStore,
        usage: Arc<UsageStats>,
        dispatcher: OutputDispatcher,
        bot_admin: Option<String>,
    ) -> Self {
        Self {
            registry,
            transport,
            bans,
            usage,
            dispatcher,
            bot_admin,
        }
    }

    pub fn bans(&self) -> &BanStore {
        &self.bans
    }

    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }

    /// Handle one chat event. Every failure is contained here.
    pub async fn process(&self, event: ChatEvent) {
        if event.body.trim().is_empty() {
            return;
        }
        if self.dispatcher.own_username().as_deref() == Some(event.sender.as_str()) {
            return;
        }

        let route = Route::reply_to(&event);
        let trimmed = event.body.trim();

        if self.is_bot_admin(&event.sender)
            && let Some(directive) = AdminDirective::parse(trimmed)
        {
            info!(sender = %event.sender, ?directive, "Bot admin directive");
            let reply = directive.apply(&self.bans);
            self.dispatcher.send_line(&route, &reply);
            return;
        }

        if self.bans.is_banned(&event.sender) {
            debug!(sender = %event.sender, "Ignoring banned sender");
            return;
        }

        if trimmed == HELP_DIRECTIVE {
            self.dispatcher.deliver_lines(&route, &self.help_text()).await;
            return;
        }

        let Some((provider, query)) = self.registry.match_message(&event.body) else {
            return;
        };

        info!(
            sender = %event.sender,
            provider = %provider.name,
            channel = ?event.channel,
            "Dispatching query"
        );
        self.dispatcher.send_line(&route, ACKNOWLEDGMENT);

        let completion = match self
            .registry
            .complete(&self.transport, provider, query, &event.sender)
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                warn!(provider = %provider.name, error = %e, "Backend call failed");
                self.dispatcher.send_line(&route, &failure_message(provider, &e));
                return;
            }
        };
        self.usage.record(&provider.name, completion.total_tokens);

        if self.registry.is_privileged(&event.sender) {
            let response = codec::decode(&completion.text);
            self.dispatcher.deliver_response(&route, &response).await;
        } else {
            self.dispatcher.deliver_lines(&route, &completion.text).await;
        }
    }

    fn is_bot_admin(&self, sender: &str) -> bool {
        self.bot_admin.as_deref() == Some(sender)
    }

    fn help_text(&self) -> String {
        let triggers: Vec<&str> = self.registry.enabled().map(|p| p.trigger()).collect();
        let mut lines = vec![
            "========= AI chat =========".to_string(),
            "Start a message with a model trigger, a space, then your question.".to_string(),
        ];
        match triggers.first() {
            Some(first) => {
                lines.push(format!("Available models: {}", triggers.join(", ")));
                lines.push(format!("Example: {first} why are endermen afraid of water?"));
            }
            None => lines.push("No models are configured right now.".to_string()),
        }
        lines.push("Tip: /msg and /tell reach the AI too, the same way.".to_string());
        lines.join("\n")
    }
}
