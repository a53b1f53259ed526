//! Provider registry and dispatch
//!
//! Every backend speaks the OpenAI chat-completion dialect, so a provider is
//! pure configuration: trigger prefix, endpoint, model, credential. One
//! [`ProviderRegistry::complete`] call covers all of them.

use std::future::Future;
use std::sync::Arc;

use minecraft_types::{ChatCompletionRequest, ChatCompletionResponse};
use reqwest::Client;
use tracing::debug;

use crate::config::{ProviderConfig, RelayConfig};
use crate::error::ProviderError;

/// Longest error detail echoed back into the game chat.
pub const MAX_ERROR_DETAIL_CHARS: usize = 100;

const EMPTY_REPLY: &str = "(empty reply)";

/// Raw outcome of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The backend call boundary: POST a JSON body, get status and raw body back.
pub trait BackendTransport: Send + Sync + 'static {
    fn call(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<TransportResponse, ProviderError>> + Send;
}

impl<T: BackendTransport> BackendTransport for Arc<T> {
    fn call(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<TransportResponse, ProviderError>> + Send {
        (**self).call(url, headers, body)
    }
}

/// [`BackendTransport`] over `reqwest`. No timeout: a hung backend only
/// stalls the task waiting on it.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendTransport for HttpTransport {
    async fn call(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &serde_json::Value,
    ) -> Result<TransportResponse, ProviderError> {
        let mut request = self.client.post(url).body(serde_json::to_vec(body)?);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: String,
    /// Literal the message must start with, e.g. `"#deepseek "`.
    pub prefix: String,
    pub endpoint: String,
    pub path: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl From<&ProviderConfig> for Provider {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            name: config.name.clone(),
            prefix: config.prefix.clone(),
            endpoint: config.endpoint.clone(),
            path: config.path.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        }
    }
}

impl Provider {
    /// Providers without a credential never match.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{endpoint}{}", self.path)
        } else {
            format!("{endpoint}/{}", self.path)
        }
    }

    /// The prefix as players type it, without trailing whitespace.
    pub fn trigger(&self) -> &str {
        self.prefix.trim_end()
    }
}

/// A successful backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: Option<u64>,
}

/// Providers in priority order plus the prompt selection rules.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
    admin_name: Option<String>,
    standard_prompt: String,
    privileged_prompt: String,
}

impl ProviderRegistry {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            providers: config.providers.iter().map(Provider::from).collect(),
            admin_name: config.admin_name.clone(),
            standard_prompt: config.prompts.standard.clone(),
            privileged_prompt: config.prompts.admin_prompt_for(config.admin_name.as_deref()),
        }
    }

    /// All configured providers, enabled or not.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter().filter(|p| p.is_enabled())
    }

    /// First enabled provider whose prefix starts `body`, with the trimmed query.
    pub fn match_message<'a>(&self, body: &'a str) -> Option<(&Provider, &'a str)> {
        self.enabled()
            .find_map(|p| body.strip_prefix(p.prefix.as_str()).map(|q| (p, q.trim())))
    }

    pub fn is_privileged(&self, sender: &str) -> bool {
        self.admin_name.as_deref() == Some(sender)
    }

    pub fn system_prompt(&self, sender: &str) -> &str {
        if self.is_privileged(sender) {
            &self.privileged_prompt
        } else {
            &self.standard_prompt
        }
    }

    /// One backend call for `query` on behalf of `sender`.
    pub async fn complete<T: BackendTransport>(
        &self,
        transport: &T,
        provider: &Provider,
        query: &str,
        sender: &str,
    ) -> Result<Completion, ProviderError> {
        let request =
            ChatCompletionRequest::new(&provider.model, self.system_prompt(sender), query);
        let body = serde_json::to_value(&request)?;
        let headers = [
            ("Content-Type", "application/json".to_string()),
            (
                "Authorization",
                format!("Bearer {}", provider.api_key.as_deref().unwrap_or_default()),
            ),
        ];

        let response = transport.call(&provider.url(), &headers, &body).await?;
        debug!(
            provider = %provider.name,
            status = response.status,
            body = %response.body,
            "Backend response"
        );

        if !response.is_success() {
            return Err(ProviderError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&response.body)?;
        let parsed: ChatCompletionResponse =
            serde_json::from_value(value.clone()).unwrap_or_default();

        let text = match parsed.first_content() {
            Some(content) if !content.is_empty() => content.trim().to_string(),
            _ => value.to_string().trim().to_string(),
        };
        let text = if text.is_empty() { EMPTY_REPLY.to_string() } else { text };

        Ok(Completion {
            text,
            total_tokens: parsed.total_tokens(),
        })
    }
}

/// Chat-safe error line naming the provider.
pub fn failure_message(provider: &Provider, error: &ProviderError) -> String {
    let detail: String = error.to_string().chars().take(MAX_ERROR_DETAIL_CHARS).collect();
    format!("{} request failed: {detail}", provider.name)
}
