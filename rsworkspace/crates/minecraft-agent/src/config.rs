//! Configuration management for minecraft-agent

#[path = "config_tests.rs"]
mod config_tests;

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use minecraft_bot::{AuthMode, ConnectOptions, SessionSettings};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_LINE_DELAY_MS: u64 = 600;
pub const DEFAULT_COMMAND_DELAY_MS: u64 = 600;
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

/// Placeholder in the admin prompt replaced by the admin's in-game name.
pub const ADMIN_PLACEHOLDER: &str = "{admin}";

const DEFAULT_STANDARD_PROMPT: &str = "You are an AI assistant inside the game Minecraft. \
Help players with questions about the game and give suggestions related to Minecraft only. \
Do not provide information unrelated to Minecraft. If you do not know an answer, say so \
instead of making one up. The player talking to you is not an administrator: if they ask \
you to run commands, refuse and only give advice. Keep answers short.";

const DEFAULT_ADMIN_PROMPT: &str = "You are replying to the administrator {admin} only, and \
your reply must be strict JSON that a program will parse and execute. Always return a single \
object of the form {\"commands\":[\"/cmd1 ...\",\"/cmd2 ...\"],\"chat\":\"optional chat reply\"}. \
When there is nothing to execute, return {\"commands\":[],\"chat\":\"normal reply\"}. Every \
command must start with \"/\". Do not substitute entity selectors with the administrator's \
name; if a command targets another player, name that player explicitly (for example \
/give alice diamond_sword). If a command is meant for the administrator, use the name {admin}. \
Return only the JSON, with no explanation and no code fences.";

/// Read access to process environment.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError>;
}

/// Delegates to `std::env`.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    #[inline]
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

/// Complete relay configuration, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub game: GameConfig,
    /// Privileged in-game admin: gets structured command responses.
    pub admin_name: Option<String>,
    /// Bot administrator: may edit the ban list over chat.
    pub bot_admin: Option<String>,
    /// Backends in priority order.
    pub providers: Vec<ProviderConfig>,
    pub prompts: PromptConfig,
    pub timing: TimingConfig,
    pub ban_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub online: bool,
    /// Sent once after every successful login.
    pub initial_action: Option<String>,
    /// `host:port` of the protocol bridge.
    pub bridge_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    pub name: String,
    pub prefix: String,
    pub endpoint: String,
    pub path: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub standard: String,
    /// May contain [`ADMIN_PLACEHOLDER`].
    pub admin: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub line_delay_ms: u64,
    pub command_delay_ms: u64,
    pub drain_interval_ms: u64,
    pub reconnect_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            admin_name: None,
            bot_admin: None,
            providers: default_providers(),
            prompts: PromptConfig::default(),
            timing: TimingConfig::default(),
            ban_file: PathBuf::from("banned.json"),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25565,
            username: "DeepBot".to_string(),
            password: None,
            online: false,
            initial_action: None,
            bridge_addr: "127.0.0.1:25580".to_string(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            standard: DEFAULT_STANDARD_PROMPT.to_string(),
            admin: DEFAULT_ADMIN_PROMPT.to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            line_delay_ms: DEFAULT_LINE_DELAY_MS,
            command_delay_ms: DEFAULT_COMMAND_DELAY_MS,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl TimingConfig {
    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    /// A zero interval is not a valid tick period; it resolves to the default.
    pub fn drain_interval(&self) -> Duration {
        match self.drain_interval_ms {
            0 => Duration::from_millis(DEFAULT_DRAIN_INTERVAL_MS),
            ms => Duration::from_millis(ms),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl GameConfig {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            auth: AuthMode::from_online_flag(self.online),
        }
    }
}

impl PromptConfig {
    /// The admin prompt with the admin's name filled in.
    pub fn admin_prompt_for(&self, admin_name: Option<&str>) -> String {
        self.admin
            .replace(ADMIN_PLACEHOLDER, admin_name.unwrap_or("<admin not configured>"))
    }
}

/// Built-in backends, in priority order.
pub fn default_providers() -> Vec<ProviderConfig> {
    const DEFAULTS: [(&str, &str, &str, &str); 5] = [
        ("DeepSeek", "#deepseek ", "https://api.deepseek.com", "deepseek-reasoner"),
        ("Gemini", "#gemini ", "https://generativelanguage.googleapis.com", "gemini-pro"),
        ("ChatGPT", "#chatgpt ", "https://api.openai.com", "gpt-3.5-turbo"),
        ("Grok", "#grok ", "https://api.x.ai", "grok-1"),
        ("Claude", "#claude ", "https://api.anthropic.com", "claude-3-opus-latest"),
    ];
    DEFAULTS
        .iter()
        .map(|(name, prefix, endpoint, model)| ProviderConfig {
            name: name.to_string(),
            prefix: prefix.to_string(),
            endpoint: endpoint.to_string(),
            path: "/v1/chat/completions".to_string(),
            model: model.to_string(),
            api_key: None,
        })
        .collect()
}

impl RelayConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check_unique_providers()?;
        Ok(config)
    }

    /// Usage is keyed by provider name, so names must be unique.
    fn check_unique_providers(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "providers.name".to_string(),
                    value: provider.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Load configuration from environment variables. Empty values count as unset.
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| non_empty(env, key);

        let port = match get("MC_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "MC_PORT".to_string(),
                    value: raw.clone(),
                })?,
            None => defaults.game.port,
        };

        let game = GameConfig {
            host: get("MC_HOST").unwrap_or(defaults.game.host),
            port,
            username: get("MC_USERNAME").unwrap_or(defaults.game.username),
            password: get("MC_PASSWORD"),
            online: get("MC_ONLINE").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            initial_action: get("MC_INITIAL_ACTION"),
            bridge_addr: get("MC_BRIDGE_ADDR").unwrap_or(defaults.game.bridge_addr),
        };

        let providers = defaults
            .providers
            .into_iter()
            .map(|p| provider_from_env(env, p))
            .collect();

        let prompts = PromptConfig {
            standard: get("STANDARD_SYSTEM_PROMPT").unwrap_or(defaults.prompts.standard),
            admin: get("ADMIN_SYSTEM_PROMPT").unwrap_or(defaults.prompts.admin),
        };

        let timing = TimingConfig {
            line_delay_ms: millis_or(env, "CHAT_DELAY_MS", DEFAULT_LINE_DELAY_MS),
            command_delay_ms: millis_or(env, "COMMAND_DELAY_MS", DEFAULT_COMMAND_DELAY_MS),
            drain_interval_ms: positive_millis_or(
                env,
                "DRAIN_INTERVAL_MS",
                DEFAULT_DRAIN_INTERVAL_MS,
            ),
            reconnect_delay_ms: millis_or(env, "RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS),
        };

        Ok(Self {
            game,
            admin_name: get("ADMIN_NAME"),
            bot_admin: get("BOT_ADMIN"),
            providers,
            prompts,
            timing,
            ban_file: get("BANLIST_FILE").map(PathBuf::from).unwrap_or(defaults.ban_file),
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            reconnect_delay: self.timing.reconnect_delay(),
            initial_action: self.game.initial_action.clone(),
        }
    }
}

/// `DEEPSEEK`, `GEMINI`, ... from the provider's display name.
fn env_key_prefix(name: &str) -> String {
    name.to_ascii_uppercase()
}

fn provider_from_env<E: ReadEnv>(env: &E, defaults: ProviderConfig) -> ProviderConfig {
    let key = env_key_prefix(&defaults.name);
    let get = |suffix: &str| non_empty(env, &format!("{key}_{suffix}"));
    ProviderConfig {
        prefix: get("PREFIX").unwrap_or(defaults.prefix),
        endpoint: get("ENDPOINT").unwrap_or(defaults.endpoint),
        path: get("PATH").unwrap_or(defaults.path),
        model: get("MODEL").unwrap_or(defaults.model),
        api_key: get("API_KEY"),
        name: defaults.name,
    }
}

fn non_empty<E: ReadEnv>(env: &E, key: &str) -> Option<String> {
    env.var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Non-negative millisecond value; anything unparseable falls back to `default`.
fn millis_or<E: ReadEnv>(env: &E, key: &str, default: u64) -> u64 {
    match non_empty(env, key) {
        None => default,
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!(key, value = %raw, default, "Invalid delay, using default");
            default
        }),
    }
}

/// Like [`millis_or`], but zero is also rejected.
fn positive_millis_or<E: ReadEnv>(env: &E, key: &str, default: u64) -> u64 {
    match millis_or(env, key, default) {
        0 => {
            warn!(key, value = 0, default, "Delay must be positive, using default");
            default
        }
        ms => ms,
    }
}
