use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use minecraft_agent::signal::shutdown_signal;
use minecraft_agent::{
    BanStore, DrainScheduler, HttpTransport, JsonFileBanStorage, MessageProcessor, OutputDispatcher,
    ProviderRegistry, RelayConfig, SystemEnv, UsageStats,
};
use minecraft_bot::{BridgeConnector, IntakeBuffer, SessionManager};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "minecraft-agent", about = "Minecraft chat to AI relay")]
struct Args {
    /// TOML config file. Without it, configuration comes from the environment.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

/// Logs the usage report when dropped, so every exit path reports.
struct ReportOnExit(Arc<UsageStats>);

impl Drop for ReportOnExit {
    fn drop(&mut self) {
        self.0.report().log();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("minecraft_agent=debug,minecraft_bot=debug,info")
            }),
        )
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading config file");
            RelayConfig::from_file(path)?
        }
        None => RelayConfig::from_env(&SystemEnv)?,
    };

    let registry = ProviderRegistry::from_config(&config);
    let enabled: Vec<&str> = registry.enabled().map(|p| p.name.as_str()).collect();
    if enabled.is_empty() {
        warn!("No provider has an API key; every query will be ignored");
    }
    info!(
        providers = ?enabled,
        admin = ?config.admin_name,
        bot_admin = ?config.bot_admin,
        "Providers enabled"
    );

    let usage = Arc::new(UsageStats::new(
        registry.providers().iter().map(|p| p.name.clone()),
    ));
    let _report = ReportOnExit(Arc::clone(&usage));

    let bans = BanStore::open(Box::new(JsonFileBanStorage::new(&config.ban_file)));

    let intake = IntakeBuffer::new();
    let manager = SessionManager::new(
        BridgeConnector::new(&config.game.bridge_addr),
        config.game.connect_options(),
        config.session_settings(),
        intake.clone(),
    );

    let dispatcher = OutputDispatcher::new(
        Arc::new(manager.handle()),
        config.timing.line_delay(),
        config.timing.command_delay(),
    );
    let processor = Arc::new(MessageProcessor::new(
        registry,
        HttpTransport::new(),
        bans,
        Arc::clone(&usage),
        dispatcher,
        config.bot_admin.clone(),
    ));
    let scheduler = DrainScheduler::new(intake, processor, config.timing.drain_interval());

    info!(
        host = %config.game.host,
        port = config.game.port,
        username = %config.game.username,
        bridge = %config.game.bridge_addr,
        "Starting relay"
    );

    tokio::select! {
        _ = manager.run() => {}
        _ = scheduler.run() => {}
        signal = shutdown_signal() => {
            info!(%signal, "Shutting down");
        }
    }

    Ok(())
}
