// ABOUTME: Main entry point for the dragme Discord bot and its operator commands
// ABOUTME: Initializes logging, config, registry and metrics, then runs the gateway and keep-alive server

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dragme::{keepalive, logging, paths, SharedRouter};
use dragme_core::{ChannelRegistry, Config};
use std::sync::Arc;

/// dragme command-line interface.
#[derive(Parser)]
#[command(name = "dragme")]
#[command(about = "Discord bot that lets members ask to join someone else's voice channel")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Emit console logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve requests (default)
    Run,
    /// Inspect or edit the registered request channels
    Channels {
        #[command(subcommand)]
        action: ChannelsAction,
    },
}

#[derive(Subcommand)]
enum ChannelsAction {
    /// List every server and its request channel
    List,
    /// Forget a server's request channel
    Remove {
        /// Server (guild) id
        community_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::install_panic_hook();

    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let _log_guard =
        logging::init_logging(&paths::log_dir(), cli.log_level.as_deref(), cli.log_json)?;

    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Channels { action } => channels(&config, action).await,
    }
}

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        registry = %config.registry_path().display(),
        timeout_secs = config.requests.timeout_secs,
        cooldown_secs = config.requests.cooldown_secs,
        owners = config.profile.owner_ids.len(),
        keepalive = config.keepalive.enabled,
        "Configuration loaded"
    );

    let metrics_handle = match dragme::metrics::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics disabled");
            None
        }
    };

    let registry = Arc::new(ChannelRegistry::load(config.registry_path()));
    let router: SharedRouter = Arc::default();
    let config = Arc::new(config);

    if config.keepalive.enabled {
        let state = keepalive::KeepAliveState::new(Arc::clone(&router), metrics_handle);
        let keepalive_config = config.keepalive.clone();
        tokio::spawn(async move {
            if let Err(e) = keepalive::start_keepalive_server(&keepalive_config, state).await {
                tracing::error!(error = %e, "Keep-alive server stopped");
            }
        });
    }

    run_platform(config, registry, router).await
}

#[cfg(feature = "discord")]
async fn run_platform(
    config: Arc<Config>,
    registry: Arc<ChannelRegistry>,
    router: SharedRouter,
) -> Result<()> {
    dragme::platform::discord::run(config, registry, router).await
}

#[cfg(not(feature = "discord"))]
async fn run_platform(
    _config: Arc<Config>,
    _registry: Arc<ChannelRegistry>,
    _router: SharedRouter,
) -> Result<()> {
    anyhow::bail!("dragme was built without a chat platform; rebuild with --features discord")
}

async fn channels(config: &Config, action: ChannelsAction) -> Result<()> {
    let registry = ChannelRegistry::load(config.registry_path());
    match action {
        ChannelsAction::List => {
            let channels = registry.snapshot().await;
            if channels.is_empty() {
                println!("No request channels registered ({})", registry.path().display());
            }
            for (community_id, channel_id) in channels {
                println!("{}\t{}", community_id, channel_id);
            }
        }
        ChannelsAction::Remove { community_id } => {
            match registry.remove(&community_id).await {
                Some(channel_id) => {
                    registry
                        .persist()
                        .await
                        .with_context(|| format!("Failed to save {}", registry.path().display()))?;
                    println!("Removed {} (channel {})", community_id, channel_id);
                }
                None => anyhow::bail!("No request channel registered for {}", community_id),
            }
        }
    }
    Ok(())
}
