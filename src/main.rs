use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracker::TrackerEngine;
use tracker::config::ConfigLoader;
use tracker::fetcher::GameClient;
use tracker::notifier::{Notifier, WebhookSink};
use tracker::state::AppState;
use tracker::{persist, server};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(version = "0.1.0")]
#[command(about = "Live player tracker with chat-webhook notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker from a config file
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(config).await,
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Place: {}", cfg.place_id);
                    println!("   Check interval: {}s", cfg.check_interval_secs);
                    println!("   History capacity: {}", cfg.history_capacity());
                    println!("   Player milestones: {:?}", cfg.player_milestones);
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
            Ok(())
        }
    }
}

async fn run(path: PathBuf) -> anyhow::Result<()> {
    log::info!("Loading config from {:?}", path);
    let config = ConfigLoader::load(&path)?;

    let mut app_state = AppState::new(
        config.history_capacity(),
        config.thresholds.max_consecutive_errors,
        Duration::from_secs(config.thresholds.error_cooldown_secs),
    );
    match persist::load(Path::new(&config.state_path)) {
        Ok(Some(saved)) => {
            log::info!("restored {} history samples from checkpoint", saved.history.len());
            app_state.restore(saved);
        }
        Ok(None) => log::info!("no checkpoint found, cold start"),
        Err(e) => log::warn!("could not load checkpoint: {}", e),
    }
    let state = Arc::new(RwLock::new(app_state));

    let client = GameClient::new(
        config.place_id.clone(),
        config.apis_base_url.clone(),
        config.games_base_url.clone(),
    );
    let notifier = Notifier::new(
        Box::new(WebhookSink::new(config.webhook_url.clone())),
        config.place_id.clone(),
    );

    let server_state = state.clone();
    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = server::serve(server_state, port).await {
            log::error!("status server failed: {}", e);
        }
    });

    let mut engine = TrackerEngine::new(config, client, notifier, state);
    match engine.startup().await {
        Ok(snapshot) => engine.announce_startup(&snapshot).await,
        Err(e) => {
            log::error!("fatal: initial fetch failed: {}", e);
            engine.announce_startup_failure(&e).await;
            std::process::exit(1);
        }
    }

    engine.run().await;
    Ok(())
}
