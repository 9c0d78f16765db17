//! Lane Siege - Mirror Server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siege_core::config::MatchConfig;
use siege_core::data::UnitRoster;
use siege_core::simulation::Match;
use siege_core::stats::PlayerStats;
use siege_server::{MirrorServer, ServerConfig};

#[derive(Parser)]
#[command(name = "siege_server")]
#[command(about = "Runs a Lane Siege match and mirrors it to TCP observers")]
#[command(version)]
struct Cli {
    /// Server config RON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Observer address, overrides the config file
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Ticks per second, overrides the config file
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Match seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Unit roster RON file (defaults to the built-in roster)
    #[arg(long)]
    roster: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    tracing::info!("Starting Lane Siege mirror server");

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path).map_err(|e| e.to_string())?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(tick_rate) = cli.tick_rate {
        config.tick_rate = tick_rate;
    }

    let roster = match &cli.roster {
        Some(path) => UnitRoster::load(path).map_err(|e| e.to_string())?,
        None => UnitRoster::standard(),
    };
    let game = Match::new(MatchConfig::with_seed(cli.seed), roster, PlayerStats::default());

    let server = MirrorServer::bind(config).await.map_err(|e| e.to_string())?;
    tracing::info!(
        addr = ?server.local_addr().ok(),
        "Listening for observers"
    );

    match server.run(game).await {
        Some(result) => {
            let json = serde_json::to_string(&result).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        None => tracing::warn!("Match stopped without a result"),
    }
    Ok(())
}
