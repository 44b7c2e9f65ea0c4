//! Reelhouse server binary

use clap::{Parser, Subcommand};
use reelhouse::{
    api::{ApiConfig, ApiServer},
    casino::CasinoService,
    config::{CasinoConfig, ConfigLoader, StorageBackend},
    games::GameCatalog,
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Reelhouse slot-machine server
#[derive(Parser)]
#[command(name = "reelhouse")]
#[command(about = "Slot-machine wagering server over WebSocket")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// RocksDB data directory
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Game catalog (TOML or JSON)
    #[arg(short, long)]
    games: Option<String>,

    /// Storage backend: rocksdb or memory
    #[arg(long)]
    backend: Option<StorageBackend>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server (default)
    Serve,

    /// Validate the game catalog and list its games
    CheckGames,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config, cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::CheckGames => check_games(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> reelhouse::errors::CasinoResult<CasinoConfig> {
    let loader = match cli.config {
        Some(ref path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    // CLI flags win over file and environment
    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref dir) = cli.data_dir {
        config.storage.data_directory = dir.clone();
    }
    if let Some(ref games) = cli.games {
        config.games_path = Some(games.clone());
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn init_tracing(config: &CasinoConfig, verbose: bool) {
    let fallback = if verbose {
        "reelhouse=debug,tower_http=debug".to_string()
    } else {
        config.logging.filter.clone()
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();
}

async fn serve(config: CasinoConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Reelhouse");
    info!("   Storage: {:?} at {}", config.storage.backend, config.storage.data_directory);
    info!("   Starting balance: {}", config.session.starting_balance);

    // Catalog or storage failing here aborts startup
    let service = Arc::new(CasinoService::from_config(&config)?);

    ApiServer::new(ApiConfig::from(config.server), service).run().await
}

fn check_games(config: &CasinoConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match config.games_path {
        Some(ref path) => GameCatalog::load(path)?,
        None => GameCatalog::embedded()?,
    };

    for id in catalog.ids() {
        let game = catalog.get(&id)?;
        println!(
            "{:<24} {} reels x {} rows, {} symbols, {} paylines",
            id,
            game.reels_count,
            game.rows_per_reel(),
            game.symbols_count,
            game.paylines.len()
        );
    }
    println!("{} game(s) OK", catalog.len());
    Ok(())
}
