mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::Session;
use config::CliConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sealbid")]
#[command(about = "Sealed-bid number games with escrowed stakes")]
#[command(version)]
struct Cli {
    /// Data directory for game storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to the data directory
    Init,

    /// Game lifecycle commands
    #[command(subcommand)]
    Game(commands::GameCommands),

    /// Bid commands
    #[command(subcommand)]
    Bid(commands::BidCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "sealbid={},sealbid_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::load(cli.data_dir, cli.verbose).await?;
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let result = match cli.command {
        Commands::Init => init_config(&config).await,
        Commands::Game(cmd) => match Session::open(&config).await {
            Ok(session) => commands::handle_game_command(cmd, &session).await,
            Err(e) => Err(e),
        },
        Commands::Bid(cmd) => match Session::open(&config).await {
            Ok(session) => commands::handle_bid_command(cmd, &session).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn init_config(config: &CliConfig) -> anyhow::Result<()> {
    let path = CliConfig::config_path(&config.data_dir);
    if tokio::fs::try_exists(&path).await? {
        anyhow::bail!("Config already exists at {}", path.display());
    }

    tokio::fs::write(&path, serde_json::to_string_pretty(config)?).await?;
    println!("Config written to {}", path.display());
    Ok(())
}
