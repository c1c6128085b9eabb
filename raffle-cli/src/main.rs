mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use raffle_core::{RaffleError, RaffleManager};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "raffle")]
#[command(about = "VRF Raffle - lottery settled by verifiable randomness")]
#[command(version)]
struct Cli {
    /// Data directory for raffle storage
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
    /// Deploy a new raffle
    Deploy {
        /// Raffle name
        name: String,
        /// Network (hardhat, localhost, goerli)
        #[arg(short, long)]
        network: Option<String>,
        /// JSON file with config overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Entrance fee in ETH
        #[arg(long)]
        entrance_fee: Option<String>,
        /// Draw interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Callback gas limit
        #[arg(long)]
        callback_gas_limit: Option<u32>,
    },
    /// Enter a raffle
    Enter {
        /// Raffle name
        name: String,
        /// Entrant account (0x-prefixed)
        account: String,
        /// Amount in ETH
        amount: String,
    },
    /// Check whether a draw can be requested
    Check {
        /// Raffle name
        name: String,
    },
    /// Request randomness to draw a winner
    Draw {
        /// Raffle name
        name: String,
    },
    /// Deliver the mock coordinator's random word
    Fulfill {
        /// Raffle name
        name: String,
        /// Explicit random value (decimal or 0x hex)
        #[arg(short, long)]
        random: Option<String>,
    },
    /// Fund the raffle's VRF subscription
    Fund {
        /// Raffle name
        name: String,
        /// Amount in LINK
        amount: String,
    },
    /// Show raffle status
    Status {
        /// Raffle name
        name: String,
    },
    /// Show settled rounds
    History {
        /// Raffle name
        name: String,
    },
    /// Show the event log
    Events {
        /// Raffle name
        name: String,
    },
    /// List raffles
    List,
    /// Close a raffle with an empty pool
    Close {
        /// Raffle name
        name: String,
    },
    /// Delete a raffle and its history
    Delete {
        /// Raffle name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Get data directory
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| CliConfig::default().data_dir);

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;
    let config = CliConfig::load(&data_dir)?;

    // Initialize logging
    let log_level = if cli.verbose || config.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "raffle_cli={},raffle_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize raffle manager
    let manager = RaffleManager::new(&config.data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Deploy {
            name,
            network,
            config: config_file,
            entrance_fee,
            interval,
            callback_gas_limit,
        } => {
            let args = commands::DeployArgs {
                network,
                config_file,
                entrance_fee,
                interval,
                callback_gas_limit,
            };
            commands::deploy(&manager, &config, &name, args).await
        }
        Commands::Enter {
            name,
            account,
            amount,
        } => commands::enter(&manager, &name, &account, &amount).await,
        Commands::Check { name } => commands::check(&manager, &name).await,
        Commands::Draw { name } => commands::draw(&manager, &name).await,
        Commands::Fulfill { name, random } => {
            commands::fulfill(&manager, &name, random.as_deref()).await
        }
        Commands::Fund { name, amount } => commands::fund(&manager, &name, &amount).await,
        Commands::Status { name } => commands::status(&manager, &name).await,
        Commands::History { name } => commands::history(&manager, &name).await,
        Commands::Events { name } => commands::events(&manager, &name).await,
        Commands::List => commands::list(&manager).await,
        Commands::Close { name } => commands::close(&manager, &name).await,
        Commands::Delete { name, force } => commands::delete(&manager, &name, force).await,
    };

    if let Err(e) = result {
        match e {
            RaffleError::RaffleNotFound { name } => {
                eprintln!("Error: Raffle '{}' not found", name);
                eprintln!("Use 'raffle list' to see deployed raffles");
            }
            RaffleError::InsufficientFee { required, provided } => {
                eprintln!("Error: Insufficient entrance fee");
                eprintln!(
                    "Need: {} ETH, Provided: {} ETH",
                    required.format_units(18),
                    provided.format_units(18)
                );
            }
            RaffleError::DrawNotReady { reason } => {
                eprintln!("Error: Draw not ready: {}", reason);
                eprintln!("Use 'raffle check <name>' to inspect upkeep conditions");
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
