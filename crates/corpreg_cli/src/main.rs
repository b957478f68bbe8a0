//! corpreg CLI
//!
//! Process entry points for the company registry.
//!
//! # Commands
//!
//! - `serve` - Run the registry HTTP server over a CSV file
//! - `reconcile` - Mirror a running registry into a SQLite database
//! - `inspect` - Print the records held in a registry CSV file
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Company registry server and reconciler.
#[derive(Parser)]
#[command(name = "corpreg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the registry HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// CSV file with companies
        #[arg(long, default_value = "testdata/companies.csv")]
        file: PathBuf,

        /// Seconds between compaction checks
        #[arg(long, default_value_t = 20 * 60)]
        compaction_interval: u64,
    },

    /// Mirror the registry into a SQLite database
    Reconcile {
        /// SQLite database path
        #[arg(long, default_value = "companies.db")]
        dsn: PathBuf,

        /// Registry base URL
        #[arg(long, default_value = "http://localhost:8080")]
        server_addr: String,

        /// Seconds between reconcile cycles
        #[arg(long, default_value_t = 60)]
        update_interval: u64,
    },

    /// Print the records held in a registry CSV file
    Inspect {
        /// CSV file with companies
        #[arg(long, default_value = "testdata/companies.csv")]
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            addr,
            file,
            compaction_interval,
        } => {
            commands::serve::run(addr, file, compaction_interval).await?;
        }
        Commands::Reconcile {
            dsn,
            server_addr,
            update_interval,
        } => {
            commands::reconcile::run(&dsn, server_addr, update_interval).await?;
        }
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Version => {
            println!("corpreg CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("corpreg Core v{}", corpreg_core::VERSION);
        }
    }

    Ok(())
}
