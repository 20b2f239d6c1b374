//! Delicious CLI - Database migrations and sample data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! delicious-cli migrate
//!
//! # Load sample users, stores and reviews
//! delicious-cli seed crates/cli/data/sample.yaml
//!
//! # Wipe the directory tables first
//! delicious-cli seed crates/cli/data/sample.yaml --clear
//! ```
//!
//! # Environment Variables
//!
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "delicious-cli")]
#[command(author, version, about = "Delicious CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load users, stores and reviews from a YAML file
    Seed {
        /// Path to the YAML seed file
        file: PathBuf,

        /// Delete every user, store, review and heart first
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => commands::seed::run(&file, clear).await?,
    }
    Ok(())
}
