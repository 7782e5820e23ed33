//! Kranes Market CLI - data directory and account management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create any missing collection files in the data directory
//! kranes data init --data-dir ./data
//!
//! # Add an admin account without going through the API
//! kranes admin create -e owner@kranes.market -n "Store Owner" -p 'S3cure-pass'
//!
//! # List locally managed inventory rows
//! kranes inventory list
//! ```
//!
//! # Commands
//!
//! - `data init` - Initialize the data directory
//! - `admin create` - Add an admin account
//! - `inventory list` - Show the local inventory overlay

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kranes")]
#[command(author, version, about = "Kranes Market CLI tools")]
struct Cli {
    /// Directory holding the JSON collection files
    #[arg(long, env = "DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the data directory
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
    /// Admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect the local inventory overlay
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// Create missing collection files, keeping existing ones
    Init,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Add an admin account directly to users.json
    Create {
        /// Login email, unique ignoring case
        #[arg(short, long)]
        email: String,

        /// Name shown in the storefront header
        #[arg(short, long)]
        name: String,

        /// Admin password (at least 8 characters)
        #[arg(short, long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum InventoryAction {
    /// List stored inventory rows, archived ones included
    List,
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("kranes: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Data { action } => match action {
            DataAction::Init => commands::data::init(&cli.data_dir).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&cli.data_dir, &email, &name, &password).await?;
            }
        },
        Commands::Inventory { action } => match action {
            InventoryAction::List => {
                commands::inventory::list(&cli.data_dir).await?;
            }
        },
    }
    Ok(())
}
