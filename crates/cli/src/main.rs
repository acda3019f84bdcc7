//! Marigold CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! marigold-cli migrate
//!
//! # Create an admin user (reads ADMIN_PASSWORD, or generates one)
//! marigold-cli create-admin -e admin@example.com -n "Admin Name"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `create-admin` - Create or promote an admin account

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "marigold-cli")]
#[command(author, version, about = "Marigold CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create a new admin user (or promote an existing account)
    CreateAdmin {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::CreateAdmin { email, name } => {
            commands::admin::create_admin(&email, &name).await?;
        }
    }
    Ok(())
}
