//! Little Threads CLI - Database migrations and admin account tools.
//!
//! # Usage
//!
//! ```bash
//! # Run account database migrations
//! lt-cli migrate accounts
//!
//! # Run document store migrations
//! lt-cli migrate documents
//!
//! # Run all database migrations
//! lt-cli migrate all
//!
//! # Create or promote an admin account
//! lt-cli admin create -e admin@example.com --first-name Ada --last-name Lovelace -p '...'
//! ```
//!
//! Configuration comes from the same environment variables as the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lt-cli")]
#[command(author, version, about = "Little Threads CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run account database migrations
    Accounts,
    /// Run document store migrations
    Documents,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin account, or promote the existing account with this email
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Password for a newly created account. Ignored on promotion.
        #[arg(short, long)]
        password: String,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Accounts => commands::migrate::accounts().await?,
            MigrateTarget::Documents => commands::migrate::documents().await?,
            MigrateTarget::All => {
                commands::migrate::accounts().await?;
                commands::migrate::documents().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                first_name,
                last_name,
                password,
            } => {
                commands::admin::create(email, first_name, last_name, password).await?;
            }
        },
    }
    Ok(())
}
