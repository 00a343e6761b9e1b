//! Livestall CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! livestall-cli migrate
//!
//! # Create an admin account
//! LIVESTALL_ADMIN_PASSWORD=... livestall-cli admin create -e admin@example.com -n "Admin Name"
//!
//! # Give an existing account the admin role
//! livestall-cli admin promote -e someone@example.com
//!
//! # Load demo sellers, products, and coupons
//! livestall-cli seed --admin admin@example.com --file crates/cli/seed/demo.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` / `admin promote` - Manage admin accounts
//! - `seed` - Load demo data from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "livestall-cli")]
#[command(author, version, about = "Livestall CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load demo sellers, products, and coupons
    Seed {
        /// YAML file describing the demo data
        #[arg(short, long, default_value = "crates/cli/seed/demo.yaml")]
        file: String,

        /// Email of the admin recorded as reviewer of the seeded applications
        #[arg(short, long)]
        admin: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account with a password
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(long, env = "LIVESTALL_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Give an existing account the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
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
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                let password = SecretString::from(password);
                commands::admin::create_user(&email, &name, &password).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Seed { file, admin } => {
            let summary = commands::seed::demo_data(&file, &admin).await?;
            tracing::info!(
                sellers = summary.sellers,
                products = summary.products,
                coupons = summary.coupons,
                "Seeding complete"
            );
        }
    }
    Ok(())
}
