//! Webcommerce CLI - session migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table used by the storefront
//! webcommerce-cli migrate sessions
//!
//! # List the backend catalog with stock per product
//! webcommerce-cli catalog list
//!
//! # Show the SKU a variant gets when saved from the admin console
//! webcommerce-cli catalog sku --code CAM-01 --size m --color "Azul marino"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "webcommerce-cli")]
#[command(author, version, about = "Webcommerce storefront CLI tools")]
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
    /// Inspect the backend catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the tower-sessions table in the storefront database
    Sessions,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products with price, variant count and stock
    List,
    /// Derive the SKU for a product code, size and color
    Sku {
        /// Product code
        #[arg(long)]
        code: String,

        /// Size name
        #[arg(long)]
        size: String,

        /// Color name
        #[arg(long)]
        color: String,
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
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list().await?,
            CatalogAction::Sku { code, size, color } => {
                commands::catalog::sku(&code, &size, &color);
            }
        },
    }
    Ok(())
}
