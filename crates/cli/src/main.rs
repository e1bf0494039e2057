//! Shipquote CLI - Database migrations and shipping configuration tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (schema + session store)
//! shipquote migrate
//!
//! # Load shipping methods for a website, replacing what is there
//! shipquote seed shipping config/shipping.yaml --website 1 --replace
//!
//! # Quote a destination against a YAML file without a database
//! shipquote quote config/shipping.yaml --website 1 --country 1 --total 120.50
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed shipping` - Validate and insert a shipping configuration
//! - `quote` - Evaluate a shipping configuration offline

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shipquote")]
#[command(author, version, about = "Shipquote CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from configuration files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Print the quotes a configuration file yields for a destination
    Quote(commands::quote::QuoteArgs),
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load shipping methods and table lines from YAML
    Shipping {
        /// Path to the YAML configuration file
        file: PathBuf,

        /// Website the methods belong to (defaults to `STOREFRONT_WEBSITE_ID`)
        #[arg(short, long)]
        website: Option<i32>,

        /// Delete the website's existing methods first
        #[arg(long)]
        replace: bool,
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Shipping {
                file,
                website,
                replace,
            } => commands::seed::shipping(&file, website, replace).await?,
        },
        Commands::Quote(args) => commands::quote::run(&args).await?,
    }
    Ok(())
}
