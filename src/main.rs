//! grab - prebuilt binary installer CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "grab")]
#[command(author, version, about = "grab - install prebuilt binaries from the web")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages
    Add {
        /// Package name(s), optionally with version: pkg or pkg@1.0.0
        #[arg(required = true)]
        packages: Vec<String>,
        /// Refresh recipes before installing
        #[arg(long)]
        refresh: bool,
    },
    /// Remove installed packages
    Remove {
        /// Package name(s), optionally with version: pkg or pkg@1.0.0
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Add { packages, refresh } => cmd::add::add(&packages, refresh).await,
        Commands::Remove { packages } => cmd::remove::remove(&packages),
    }
}
