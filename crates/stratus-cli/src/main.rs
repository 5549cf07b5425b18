//! Stratus CLI - deploy functions to a managed compute platform.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset. Covers both `stratus_deploy`
/// and this binary.
const DEFAULT_LOG_FILTER: &str = "stratus=info";

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Deploy functions to a managed compute platform")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./stratus.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package code and create or update a function
    Deploy {
        #[command(flatten)]
        target: Target,

        /// JavaScript file exporting `handler`
        #[arg(long)]
        code: PathBuf,
    },

    /// Print the remote configuration of a function
    Inspect {
        /// Function name
        #[arg(long)]
        name: String,
    },
}

/// Which function to deploy.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Function name
    #[arg(long)]
    name: Option<String>,

    /// Owner id to derive the function name from
    #[arg(long)]
    owner: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy { target, code } => {
            commands::deploy::run(cli.config, target.name, target.owner, code).await
        }
        Commands::Inspect { name } => commands::inspect::run(cli.config, name).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
