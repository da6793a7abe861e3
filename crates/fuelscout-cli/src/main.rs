//! Operational CLI: pre-populate the station registry by sweeping a region's
//! area terms through the harvester ahead of user queries.

mod populate;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fuelscout")]
#[command(about = "FuelScout operational tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sweep area terms and persist resolved stations to the registry.
    Populate {
        /// Comma-separated area search terms, e.g. "Oshawa ON,Whitby ON".
        #[arg(long, value_delimiter = ',', conflicts_with = "terms_file")]
        terms: Vec<String>,
        /// File with one area term per line; blank lines and '#' comments skipped.
        #[arg(long)]
        terms_file: Option<std::path::PathBuf>,
        /// Listings taken per area search (overrides config).
        #[arg(long)]
        max_per_area: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Populate {
            terms,
            terms_file,
            max_per_area,
        } => populate::run(terms, terms_file, max_per_area).await,
    }
}
