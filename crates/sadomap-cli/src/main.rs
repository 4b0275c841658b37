mod fetch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sadomap")]
#[command(about = "Ingest Sado Island POI spreadsheets into validated JSON")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest areas and print `{ data, errors }` as JSON.
    Fetch {
        /// Area id to ingest; repeat for several. Defaults to every area.
        #[arg(long = "area", value_name = "AREA_ID")]
        areas: Vec<String>,
        /// Read `<DIR>/<sheet>.csv` instead of calling the Sheets API.
        #[arg(long, value_name = "DIR")]
        csv_dir: Option<PathBuf>,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
    /// List the configured areas.
    Areas,
    /// Validate environment and areas file without fetching anything.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = sadomap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            areas,
            csv_dir,
            pretty,
        } => fetch::run_fetch(&config, &areas, csv_dir.as_deref(), pretty).await?,
        Commands::Areas => fetch::run_areas(&config)?,
        Commands::CheckConfig => fetch::run_check_config(&config)?,
    }

    Ok(())
}
