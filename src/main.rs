use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use networth::api::{MortgageRequest, ProjectionRequest, run_comparison, run_http_server, run_projection};
use networth::logging::Logging;
use networth::pricing::PriceCache;
use networth::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Household net worth projections for Canadian savers",
    long_about = None
)]
struct Cli {
    /// JSON settings file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Overrides the configured log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a projection from a JSON request file and print the result
    Project {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Compare prepaying a mortgage against investing the surplus
    Compare {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

fn read_request<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::read_config_file(path)?,
        None => Settings::default(),
    };
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    Logging::new(&settings.log_level)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            info!("networth v{}", env!("CARGO_PKG_VERSION"));
            run_http_server(&settings).await.context("server error")?;
        }
        Command::Project { input, pretty } => {
            let request: ProjectionRequest = read_request(&input)?;
            let prices = Mutex::new(PriceCache::new(settings.ttl_policy()));
            let response = run_projection(request, &prices, settings.refresh_pacing()).await?;
            print_json(&response, pretty)?;
        }
        Command::Compare { input, pretty } => {
            let request: MortgageRequest = read_request(&input)?;
            let comparison = run_comparison(&request)?;
            print_json(&comparison, pretty)?;
        }
    }
    Ok(())
}
