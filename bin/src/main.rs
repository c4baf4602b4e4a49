//! tainan CLI binary.
//!
//! Drives the quantile-sort research pipeline over the local vendor exports.

mod cmd;
mod config;
mod data;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use config::{InputArgs, PipelineConfig, ReportArgs, SortArgs};
use std::path::PathBuf;
use std::process;
use tainan::Security;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tainan")]
#[command(about = "Quantile-sort backtests for Taiwanese equities", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the statement panel and summarise it
    Panel {
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Fit, score, sort and report
    Backtest {
        #[command(flatten)]
        inputs: InputArgs,

        #[command(flatten)]
        sort: SortArgs,

        #[command(flatten)]
        report: ReportArgs,

        /// Skip the benchmark download
        #[arg(long)]
        no_benchmarks: bool,
    },

    /// Show bucket membership at a date or for one security
    Positions {
        /// Bucket to inspect (0 holds the highest probabilities)
        bucket: usize,

        /// Trading date (YYYY-MM-DD)
        #[arg(
            short,
            long,
            value_parser = data::parse_date,
            conflicts_with = "security",
            required_unless_present = "security"
        )]
        date: Option<NaiveDate>,

        /// Security, e.g. "2330 台積電"
        #[arg(short, long)]
        security: Option<String>,

        /// Write the date snapshot to this file (cp950)
        #[arg(short, long, requires = "date")]
        export: Option<PathBuf>,

        #[command(flatten)]
        inputs: InputArgs,

        #[command(flatten)]
        sort: SortArgs,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Panel { inputs } => {
            inputs.apply(&mut config);
            cmd::panel::run(&config, cli.json)?;
        }
        Commands::Backtest {
            inputs,
            sort,
            report,
            no_benchmarks,
        } => {
            inputs.apply(&mut config);
            sort.apply(&mut config);
            report.apply(&mut config);
            cmd::backtest::run(&config, cli.json, !no_benchmarks).await?;
        }
        Commands::Positions {
            bucket,
            date,
            security,
            export,
            inputs,
            sort,
        } => {
            inputs.apply(&mut config);
            sort.apply(&mut config);
            let target = match (date, security) {
                (Some(date), _) => cmd::positions::Target::Date(date),
                (None, Some(security)) => cmd::positions::Target::Security(Security::new(security)),
                (None, None) => anyhow::bail!("either --date or --security is required"),
            };
            cmd::positions::run(&config, cli.json, bucket, &target, export.as_deref())?;
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for `--json`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
