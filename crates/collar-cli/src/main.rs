mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::collar::{CurveArgs, SimulateArgs, ValueArgs};

/// Monte Carlo valuation of merger collars
#[derive(Parser)]
#[command(
    name = "collar",
    version,
    about = "Monte Carlo valuation of merger collars",
    long_about = "Values fixed-exchange-ratio and fixed-price merger collars by simulating \
                  the acquirer's averaged closing price, comparing the collared consideration \
                  against an uncollared deal, and overlaying both parties' walkaway rights."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a collar against the uncollared deal, with walkaway rights
    Value(ValueArgs),
    /// Simulate the acquirer's effective price distribution
    Simulate(SimulateArgs),
    /// Evaluate a collar's payoff curve over a price range
    Curve(CurveArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::collar::run_value(args),
        Commands::Simulate(args) => commands::collar::run_simulate(args),
        Commands::Curve(args) => commands::collar::run_curve(args),
        Commands::Version => {
            println!("collar {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
