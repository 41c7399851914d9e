//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// A terminal UI for looking up stock symbols and requesting growth predictions.
///
/// Start typing a company name, pick a suggestion, enter a horizon in days and
/// press Enter to ask the prediction service how the stock is expected to grow.
/// Use --suggest or --predict for one-shot, non-interactive lookups.
#[derive(Parser, Debug, Clone)]
#[command(name = "stonkcast")]
#[command(version)]
#[command(about = "A terminal UI for stock symbol lookup and growth prediction", long_about = None)]
pub struct Args {
    /// Base URL of the suggestion/prediction service
    #[arg(short = 'u', long, env = "STONKCAST_URL")]
    pub base_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "STONKCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Quiet period in milliseconds before suggestions are fetched
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Minimum query length that triggers a suggestion fetch
    #[arg(long)]
    pub min_chars: Option<usize>,

    /// API timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print suggestions for QUERY and exit
    #[arg(long, value_name = "QUERY", conflicts_with = "predict")]
    pub suggest: Option<String>,

    /// Request a prediction for SYMBOL and exit (requires --days)
    #[arg(long, value_name = "SYMBOL", requires = "days")]
    pub predict: Option<String>,

    /// Prediction horizon in days
    #[arg(short = 'd', long)]
    pub days: Option<u32>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    pub init_config: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Log file path (defaults to stonkcast.log in the data directory)
    #[arg(long, env = "STONKCAST_LOG")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Whether a one-shot batch action was requested.
    pub fn is_batch(&self) -> bool {
        self.suggest.is_some() || self.predict.is_some()
    }
}
