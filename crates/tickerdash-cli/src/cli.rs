//! Command-line arguments.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Indicators, buy-score and guidance for one ticker or company name |
//! | `search` | Symbol search |
//! | `scan` | Evaluate a preset sector watchlist |
//! | `presets` | List scan presets |
//! | `serve` | Run the web dashboard |
//!
//! # Examples
//!
//! ```bash
//! tickerdash analyze 삼성전자 --cost-basis 71500 --format table
//! tickerdash --mock scan semis --cutoff 70 --pretty
//! tickerdash serve --bind 0.0.0.0:8501
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stock dashboard: indicators, buy-score and sector scans from the terminal
/// or the browser.
#[derive(Debug, Parser)]
#[command(name = "tickerdash", author, version, about)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use deterministic synthetic market data instead of the network.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze one ticker or company name.
    Analyze(AnalyzeArgs),
    /// Search for instruments.
    Search(SearchArgs),
    /// Run a preset sector scan.
    Scan(ScanArgs),
    /// List scan presets.
    Presets,
    /// Serve the web dashboard.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Ticker (`005930.KS`, `AAPL`) or company name (`삼성전자`).
    pub query: String,

    /// Bar interval: 1m, 5m, 15m, 1h, 1d, 1wk.
    #[arg(long)]
    pub interval: Option<String>,

    /// Your average purchase price, for the position summary.
    #[arg(long)]
    pub cost_basis: Option<f64>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Preset id, see `tickerdash presets`.
    pub preset: String,

    /// Minimum score for a hit (0-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub cutoff: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address, overriding the configured one.
    #[arg(long)]
    pub bind: Option<String>,
}
