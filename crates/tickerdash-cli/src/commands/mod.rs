mod analyze;
mod presets;
mod scan;
mod search;
pub mod serve;

use std::time::Instant;

use serde_json::Value;
use tickerdash_core::{DashboardConfig, DashboardError, DashboardService, Envelope, EnvelopeError};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata;
use crate::output::Table;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub cache_hit: bool,
    pub table: Option<Table>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            cache_hit: false,
            table: None,
        }
    }

    /// Upstream or analysis failure reported inside the envelope.
    pub fn failed(error: &DashboardError) -> Self {
        Self::ok(Value::Null).with_errors(vec![EnvelopeError::from(error)])
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }
}

/// Envelope plus the table view used by `--format table`.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub table: Option<Table>,
}

/// Invalid input aborts the command; anything else lands in the envelope.
fn triage(error: DashboardError) -> Result<CommandResult, CliError> {
    match error {
        DashboardError::Validation(error) => Err(CliError::Validation(error)),
        other => {
            tracing::warn!(code = other.code(), error = %other, "command failed");
            Ok(CommandResult::failed(&other))
        }
    }
}

pub async fn run(cli: &Cli, config: &DashboardConfig) -> Result<CommandOutput, CliError> {
    let service = DashboardService::from_config(config)?;
    let started = Instant::now();

    let outcome = match &cli.command {
        Command::Analyze(args) => analyze::run(args, &service, config.default_interval).await,
        Command::Search(args) => search::run(args, &service).await,
        Command::Scan(args) => scan::run(args, &service).await,
        Command::Presets => presets::run(&service),
        Command::Serve(_) => Err(CliError::Command(String::from(
            "serve does not produce an envelope",
        ))),
    };
    let result = match outcome {
        Ok(result) => result,
        Err(CliError::Dashboard(error)) => triage(error)?,
        Err(other) => return Err(other),
    };
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let CommandResult {
        data,
        warnings,
        errors,
        cache_hit,
        table,
    } = result;

    let meta = metadata::envelope_meta(service.source_name(), latency_ms, cache_hit, warnings)?;
    let envelope = Envelope::with_errors(meta, data, errors)?;
    Ok(CommandOutput { envelope, table })
}
