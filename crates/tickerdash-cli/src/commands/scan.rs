use tickerdash_core::DashboardService;

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::Table;

use super::CommandResult;

pub async fn run(args: &ScanArgs, service: &DashboardService) -> Result<CommandResult, CliError> {
    let report = service.scan(&args.preset, args.cutoff).await?;

    let mut table = Table::new(vec!["symbol", "close", "score", "verdict"]);
    for hit in &report.hits {
        table.push(vec![
            hit.symbol.to_string(),
            format!("{:.2}", hit.close),
            hit.score.to_string(),
            hit.verdict.label().to_owned(),
        ]);
    }

    // Per-ticker failures do not fail the scan.
    let warnings = report
        .failures
        .iter()
        .map(|failure| format!("{}: {} ({})", failure.symbol, failure.message, failure.code))
        .collect();

    Ok(CommandResult::ok(serde_json::to_value(&report)?)
        .with_warnings(warnings)
        .with_table(table))
}
