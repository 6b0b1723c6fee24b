use tickerdash_core::DashboardService;

use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output::Table;

use super::CommandResult;

pub async fn run(args: &SearchArgs, service: &DashboardService) -> Result<CommandResult, CliError> {
    if args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }

    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let (batch, cache_hit) = service.search(query, args.limit).await?;

    let mut table = Table::new(vec!["symbol", "name", "exchange", "currency"]);
    for instrument in &batch.results {
        table.push(vec![
            instrument.symbol.to_string(),
            instrument.name.clone(),
            instrument.exchange.clone().unwrap_or_default(),
            instrument.currency.clone().unwrap_or_default(),
        ]);
    }

    let warnings = if batch.results.is_empty() {
        vec![format!("no instruments matched '{query}'")]
    } else {
        Vec::new()
    };

    Ok(CommandResult::ok(serde_json::to_value(&batch)?)
        .with_warnings(warnings)
        .with_cache_hit(cache_hit)
        .with_table(table))
}
