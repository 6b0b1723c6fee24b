use tickerdash_core::DashboardService;

use crate::error::CliError;
use crate::output::Table;

use super::CommandResult;

pub fn run(service: &DashboardService) -> Result<CommandResult, CliError> {
    let presets = service.presets();

    let mut table = Table::new(vec!["id", "label", "tickers"]);
    for preset in presets {
        table.push(vec![
            preset.id.to_owned(),
            preset.label.to_owned(),
            preset.tickers.join(", "),
        ]);
    }

    Ok(CommandResult::ok(serde_json::to_value(presets)?)
        .with_cache_hit(true)
        .with_table(table))
}
