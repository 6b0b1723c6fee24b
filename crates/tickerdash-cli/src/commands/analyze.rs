use serde::Serialize;
use tickerdash_core::{
    Analysis, DashboardService, Fundamental, GuidanceLine, IndicatorSnapshot, Interval,
    PositionSummary, Resolution, Score, Verdict,
};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;
use crate::output::Table;

use super::CommandResult;

/// Latest values only; the full indicator frame stays with the web API.
#[derive(Debug, Serialize)]
struct AnalyzeData<'a> {
    resolution: &'a Resolution,
    name: &'a str,
    interval: Interval,
    bars: usize,
    latest: &'a IndicatorSnapshot,
    score: &'a Score,
    verdict: Verdict,
    guidance: &'a [GuidanceLine],
    #[serde(skip_serializing_if = "Option::is_none")]
    fundamentals: Option<&'a Fundamental>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<&'a PositionSummary>,
}

pub async fn run(
    args: &AnalyzeArgs,
    service: &DashboardService,
    default_interval: Interval,
) -> Result<CommandResult, CliError> {
    let interval = match args.interval.as_deref() {
        Some(raw) => raw.parse::<Interval>()?,
        None => default_interval,
    };
    let analysis = service
        .analyze(&args.query, interval, args.cost_basis)
        .await?;

    let data = serde_json::to_value(AnalyzeData {
        resolution: &analysis.resolution,
        name: &analysis.name,
        interval,
        bars: analysis.snapshot.bars.len(),
        latest: &analysis.latest,
        score: &analysis.score,
        verdict: analysis.verdict,
        guidance: &analysis.guidance,
        fundamentals: analysis.snapshot.fundamentals.as_ref(),
        position: analysis.position.as_ref(),
    })?;

    Ok(CommandResult::ok(data)
        .with_warnings(analysis.warnings.clone())
        .with_cache_hit(analysis.snapshot.cache_hit)
        .with_table(table(&analysis)))
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| String::from("-"), |v| format!("{v:.decimals$}"))
}

fn table(analysis: &Analysis) -> Table {
    let latest = &analysis.latest;
    let mut table = Table::pairs([
        ("symbol", analysis.resolution.symbol.to_string()),
        ("name", analysis.name.clone()),
        ("close", format!("{:.2}", latest.close)),
        ("vwap", optional(latest.vwap, 2)),
        ("ma", optional(latest.ma, 2)),
        ("rsi", optional(latest.rsi, 1)),
        ("macd_hist", optional(latest.macd_hist, 3)),
        ("score", analysis.score.value.to_string()),
        ("verdict", analysis.verdict.label().to_owned()),
    ]);
    if let Some(position) = &analysis.position {
        table.push(vec![
            String::from("return_pct"),
            format!("{:+.2}", position.return_percent),
        ]);
    }
    for line in &analysis.guidance {
        table.push(vec![
            line.topic.label().to_owned(),
            format!("{} {}", line.status.icon(), line.text),
        ]);
    }
    table
}
