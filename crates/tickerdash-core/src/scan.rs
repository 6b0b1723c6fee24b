//! Preset sector watchlists and the batch scan driver.

use std::future::Future;

use serde::Serialize;

use crate::scoring::Verdict;
use crate::throttling::ThrottlingQueue;
use crate::{Symbol, UtcDateTime, ValidationError};

/// Default score a ticker must reach to be listed as a scan hit.
pub const DEFAULT_CUTOFF: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub tickers: &'static [&'static str],
}

const PRESETS: &[ScanPreset] = &[
    ScanPreset {
        id: "semis",
        label: "🔬 반도체",
        tickers: &["NVDA", "AMD", "AVGO", "TSM", "005930.KS", "000660.KS", "042700.KS"],
    },
    ScanPreset {
        id: "bigtech",
        label: "🏢 미국 빅테크",
        tickers: &["AAPL", "MSFT", "GOOGL", "AMZN", "META"],
    },
    ScanPreset {
        id: "battery",
        label: "🔋 2차전지/전기차",
        tickers: &["TSLA", "373220.KS", "006400.KS", "051910.KS", "247540.KQ", "086520.KQ"],
    },
    ScanPreset {
        id: "kr-bluechip",
        label: "🇰🇷 국내 대형주",
        tickers: &[
            "005930.KS",
            "000660.KS",
            "005380.KS",
            "000270.KS",
            "035420.KS",
            "068270.KS",
            "005490.KS",
        ],
    },
    ScanPreset {
        id: "ai-software",
        label: "🤖 AI/소프트웨어",
        tickers: &["PLTR", "MSFT", "NVDA", "035420.KS", "035720.KS"],
    },
];

pub fn presets() -> &'static [ScanPreset] {
    PRESETS
}

pub fn find_preset(id: &str) -> Result<&'static ScanPreset, ValidationError> {
    let wanted = id.trim().to_ascii_lowercase().replace('_', "-");
    PRESETS
        .iter()
        .find(|preset| preset.id == wanted)
        .ok_or_else(|| ValidationError::UnknownPreset {
            value: id.to_owned(),
        })
}

impl ScanPreset {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tickers
            .iter()
            .filter_map(|ticker| Symbol::parse(ticker).ok())
            .collect()
    }
}

/// One evaluated ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanHit {
    pub symbol: Symbol,
    pub close: f64,
    pub score: u8,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub symbol: Symbol,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub preset: String,
    pub label: String,
    pub cutoff: u8,
    pub evaluated: usize,
    /// Tickers at or above the cutoff, best score first.
    pub hits: Vec<ScanHit>,
    pub failures: Vec<ScanFailure>,
    pub completed_at: UtcDateTime,
}

/// Evaluates every ticker of `preset` one at a time, pacing each through
/// `throttle`. Failures are collected instead of aborting the batch.
pub async fn run_scan<F, Fut>(
    preset: &ScanPreset,
    cutoff: u8,
    throttle: &ThrottlingQueue,
    mut evaluate: F,
) -> ScanReport
where
    F: FnMut(Symbol) -> Fut,
    Fut: Future<Output = Result<ScanHit, ScanFailure>>,
{
    let symbols = preset.symbols();
    let mut hits = Vec::new();
    let mut failures = Vec::new();

    for symbol in &symbols {
        if let Err(exhausted) = throttle.until_ready().await {
            failures.push(ScanFailure {
                symbol: symbol.clone(),
                code: String::from("scan.throttled"),
                message: format!(
                    "request budget exhausted after waiting {} ms",
                    exhausted.waited.as_millis()
                ),
            });
            continue;
        }

        match evaluate(symbol.clone()).await {
            Ok(hit) if hit.score >= cutoff => hits.push(hit),
            Ok(hit) => tracing::debug!(symbol = %hit.symbol, score = hit.score, "below cutoff"),
            Err(failure) => {
                tracing::warn!(symbol = %failure.symbol, code = %failure.code, "scan evaluation failed");
                failures.push(failure);
            }
        }
    }

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.symbol.as_str().cmp(b.symbol.as_str())));
    tracing::info!(
        preset = preset.id,
        evaluated = symbols.len(),
        hits = hits.len(),
        failures = failures.len(),
        "sector scan finished"
    );

    ScanReport {
        preset: preset.id.to_owned(),
        label: preset.label.to_owned(),
        cutoff,
        evaluated: symbols.len(),
        hits,
        failures,
        completed_at: UtcDateTime::now(),
    }
}
