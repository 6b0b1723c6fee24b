//! Deterministic synthetic market data for offline runs.
//!
//! Every symbol maps to a seeded random walk, so the same symbol always
//! yields the same prices and scores across runs.

use time::Duration;

use crate::data_source::{BarsRequest, SearchBatch, SearchRequest, SourceError};
use crate::{
    AssetClass, Bar, BarSeries, Fundamental, Instrument, Interval, Symbol, UtcDateTime,
    ValidationError,
};

const MIN_BARS: usize = 60;
const MAX_BARS: usize = 400;

struct CatalogEntry {
    symbol: &'static str,
    name: &'static str,
    exchange: &'static str,
    asset_class: AssetClass,
}

const CATALOG: &[CatalogEntry] = &[
    entry("005930.KS", "Samsung Electronics Co., Ltd.", "KSE"),
    entry("000660.KS", "SK hynix Inc.", "KSE"),
    entry("035420.KS", "NAVER Corporation", "KSE"),
    entry("035720.KS", "Kakao Corp.", "KSE"),
    entry("005380.KS", "Hyundai Motor Company", "KSE"),
    entry("373220.KS", "LG Energy Solution, Ltd.", "KSE"),
    entry("006400.KS", "Samsung SDI Co., Ltd.", "KSE"),
    entry("051910.KS", "LG Chem, Ltd.", "KSE"),
    entry("AAPL", "Apple Inc.", "NASDAQ"),
    entry("MSFT", "Microsoft Corporation", "NASDAQ"),
    entry("NVDA", "NVIDIA Corporation", "NASDAQ"),
    entry("TSLA", "Tesla, Inc.", "NASDAQ"),
    entry("GOOGL", "Alphabet Inc.", "NASDAQ"),
    entry("AMZN", "Amazon.com, Inc.", "NASDAQ"),
    entry("META", "Meta Platforms, Inc.", "NASDAQ"),
    entry("AMD", "Advanced Micro Devices, Inc.", "NASDAQ"),
    entry("AVGO", "Broadcom Inc.", "NASDAQ"),
    entry("TSM", "Taiwan Semiconductor Manufacturing Company Limited", "NYSE"),
    entry("PLTR", "Palantir Technologies Inc.", "NASDAQ"),
    CatalogEntry {
        symbol: "SPY",
        name: "SPDR S&P 500 ETF Trust",
        exchange: "NYSEArca",
        asset_class: AssetClass::Etf,
    },
    CatalogEntry {
        symbol: "^KS11",
        name: "KOSPI Composite Index",
        exchange: "KSE",
        asset_class: AssetClass::Index,
    },
];

const fn entry(symbol: &'static str, name: &'static str, exchange: &'static str) -> CatalogEntry {
    CatalogEntry {
        symbol,
        name,
        exchange,
        asset_class: AssetClass::Equity,
    }
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(5381_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

fn step(interval: Interval) -> Duration {
    match interval {
        Interval::OneMinute => Duration::minutes(1),
        Interval::FiveMinutes => Duration::minutes(5),
        Interval::FifteenMinutes => Duration::minutes(15),
        Interval::OneHour => Duration::hours(1),
        Interval::OneDay => Duration::days(1),
        Interval::OneWeek => Duration::weeks(1),
    }
}

/// Roughly how many bars the real endpoint returns for this window.
fn bar_count(req: &BarsRequest) -> usize {
    let trading_days = (req.range.days() * 5 / 7).max(1) as usize;
    let count = match req.interval {
        Interval::OneMinute => trading_days * 390,
        Interval::FiveMinutes => trading_days * 78,
        Interval::FifteenMinutes => trading_days * 26,
        Interval::OneHour => trading_days * 7,
        Interval::OneDay => trading_days,
        Interval::OneWeek => req.range.days() as usize / 7,
    };
    count.clamp(MIN_BARS, MAX_BARS)
}

fn internal(error: ValidationError) -> SourceError {
    SourceError::internal(error.to_string())
}

pub(crate) fn bars(req: &BarsRequest) -> Result<BarSeries, SourceError> {
    let seed = symbol_seed(&req.symbol);
    let mut rng = fastrand::Rng::with_seed(seed ^ req.interval.as_str().len() as u64);
    let count = bar_count(req);
    let step = step(req.interval);
    let now = UtcDateTime::now().into_inner();

    let mut close = if req.symbol.market().is_korean() {
        20_000.0 + (seed % 180) as f64 * 1_000.0
    } else {
        40.0 + (seed % 460) as f64
    };
    let drift = ((seed % 7) as f64 - 3.0) / 2_000.0;
    let volatility = 0.01 + (seed % 5) as f64 / 500.0;
    let base_volume = 200_000 + seed % 5_000_000;

    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let open = close;
        let shock = (rng.f64() - 0.5) * 2.0 * volatility;
        close = (open * (1.0 + drift + shock)).max(0.01);
        let high = open.max(close) * (1.0 + rng.f64() * volatility / 2.0);
        let low = open.min(close) * (1.0 - rng.f64() * volatility / 2.0);
        let volume = base_volume / 2 + rng.u64(0..=base_volume);

        let offset = step * (count - index - 1) as i32;
        let ts = UtcDateTime::from_offset_datetime(now - offset).map_err(internal)?;
        out.push(Bar::new(ts, open, high, low, close, Some(volume)).map_err(internal)?);
    }

    Ok(BarSeries::new(req.symbol.clone(), req.interval, out))
}

pub(crate) fn fundamentals(symbol: &Symbol) -> Result<Fundamental, SourceError> {
    let seed = symbol_seed(symbol);
    let name = CATALOG
        .iter()
        .find(|entry| entry.symbol == symbol.as_str())
        .map(|entry| entry.name.to_owned());

    Fundamental::new(symbol.clone())
        .with_names(name.clone(), name)
        .with_currency(Some(symbol.market().currency()))
        .with_ratios(
            Some(-0.05 + (seed % 40) as f64 / 100.0),
            Some(10.0 + (seed % 190) as f64),
        )
        .with_market_cap(Some(1.0e10 + (seed % 3_000) as f64 * 1.0e9))
        .checked()
        .map_err(internal)
}

pub(crate) fn search(req: &SearchRequest) -> SearchBatch {
    let needle = req.query.to_lowercase();
    let results = CATALOG
        .iter()
        .filter(|entry| {
            entry.symbol.to_lowercase().contains(&needle)
                || entry.name.to_lowercase().contains(&needle)
        })
        .filter_map(|entry| {
            let symbol = Symbol::parse(entry.symbol).ok()?;
            let currency = symbol.market().currency();
            Some(Instrument::new(
                symbol,
                entry.name,
                Some(entry.exchange.to_owned()),
                Some(currency),
                entry.asset_class,
            ))
        })
        .take(req.limit)
        .collect();

    SearchBatch {
        query: req.query.clone(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HistoryRange;

    fn request(symbol: &str, interval: Interval) -> BarsRequest {
        BarsRequest::with_default_range(Symbol::parse(symbol).expect("symbol"), interval)
    }

    #[test]
    fn same_symbol_yields_same_prices() {
        let first = bars(&request("NVDA", Interval::OneDay)).expect("bars");
        let second = bars(&request("NVDA", Interval::OneDay)).expect("bars");
        assert_eq!(first.closes(), second.closes());

        let other = bars(&request("AAPL", Interval::OneDay)).expect("bars");
        assert_ne!(first.closes(), other.closes());
    }

    #[test]
    fn bars_are_ordered_and_sized_for_the_window() {
        let series = bars(&BarsRequest::new(
            Symbol::parse("005930.KS").expect("symbol"),
            Interval::OneDay,
            HistoryRange::OneYear,
        ))
        .expect("bars");

        assert_eq!(series.len(), 260);
        assert!(series.bars.windows(2).all(|pair| pair[0].ts < pair[1].ts));
        assert!(series.bars[0].close > 1_000.0, "KRW listings trade in won");
    }

    #[test]
    fn search_matches_names_and_symbols() {
        let batch = search(&SearchRequest::new("samsung", 10).expect("request"));
        let symbols: Vec<&str> = batch.results.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["005930.KS", "006400.KS"]);
        assert_eq!(batch.results[0].currency.as_deref(), Some("KRW"));
    }

    #[test]
    fn fundamentals_use_catalog_names() {
        let fundamental =
            fundamentals(&Symbol::parse("TSLA").expect("symbol")).expect("fundamentals");
        assert_eq!(fundamental.display_name(), "Tesla, Inc.");
        assert_eq!(fundamental.currency.as_deref(), Some("USD"));
        assert!(fundamental.return_on_equity.is_some());
    }
}
