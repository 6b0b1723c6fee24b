use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, UtcDateTime, ValidationError};

/// What kind of instrument a search hit is, from the provider's `quoteType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Etf,
    Index,
    Crypto,
    Forex,
    Fund,
    Other,
}

impl AssetClass {
    pub fn from_quote_type(quote_type: &str) -> Self {
        const TABLE: [(&str, AssetClass); 6] = [
            ("EQUITY", AssetClass::Equity),
            ("ETF", AssetClass::Etf),
            ("MUTUALFUND", AssetClass::Fund),
            ("INDEX", AssetClass::Index),
            ("CRYPTOCURRENCY", AssetClass::Crypto),
            ("CURRENCY", AssetClass::Forex),
        ];
        let quote_type = quote_type.trim();
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(quote_type))
            .map_or(Self::Other, |(_, class)| *class)
    }
}

/// One row of the sidebar search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub name: String,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub asset_class: AssetClass,
}

impl Instrument {
    /// A currency that is not an ISO code is dropped rather than rejected.
    pub fn new(
        symbol: Symbol,
        name: impl Into<String>,
        exchange: Option<String>,
        currency: Option<&str>,
        asset_class: AssetClass,
    ) -> Self {
        Self {
            symbol,
            name: name.into(),
            exchange: exchange.filter(|exchange| !exchange.trim().is_empty()),
            currency: currency.and_then(|code| validate_currency_code(code).ok()),
            asset_class,
        }
    }
}

/// One candle. Prices are in the listing's currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl Bar {
    /// # Errors
    ///
    /// Negative or non-finite prices, `low > high`, or an open/close outside
    /// the high/low range.
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        for (field, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            check_price(field, price)?;
        }
        if low > high {
            return Err(ValidationError::InvalidBarRange);
        }
        let inside = |price: f64| (low..=high).contains(&price);
        if !(inside(open) && inside(close)) {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Drawn red on the chart.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Oldest-first candles for one ticker at one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: Symbol, interval: Interval, bars: Vec<Bar>) -> Self {
        Self {
            symbol,
            interval,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    /// A bar without volume counts as nothing traded.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|bar| bar.volume.map_or(0.0, |shares| shares as f64))
            .collect()
    }
}

/// Header-card figures for one company.
///
/// `return_on_equity` is a fraction (0.12 = 12 %); `debt_to_equity` is in the
/// provider's percent units (150.0 = 1.5x).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamental {
    pub symbol: Symbol,
    pub as_of: UtcDateTime,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub currency: Option<String>,
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub market_cap: Option<f64>,
}

impl Fundamental {
    /// A snapshot with no figures yet, stamped now.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            as_of: UtcDateTime::now(),
            long_name: None,
            short_name: None,
            currency: None,
            return_on_equity: None,
            debt_to_equity: None,
            market_cap: None,
        }
    }

    /// Blank names are ignored.
    #[must_use]
    pub fn with_names(mut self, long_name: Option<String>, short_name: Option<String>) -> Self {
        let present = |name: Option<String>| name.filter(|name| !name.trim().is_empty());
        self.long_name = present(long_name);
        self.short_name = present(short_name);
        self
    }

    /// Codes that are not ISO 4217 are dropped.
    #[must_use]
    pub fn with_currency(mut self, code: Option<&str>) -> Self {
        self.currency = code.and_then(|code| validate_currency_code(code).ok());
        self
    }

    #[must_use]
    pub fn with_ratios(mut self, return_on_equity: Option<f64>, debt_to_equity: Option<f64>) -> Self {
        self.return_on_equity = return_on_equity;
        self.debt_to_equity = debt_to_equity;
        self
    }

    #[must_use]
    pub fn with_market_cap(mut self, market_cap: Option<f64>) -> Self {
        self.market_cap = market_cap;
        self
    }

    /// # Errors
    ///
    /// Non-finite ratios, or a negative or non-finite market cap.
    pub fn checked(self) -> Result<Self, ValidationError> {
        let ratios = [
            ("return_on_equity", self.return_on_equity),
            ("debt_to_equity", self.debt_to_equity),
        ];
        for (field, value) in ratios {
            if value.is_some_and(|value| !value.is_finite()) {
                return Err(ValidationError::NonFiniteValue { field });
            }
        }
        if let Some(cap) = self.market_cap {
            check_price("market_cap", cap)?;
        }
        Ok(self)
    }

    /// Long name, then short name, then the ticker.
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or_else(|| self.symbol.as_str())
    }

    pub fn roe_percent(&self) -> Option<f64> {
        self.return_on_equity.map(|roe| roe * 100.0)
    }
}

/// Upper-cases a three-letter currency code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let code = input.trim();
    if code.len() == 3 && code.bytes().all(|byte| byte.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        })
    }
}

fn check_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    match value {
        v if !v.is_finite() => Err(ValidationError::NonFiniteValue { field }),
        v if v < 0.0 => Err(ValidationError::NegativeValue { field }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samsung() -> Symbol {
        Symbol::parse("005930.KS").expect("symbol")
    }

    #[test]
    fn currency_codes_are_normalized_or_dropped() {
        assert_eq!(validate_currency_code(" krw ").as_deref(), Ok("KRW"));
        assert!(validate_currency_code("USDT").is_err());

        let hit = Instrument::new(samsung(), "삼성전자", Some(String::new()), Some("원화"), AssetClass::Equity);
        assert_eq!(hit.currency, None);
        assert_eq!(hit.exchange, None);
    }

    #[test]
    fn bars_reject_prices_outside_the_range() {
        let ts = UtcDateTime::parse("2024-01-02T00:00:00Z").expect("timestamp");

        assert_eq!(
            Bar::new(ts, 71_000.0, 72_000.0, 70_000.0, 72_500.0, Some(10)),
            Err(ValidationError::InvalidBarBounds)
        );
        assert_eq!(
            Bar::new(ts, 71_000.0, 70_000.0, 72_000.0, 71_000.0, None),
            Err(ValidationError::InvalidBarRange)
        );
        assert_eq!(
            Bar::new(ts, -1.0, 1.0, 0.0, 1.0, None),
            Err(ValidationError::NegativeValue { field: "open" })
        );
        assert!(Bar::new(ts, 71_000.0, 72_000.0, 70_000.0, 70_000.0, None).is_ok());
    }

    #[test]
    fn quote_types_map_case_insensitively() {
        assert_eq!(AssetClass::from_quote_type("etf"), AssetClass::Etf);
        assert_eq!(AssetClass::from_quote_type(" EQUITY "), AssetClass::Equity);
        assert_eq!(AssetClass::from_quote_type("FUTURE"), AssetClass::Other);
    }

    #[test]
    fn display_name_falls_back_to_the_ticker() {
        let fundamental = Fundamental::new(samsung())
            .with_names(Some(String::from("  ")), None)
            .with_currency(Some("krw"))
            .with_ratios(Some(0.091), None)
            .checked()
            .expect("valid fundamentals");

        assert_eq!(fundamental.display_name(), "005930.KS");
        assert_eq!(fundamental.currency.as_deref(), Some("KRW"));
        let roe = fundamental.roe_percent().expect("roe present");
        assert!((roe - 9.1).abs() < 1e-9);
    }

    #[test]
    fn non_finite_figures_are_rejected() {
        let nan_roe = Fundamental::new(samsung()).with_ratios(Some(f64::NAN), None).checked();
        assert_eq!(
            nan_roe.map(|_| ()),
            Err(ValidationError::NonFiniteValue { field: "return_on_equity" })
        );

        let negative_cap = Fundamental::new(samsung()).with_market_cap(Some(-1.0)).checked();
        assert!(negative_cap.is_err());
    }
}
