//! # Domain Models
//!
//! Canonical domain types for tickerdash market data.
//!
//! All models validate their invariants at construction time:
//!
//! ```rust,ignore
//! use tickerdash_core::{Bar, UtcDateTime, ValidationError};
//!
//! let ts = UtcDateTime::parse("2024-01-01T00:00:00Z")?;
//! let bar = Bar::new(ts, 100.0, 105.0, 95.0, 102.0, Some(1000))?;
//!
//! // high < low is rejected
//! let invalid = Bar::new(ts, 100.0, 95.0, 105.0, 102.0, Some(1000));
//! assert!(matches!(invalid, Err(ValidationError::InvalidBarRange)));
//! ```
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bar`] | OHLCV bar with timestamp |
//! | [`BarSeries`] | Ordered bars for a symbol/interval |
//! | [`Fundamental`] | Name, ROE, debt-to-equity, market cap |
//! | [`Instrument`] | Symbol-search hit |
//! | [`Symbol`] / [`Market`] | Validated ticker and its listing venue |
//! | [`Interval`] / [`HistoryRange`] | Bar interval and lookback window |
//! | [`UtcDateTime`] | UTC timestamp |

mod interval;
mod models;
mod symbol;
mod timestamp;

pub use interval::{HistoryRange, Interval};
pub use models::{validate_currency_code, AssetClass, Bar, BarSeries, Fundamental, Instrument};
pub use symbol::{Market, Symbol};
pub use timestamp::UtcDateTime;
