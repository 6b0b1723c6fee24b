use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Supported time bucket intervals for bar data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Interval {
    pub const ALL: [Self; 6] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::OneHour,
        Self::OneDay,
        Self::OneWeek,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
        }
    }

    /// Human label shown on the interval selector.
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneMinute => "1분봉",
            Self::FiveMinutes => "5분봉",
            Self::FifteenMinutes => "15분봉",
            Self::OneHour => "60분봉",
            Self::OneDay => "일봉",
            Self::OneWeek => "주봉",
        }
    }

    /// History window requested for this interval; intraday bars are only
    /// served upstream for short lookbacks.
    pub const fn default_range(self) -> HistoryRange {
        match self {
            Self::OneMinute => HistoryRange::FiveDays,
            Self::FiveMinutes | Self::FifteenMinutes => HistoryRange::OneMonth,
            Self::OneHour => HistoryRange::ThreeMonths,
            Self::OneDay => HistoryRange::OneYear,
            Self::OneWeek => HistoryRange::FiveYears,
        }
    }

    pub const fn is_intraday(self) -> bool {
        !matches!(self, Self::OneDay | Self::OneWeek)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" | "60m" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            "1wk" | "1w" => Ok(Self::OneWeek),
            other => Err(ValidationError::InvalidInterval {
                value: other.to_owned(),
            }),
        }
    }
}

/// Lookback window for a bar request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl HistoryRange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }

    /// Approximate calendar days covered by the range.
    pub const fn days(self) -> i64 {
        match self {
            Self::FiveDays => 5,
            Self::OneMonth => 30,
            Self::ThreeMonths => 91,
            Self::SixMonths => 182,
            Self::OneYear => 365,
            Self::TwoYears => 730,
            Self::FiveYears => 1826,
        }
    }
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "5d" => Ok(Self::FiveDays),
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            other => Err(ValidationError::InvalidRange {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval() {
        let interval = Interval::from_str("1d").expect("must parse");
        assert_eq!(interval, Interval::OneDay);
        assert_eq!(Interval::from_str("60m").expect("alias"), Interval::OneHour);
    }

    #[test]
    fn rejects_invalid_interval() {
        let err = Interval::from_str("2h").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidInterval { .. }));
    }

    #[test]
    fn intraday_intervals_use_short_lookback() {
        assert_eq!(Interval::OneMinute.default_range(), HistoryRange::FiveDays);
        assert_eq!(Interval::OneDay.default_range(), HistoryRange::OneYear);
        assert!(Interval::FifteenMinutes.is_intraday());
        assert!(!Interval::OneWeek.is_intraday());
    }

    #[test]
    fn parses_range() {
        assert_eq!(HistoryRange::from_str("6MO").expect("range"), HistoryRange::SixMonths);
        assert!(matches!(
            HistoryRange::from_str("10y"),
            Err(ValidationError::InvalidRange { .. })
        ));
    }
}
