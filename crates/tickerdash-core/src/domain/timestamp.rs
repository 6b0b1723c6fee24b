use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::formatting::Formattable;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// A UTC instant; serialized as RFC3339 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Only `Z`-suffixed (or `+00:00`) timestamps are accepted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        OffsetDateTime::parse(input.trim(), &Rfc3339)
            .ok()
            .filter(|parsed| parsed.offset() == UtcOffset::UTC)
            .map(Self)
            .ok_or_else(|| ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() == UtcOffset::UTC {
            Ok(Self(value))
        } else {
            Err(ValidationError::TimestampNotUtc {
                value: value.to_string(),
            })
        }
    }

    /// Epoch seconds, as the chart endpoint reports bar times.
    pub fn from_unix_timestamp(seconds: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp(seconds)
            .map(Self)
            .map_err(|_| ValidationError::TimestampNotUtc {
                value: seconds.to_string(),
            })
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn unix_timestamp(self) -> i64 {
        self.0.unix_timestamp()
    }

    pub fn format_rfc3339(self) -> String {
        self.render(&Rfc3339)
    }

    /// Daily chart axis label, `2024-01-02`.
    pub fn format_date(self) -> String {
        self.render(format_description!("[year]-[month]-[day]"))
    }

    /// Intraday chart axis label, `01-02 03:00`.
    pub fn format_short_datetime(self) -> String {
        self.render(format_description!("[month]-[day] [hour]:[minute]"))
    }

    /// "마지막 동기화" caption, `03:00:00`.
    pub fn format_clock(self) -> String {
        self.render(format_description!("[hour]:[minute]:[second]"))
    }

    fn render(self, format: &(impl Formattable + ?Sized)) -> String {
        self.0
            .format(format)
            .unwrap_or_else(|_| self.0.unix_timestamp().to_string())
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.format_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_utc_offsets() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("utc");
        assert_eq!(parsed.to_string(), "2024-01-01T00:00:00Z");

        assert!(matches!(
            UtcDateTime::parse("2024-01-01T09:00:00+09:00"),
            Err(ValidationError::TimestampNotUtc { .. })
        ));
        assert!(UtcDateTime::parse("yesterday").is_err());
    }

    #[test]
    fn json_round_trip_rejects_local_times() {
        let ts = UtcDateTime::from_unix_timestamp(1_704_164_400).expect("valid epoch");
        let json = serde_json::to_string(&ts).expect("serializes");
        assert_eq!(json, "\"2024-01-02T03:00:00Z\"");
        assert_eq!(serde_json::from_str::<UtcDateTime>(&json).expect("parses"), ts);

        assert!(serde_json::from_str::<UtcDateTime>("\"2024-01-02T12:00:00+09:00\"").is_err());
    }

    #[test]
    fn chart_and_caption_labels() {
        let ts = UtcDateTime::from_unix_timestamp(1_704_164_400).expect("valid epoch");
        assert_eq!(ts.format_date(), "2024-01-02");
        assert_eq!(ts.format_short_datetime(), "01-02 03:00");
        assert_eq!(ts.format_clock(), "03:00:00");
    }
}
