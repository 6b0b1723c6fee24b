use thiserror::Error;

/// Input that cannot be turned into a ticker, a bar, or a request.
///
/// Messages are shown to API callers verbatim; the web layer maps the
/// variants that users can fix themselves to Korean banners.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no ticker or company name given")]
    EmptySymbol,
    #[error("ticker is {len} characters long; at most {max} are allowed")]
    SymbolTooLong { len: usize, max: usize },
    #[error("'{ch}' cannot start a ticker (company names must be resolved first)")]
    SymbolInvalidStart { ch: char },
    #[error("ticker character {index} ('{ch}') is not a letter, digit, '.', '-' or '='")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("unsupported interval '{value}'; use 1m, 5m, 15m, 1h, 1d or 1wk")]
    InvalidInterval { value: String },
    #[error("unsupported history range '{value}'; use 5d, 1mo, 3mo, 6mo, 1y, 2y or 5y")]
    InvalidRange { value: String },
    #[error("'{value}' is not a UTC RFC3339 timestamp ending in Z")]
    TimestampNotUtc { value: String },
    #[error("'{value}' is not an ISO 4217 currency code")]
    InvalidCurrency { value: String },

    #[error("{field} is NaN or infinite")]
    NonFiniteValue { field: &'static str },
    #[error("{field} is negative")]
    NegativeValue { field: &'static str },
    #[error("bar low is above its high")]
    InvalidBarRange,
    #[error("bar opens or closes outside its high/low")]
    InvalidBarBounds,

    #[error("cost basis must be a positive number")]
    InvalidCostBasis,
    #[error("no scan preset named '{value}'")]
    UnknownPreset { value: String },

    #[error("request id is shorter than 8 characters")]
    InvalidRequestId,
    #[error("envelope error is missing its code")]
    EmptyErrorCode,
    #[error("envelope error is missing its message")]
    EmptyErrorMessage,
}

/// Why an indicator frame or score could not be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no price bars to analyze")]
    EmptySeries,
    #[error("indicators need {required} bars but only {available} came back")]
    InsufficientHistory { required: usize, available: usize },
}
