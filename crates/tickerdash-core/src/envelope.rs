//! JSON wrapper shared by the CLI and the `/api` routes.
//!
//! ```json
//! {"meta": {"request_id": "…", "source": "yahoo", "cache_hit": true, …},
//!  "data": {…},
//!  "errors": [{"code": "source.rate_limited", "message": "…", "retryable": true}]}
//! ```
//!
//! `errors` is omitted when empty. A populated `errors` list next to `data`
//! means the call partially succeeded (for example a scan with failed tickers).

use serde::{Deserialize, Serialize};

use crate::{DashboardError, UtcDateTime, ValidationError};

const MIN_REQUEST_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self::assemble(meta, data, Vec::new())
    }

    /// # Errors
    ///
    /// Rejects metadata or error entries that fail their own checks.
    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ValidationError> {
        meta.validate()?;
        errors.iter().try_for_each(EnvelopeError::validate)?;
        Ok(Self::assemble(meta, data, errors))
    }

    fn assemble(meta: EnvelopeMeta, data: T, errors: Vec<EnvelopeError>) -> Self {
        Self { meta, data, errors }
    }

    pub fn push_error(&mut self, error: EnvelopeError) -> Result<(), ValidationError> {
        error.validate().map(|()| self.errors.push(error))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub generated_at: UtcDateTime,
    /// Adapter name, `yahoo` or `yahoo-offline`.
    pub source: String,
    pub latency_ms: u64,
    /// True only when every upstream read behind `data` came from cache.
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        source: impl Into<String>,
        latency_ms: u64,
        cache_hit: bool,
    ) -> Result<Self, ValidationError> {
        let meta = Self {
            request_id: request_id.into(),
            generated_at: UtcDateTime::now(),
            source: source.into(),
            latency_ms,
            cache_hit,
            warnings: Vec::new(),
        };
        meta.validate().map(|()| meta)
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().chars().count() < MIN_REQUEST_ID_LEN {
            Err(ValidationError::InvalidRequestId)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    /// Dotted code such as `validation.symbol` or `source.not_found`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            retryable: None,
        };
        error.validate().map(|()| error)
    }

    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.code.trim().is_empty(), self.message.trim().is_empty()) {
            (true, _) => Err(ValidationError::EmptyErrorCode),
            (false, true) => Err(ValidationError::EmptyErrorMessage),
            (false, false) => Ok(()),
        }
    }
}

impl From<&DashboardError> for EnvelopeError {
    fn from(error: &DashboardError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.to_string(),
            retryable: Some(error.retryable()),
        }
    }
}
