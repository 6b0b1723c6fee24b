use std::fmt::{Display, Formatter};

use tickerdash_core::{EnvelopeMeta, ValidationError};
use uuid::Uuid;

/// Request identifier (UUID v4) stamped on every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Builds envelope metadata for one command run.
pub fn envelope_meta(
    source: &str,
    latency_ms: u64,
    cache_hit: bool,
    warnings: Vec<String>,
) -> Result<EnvelopeMeta, ValidationError> {
    EnvelopeMeta::new(RequestId::new_v4().to_string(), source, latency_ms, cache_hit)
        .map(|meta| meta.with_warnings(warnings))
}
