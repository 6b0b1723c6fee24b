use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickerdash_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Dashboard(#[from] tickerdash_core::DashboardError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] tickerdash_core::ConfigError),

    #[error(transparent)]
    Server(#[from] tickerdash_web::WebError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<tickerdash_core::SourceError> for CliError {
    fn from(error: tickerdash_core::SourceError) -> Self {
        Self::Dashboard(error.into())
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Dashboard(_) => 3,
            Self::Serialization(_) => 4,
            Self::Config(_) => 7,
            Self::Server(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(
            CliError::from(tickerdash_core::ValidationError::InvalidCostBasis).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(tickerdash_core::ConfigError::Invalid(String::from("x"))).exit_code(),
            7
        );
        assert_eq!(
            CliError::from(std::io::Error::other("disk")).exit_code(),
            10
        );
    }
}
