use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tickerdash_core::{
    AnalysisError, DashboardError, SourceError, SourceErrorKind, ValidationError,
};

#[derive(Debug, Error)]
pub enum WebError {
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<SourceError> for WebError {
    fn from(error: SourceError) -> Self {
        Self::Dashboard(error.into())
    }
}

impl From<ValidationError> for WebError {
    fn from(error: ValidationError) -> Self {
        Self::Dashboard(error.into())
    }
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Dashboard(DashboardError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Dashboard(DashboardError::Source(error)) => match error.kind() {
                SourceErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                SourceErrorKind::NotFound => StatusCode::NOT_FOUND,
                SourceErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
                SourceErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                SourceErrorKind::Internal => StatusCode::BAD_GATEWAY,
            },
            Self::Dashboard(DashboardError::Analysis(AnalysisError::InsufficientHistory { .. }))
            | Self::Dashboard(DashboardError::Analysis(AnalysisError::EmptySeries)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Bind { .. } | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Dashboard(error) => error.code(),
            Self::Bind { .. } | Self::Io(_) => "server.io",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let retryable = matches!(&self, Self::Dashboard(error) if error.retryable());
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "retryable": retryable,
            }
        });
        (status, Json(body)).into_response()
    }
}
