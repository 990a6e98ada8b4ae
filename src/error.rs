//! Error types for the PDFToolkit server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pdf::{AssemblyError, RasterError};
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded. Max {max_requests} requests per {window_secs} seconds.")]
    RateLimited {
        max_requests: usize,
        window_secs: u64,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::NotFound(format!("File not found: {}", name)),
            StorageError::InvalidName(name) => {
                AppError::Validation(format!("Invalid filename: {:?}", name))
            }
            StorageError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<RasterError> for AppError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::Source(e) => e.into(),
            RasterError::Join(msg) => AppError::Internal(msg),
            other => AppError::Processing(other.to_string()),
        }
    }
}

impl From<AssemblyError> for AppError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::MissingSource(_) => AppError::NotFound(err.to_string()),
            AssemblyError::EmptyRequest
            | AssemblyError::InvalidSourceName(_)
            | AssemblyError::PageOutOfRange { .. } => AppError::Validation(err.to_string()),
            AssemblyError::Malformed { .. } => AppError::Processing(err.to_string()),
            AssemblyError::WriteFailure(e) => AppError::Internal(format!("Failed to write PDF: {}", e)),
            AssemblyError::Build(_) | AssemblyError::Join(_) => AppError::Internal(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Processing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match &self {
            AppError::Validation(msg) => ("validation_error", msg.clone()),
            AppError::Unauthorized(msg) => ("unauthorized", msg.clone()),
            AppError::Forbidden(msg) => ("forbidden", msg.clone()),
            AppError::RateLimited { .. } => ("rate_limited", self.to_string()),
            AppError::NotFound(msg) => ("not_found", msg.clone()),
            AppError::Processing(msg) => {
                tracing::warn!("Processing error: {}", msg);
                ("processing_error", msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                ("io_error", "An internal error occurred".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_error_mapping() {
        let missing: AppError = AssemblyError::MissingSource("a.pdf".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let range: AppError = AssemblyError::PageOutOfRange {
            source_pdf: "a.pdf".into(),
            page: 9,
            page_count: 3,
        }
        .into();
        assert_eq!(range.status(), StatusCode::BAD_REQUEST);

        let malformed: AppError = AssemblyError::Malformed {
            source_pdf: "a.pdf".into(),
            reason: "no trailer".into(),
        }
        .into();
        assert_eq!(malformed.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_raster_error_mapping() {
        let missing: AppError = RasterError::Source(StorageError::NotFound("x.pdf".into())).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken: AppError = RasterError::Open("bad xref".into()).into();
        assert_eq!(broken.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_rate_limited_message_echoes_limits() {
        let err = AppError::RateLimited {
            max_requests: 100,
            window_secs: 3600,
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Max 100 requests per 3600 seconds."
        );
    }
}
