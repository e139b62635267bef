//! Error types for EasyAdventure
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` so every failure still leaves
//! the service as a JSON body carrying the CORS origin header.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Method + action combination has no route (404)
    #[error("Not found")]
    NotFound,

    /// Required key absent from the request body (400)
    #[error("missing field `{0}`")]
    MissingField(String),

    /// Body or query value present but unusable (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Body is not valid JSON (400)
    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short label used for the `errors_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::MissingField(_) => "missing_field",
            AppError::Validation(_) => "validation",
            AppError::InvalidBody(_) => "invalid_body",
            AppError::Database(_) => "database",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MissingField(_) | AppError::Validation(_) | AppError::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to its HTTP status code and a
    /// `{"error": ...}` JSON body. Database and internal failures
    /// are logged here and reported with a generic message.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status();
        let error_message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database statement failed");
                "Database error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal server error".to_string()
            }
            AppError::Validation(msg) | AppError::InvalidBody(msg) | AppError::Config(msg) => {
                msg.clone()
            }
            AppError::NotFound | AppError::MissingField(_) => self.to_string(),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
