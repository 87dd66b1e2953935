//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use notification_intake_core::{IngestionError, RegistrationError, ValidationError};
use tracing::{error, warn};

/// Generic body returned for every verification failure
pub const UNAUTHORIZED_MESSAGE: &str = "Notification signature could not be verified";

/// Receive handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the endpoint ID in the URL is not a UUID
/// - `401 Unauthorized`: signature or subscription verification failed
/// - `404 Not Found`: no endpoint with that ID
/// - `503 Service Unavailable`: the endpoint is not bound to a subscription
///   yet; the sender should retry after the `Retry-After` delay
/// - `500 Internal Server Error`: storage failure, nothing was committed
///
/// # Security Considerations
///
/// Verification diagnostics never reach the response body. They are logged
/// server-side at debug level by the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveHandlerError {
    #[error("Invalid endpoint ID: {value}")]
    InvalidEndpointId { value: String },

    #[error("Notification endpoint not found")]
    EndpointNotFound,

    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    #[error("Notification endpoint is not bound to a subscription yet")]
    SubscriptionNotBound { retry_after_seconds: u64 },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl ReceiveHandlerError {
    /// Map an ingestion failure, carrying the configured retry delay
    pub fn from_ingestion(error: IngestionError, retry_after_seconds: u64) -> Self {
        match error {
            IngestionError::EndpointNotFound { .. } => Self::EndpointNotFound,
            IngestionError::Unauthorized { .. } => Self::Unauthorized,
            IngestionError::SubscriptionNotBound { .. } => Self::SubscriptionNotBound {
                retry_after_seconds,
            },
            other @ (IngestionError::Store(_) | IngestionError::Repository(_)) => {
                Self::InternalError {
                    message: other.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ReceiveHandlerError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            Self::InvalidEndpointId { .. } => (StatusCode::BAD_REQUEST, self.to_string(), None),
            Self::EndpointNotFound => (StatusCode::NOT_FOUND, self.to_string(), None),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), None),
            Self::SubscriptionNotBound {
                retry_after_seconds,
            } => {
                warn!("Delivery to endpoint without subscription");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    self.to_string(),
                    Some(retry_after_seconds),
                )
            }
            Self::InternalError { ref message } => {
                error!(error = %message, "Notification ingestion failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error occurred. Please try again later.".to_string(),
                    None,
                )
            }
        };

        error_response(status, message, retry_after)
    }
}

/// Registration handler errors with HTTP status code mapping
#[derive(Debug, thiserror::Error)]
pub enum RegistrationHandlerError {
    #[error("Invalid endpoint ID: {value}")]
    InvalidEndpointId { value: String },

    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Notification endpoint not found")]
    NotFound,

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl From<RegistrationError> for RegistrationHandlerError {
    fn from(error: RegistrationError) -> Self {
        match error {
            RegistrationError::Validation(e) => Self::Validation(e),
            RegistrationError::NotFound { .. } => Self::NotFound,
            RegistrationError::Repository(e) => Self::InternalError {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for RegistrationHandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidEndpointId { .. } | Self::InvalidBody { .. } | Self::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::InternalError { ref message } => {
                error!(error = %message, "Endpoint registration failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error occurred. Please try again later.".to_string(),
                )
            }
        };

        error_response(status, message, None)
    }
}

fn error_response(status: StatusCode, message: String, retry_after: Option<u64>) -> Response {
    let body = serde_json::json!({
        "error": message,
        "status": status.as_u16(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let mut response = (status, Json(body)).into_response();

    if let Some(retry_seconds) = retry_after {
        if let Ok(header_value) = retry_seconds.to_string().parse() {
            response.headers_mut().insert("Retry-After", header_value);
        }
    }

    response
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Startup failed: {message}")]
    StartupFailed { message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Invalid configuration value: {0}")]
    Validation(#[from] ValidationError),
}
