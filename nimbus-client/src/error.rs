//! Error types for Nimbus API operations.
//!
//! HTTP failures are mapped to variants by status code. The message carried by
//! each variant is the API's own error text, so callers can surface it as is.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Main error type for Nimbus API operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API rejected the request payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The object already exists or is in a conflicting state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The API is temporarily unavailable (rate limited, overloaded, or down)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The request timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Any other unsuccessful HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code returned by the API
        status: u16,
        /// Error text returned by the API
        message: String,
    },

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The configured endpoint is not a valid URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized result type for Nimbus API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns true if the object addressed by the request does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the request may succeed when sent again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Timeout(_))
    }

    /// Map an unsuccessful response to an error.
    ///
    /// `body` is the raw response body; when it is a JSON error document its
    /// `message` field is used, otherwise the body itself.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = api_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

        match status {
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::BadRequest(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => Self::ServiceUnavailable(message),
            status if status.is_server_error() => {
                Self::ServiceUnavailable(format!("server error {status}: {message}"))
            }
            status => Self::Http {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn api_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|b| b.message)
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
