//! Error types for ARM requests.
//!
//! Errors are categorized to drive retry logic: network failures,
//! throttling and server errors are transient; everything else is not.

use crate::transport::Response;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Categories of ARM errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS, TLS or timeout failure (transient)
    Network,
    /// 404
    NotFound,
    /// 429 (transient)
    Throttled,
    /// 5xx (transient)
    Server,
    /// 409 / 412
    Conflict,
    /// 401 / 403
    Unauthorized,
    /// 400 / 422
    BadRequest,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Throttled | Self::Server)
    }

    /// Category for an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            429 => Self::Throttled,
            409 | 412 => Self::Conflict,
            401 | 403 => Self::Unauthorized,
            400 | 422 => Self::BadRequest,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity to the management endpoint and try again",
            Self::NotFound => "Verify the subscription, resource group and resource name",
            Self::Throttled => "Too many requests; wait and try again",
            Self::Server => "The service reported an internal error; try again later",
            Self::Conflict => "Another operation is in progress on this resource",
            Self::Unauthorized => "Check that the access token is valid and has the required role",
            Self::BadRequest => "The request body was rejected; check the resource parameters",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during ARM requests.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response
    #[error("network error: {message}")]
    Network { message: String },

    /// The service answered with an error status
    #[error("{message}")]
    Http {
        status: u16,
        /// Service error code, e.g. "ResourceGroupNotFound"
        code: Option<String>,
        /// Service message, verbatim
        message: String,
        /// Server-requested delay before retrying
        retry_after: Option<Duration>,
    },

    /// The response body could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct Envelope {
    error: Option<ErrorBody>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::Http { status, .. } => ErrorCategory::from_status(*status),
            Error::InvalidResponse(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Build an error from an error response.
    ///
    /// Understands the ARM error envelope as well as bare `{code, message}`
    /// bodies; anything else falls back to the raw body.
    pub fn from_response(response: &Response) -> Self {
        let (code, message) = match serde_json::from_str::<Envelope>(&response.body) {
            Ok(Envelope {
                error: Some(inner), ..
            }) => (inner.code, inner.message),
            Ok(Envelope { code, message, .. }) => (code, message),
            Err(_) => (None, None),
        };

        let message = message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                let raw = response.body.trim();
                (!raw.is_empty()).then(|| raw.to_string())
            })
            .unwrap_or_else(|| format!("HTTP {}", response.status));

        let retry_after = response
            .header("Retry-After")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        Error::Http {
            status: response.status,
            code,
            message,
            retry_after,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Http {
                status,
                code: None,
                message: format!("HTTP {status}"),
                retry_after: None,
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for ARM requests.
pub type Result<T> = std::result::Result<T, Error>;
