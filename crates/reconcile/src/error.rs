//! Error types for reconciliation
//!
//! Validation problems and conflicting parameters are raised before any
//! provider call. Provider failures carry the provider's own message
//! untouched. "Not found" is never an error: see [`crate::client::Lookup`].

use crate::field::FieldPath;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classes of provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Structured "resource does not exist"
    NotFound,
    /// Concurrent modification or state conflict
    Conflict,
    /// Rate limited
    Throttled,
    /// Authentication or authorization failure
    Unauthorized,
    /// The provider rejected the request body
    BadRequest,
    /// Connection, DNS, TLS or timeout failure
    Transport,
    /// Anything else
    Other,
}

/// A failure reported by a resource client
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// The provider's message, verbatim
    pub message: String,
    /// HTTP status, when the provider speaks HTTP
    pub status: Option<u16>,
    /// Provider error code (e.g. "ResourceGroupNotFound")
    pub code: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether the provider signalled a structured not-found condition
    pub fn is_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::NotFound
    }
}

/// Input that failed schema validation; every problem is listed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl ValidationError {
    pub fn new(problems: Vec<String>) -> Self {
        Self { problems }
    }

    pub fn single(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

/// Errors that abort a reconciliation
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation
    #[error("invalid parameters: {0}")]
    Validation(#[from] ValidationError),

    /// Mutually exclusive parameters were given together
    #[error("parameters are mutually exclusive: {}", .params.join(", "))]
    Conflicting {
        /// The parameters that were given together
        params: Vec<String>,
    },

    /// The resource client failed
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// A create-only field differs on an existing resource
    #[error("cannot change create-only field(s) of {identity}: {}", join_paths(.fields))]
    ImmutableField {
        identity: String,
        fields: Vec<FieldPath>,
    },
}

impl Error {
    /// The error class reported in outcomes
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Conflicting { .. } => ErrorKind::ConflictingDesiredState,
            Error::Provider(_) => ErrorKind::Provider,
            Error::ImmutableField { .. } => ErrorKind::ImmutableField,
        }
    }
}

/// Errors that abort a whole plan execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("confirmation failed: {0}")]
    Confirm(#[from] std::io::Error),

    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Serializable error class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ConflictingDesiredState,
    Provider,
    ImmutableField,
}

fn join_paths(paths: &[FieldPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = Error::from(
            ProviderError::new(ProviderErrorKind::Conflict, "Another operation is in progress")
                .with_status(409)
                .with_code("OperationNotAllowed"),
        );
        assert_eq!(err.to_string(), "Another operation is in progress");
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn test_not_found_detection() {
        assert!(ProviderError::not_found("gone").is_not_found());
        assert!(!ProviderError::new(ProviderErrorKind::Other, "boom").is_not_found());
    }

    #[test]
    fn test_validation_lists_all_problems() {
        let err = Error::from(ValidationError::new(vec![
            "missing required parameter: name".into(),
            "sku must be one of: Standard, Premium".into(),
        ]));
        assert_eq!(
            err.to_string(),
            "invalid parameters: missing required parameter: name; sku must be one of: Standard, Premium"
        );
    }

    #[test]
    fn test_immutable_message() {
        let err = Error::ImmutableField {
            identity: "managed_disk:rg/d1".into(),
            fields: vec!["location".into(), "properties.creationData".into()],
        };
        assert_eq!(
            err.to_string(),
            "cannot change create-only field(s) of managed_disk:rg/d1: location, properties.creationData"
        );
        assert_eq!(err.kind(), ErrorKind::ImmutableField);
    }
}
