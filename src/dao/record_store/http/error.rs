//! Error types raised by the HTTP record store client.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`HttpStoreError`] failures.
pub type HttpStoreResult<T> = Result<T, HttpStoreError>;

/// Failures that can occur while talking to the remote record store.
#[derive(Debug, Error)]
pub enum HttpStoreError {
    /// Required environment variable is missing.
    #[error("missing record store environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build record store client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request for `action` could not be sent.
    #[error("failed to send `{action}` request to the record store")]
    RequestSend {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The store answered with a non-success HTTP status.
    #[error("unexpected record store response status {status} for `{action}`")]
    RequestStatus {
        action: &'static str,
        status: StatusCode,
    },
    /// Response payload could not be parsed into the expected JSON shape.
    #[error("failed to decode record store response for `{action}`")]
    DecodeResponse {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The store answered with an explicit error status.
    #[error("record store refused `{action}`: {message}")]
    Refused {
        action: &'static str,
        message: String,
    },
}

impl From<HttpStoreError> for StorageError {
    fn from(err: HttpStoreError) -> Self {
        match err {
            HttpStoreError::Refused { message, .. } => StorageError::rejected(message),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
