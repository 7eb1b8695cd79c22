use std::fmt;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::progress_cache::CacheError,
    services::draw_engine::DrawError,
    state::{ApplyError, PlanError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input, rejected before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The record store has no such team.
    #[error("team `{0}` not found")]
    TeamNotFound(String),
    /// Every round is already recorded for the team. A legitimate end state.
    #[error("all rounds already drawn for team `{0}`")]
    AllRoundsComplete(String),
    /// The record store refused to acknowledge a result. Retry the commit, not the draw.
    #[error("recording failed: {0}")]
    RecordingFailed(String),
    /// The record store could not be reached.
    #[error("record store unreachable: {0}")]
    Connectivity(String),
    /// The draw engine had nothing to draw from.
    #[error("no eligible outcome left to draw from")]
    EmptyEligibleSet,
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The session moved on (reset) while the operation was in flight; its result was dropped.
    #[error("session changed during operation: {0}")]
    Stale(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The local progress cache could not be written.
    #[error("progress cache failure")]
    Cache(#[from] CacheError),
    /// A background session task ended without producing a result.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable discriminant exposed to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::TeamNotFound(_) => "team_not_found",
            ServiceError::AllRoundsComplete(_) => "all_rounds_complete",
            ServiceError::RecordingFailed(_) => "recording_failed",
            ServiceError::Connectivity(_) => "connectivity_error",
            ServiceError::EmptyEligibleSet => "empty_eligible_set",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::Stale(_) => "stale_session",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Cache(_) => "cache_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

impl From<DrawError> for ServiceError {
    fn from(err: DrawError) -> Self {
        match err {
            DrawError::EmptyEligibleSet => ServiceError::EmptyEligibleSet,
        }
    }
}

/// Error description returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Machine-readable error kind.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&ServiceError> for Failure {
    fn from(err: &ServiceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(Failure),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(Failure),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(Failure),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(Failure),
    /// Upstream record store refused the request.
    #[error("bad gateway: {0}")]
    BadGateway(Failure),
    /// Upstream record store unreachable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(Failure),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(Failure),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(Failure {
            kind: "invalid_input",
            message: format!("validation failed: {}", err),
        })
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let failure = Failure::from(&err);
        match err {
            ServiceError::InvalidInput(_) => AppError::BadRequest(failure),
            ServiceError::Unauthorized(_) => AppError::Unauthorized(failure),
            ServiceError::TeamNotFound(_) | ServiceError::NotFound(_) => {
                AppError::NotFound(failure)
            }
            ServiceError::AllRoundsComplete(_)
            | ServiceError::InvalidState(_)
            | ServiceError::Stale(_) => AppError::Conflict(failure),
            ServiceError::RecordingFailed(_) => AppError::BadGateway(failure),
            ServiceError::Connectivity(_) => AppError::ServiceUnavailable(failure),
            ServiceError::EmptyEligibleSet | ServiceError::Cache(_) | ServiceError::Internal(_) => {
                AppError::Internal(failure)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, failure) = match self {
            AppError::BadRequest(failure) => (StatusCode::BAD_REQUEST, failure),
            AppError::Unauthorized(failure) => (StatusCode::UNAUTHORIZED, failure),
            AppError::NotFound(failure) => (StatusCode::NOT_FOUND, failure),
            AppError::Conflict(failure) => (StatusCode::CONFLICT, failure),
            AppError::BadGateway(failure) => (StatusCode::BAD_GATEWAY, failure),
            AppError::ServiceUnavailable(failure) => (StatusCode::SERVICE_UNAVAILABLE, failure),
            AppError::Internal(failure) => (StatusCode::INTERNAL_SERVER_ERROR, failure),
        };

        (status, Json(failure)).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("a submission is already in flight".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => ServiceError::Stale("session was reset".into()),
            ApplyError::IdMismatch { .. } => {
                ServiceError::Stale("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => ServiceError::Stale(format!(
                "state changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => ServiceError::Stale(format!(
                "state version mismatch during transition (expected {expected}, got {actual})"
            )),
        }
    }
}
