use serde::Serialize;
use utoipa::ToSchema;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The record store is reachable.
    Ok,
    /// The record store is unreachable; draws cannot be verified or recorded.
    Degraded,
}

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Number of hosted sessions.
    pub sessions: usize,
}

impl HealthResponse {
    /// Build the payload from the degraded flag and session count.
    pub fn new(degraded: bool, sessions: usize) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self { status, sessions }
    }
}
