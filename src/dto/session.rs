use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::progress_cache::CachedProgress,
    dto::{
        format_system_time,
        phase::{VisibleDrawPhase, phase_round},
        validation::validate_team_id,
    },
    error::ServiceError,
    state::{Reveal, SessionState, outcome::Outcome, session::Round},
};

/// Team identification submitted to start or resync a draw flow.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VerifyRequest {
    /// Numeric team number.
    #[validate(custom(function = validate_team_id))]
    pub team_id: String,
}

/// Result submission, also used to retry a failed submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommitRequest {
    /// Round the outcome was drawn for (2 or 3).
    pub round: u8,
    /// Outcome that was revealed.
    pub outcome: Outcome,
}

impl CommitRequest {
    /// Parse the round number.
    pub fn round(&self) -> Result<Round, ServiceError> {
        Round::try_from(self.round).map_err(ServiceError::InvalidInput)
    }
}

/// Outcome with its display label.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OutcomeSummary {
    /// Outcome identifier.
    pub kind: Outcome,
    /// Display label, as recorded remotely.
    pub label: String,
}

impl From<Outcome> for OutcomeSummary {
    fn from(value: Outcome) -> Self {
        Self {
            kind: value,
            label: value.label().to_string(),
        }
    }
}

/// Rounds the record store holds a result for.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct DrawFlagsSummary {
    pub round2: bool,
    pub round3: bool,
}

/// Last outcome shown to the team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealSummary {
    pub round: u8,
    pub outcome: OutcomeSummary,
    /// False until the record store acknowledged the outcome.
    pub recorded: bool,
}

impl From<Reveal> for RevealSummary {
    fn from(value: Reveal) -> Self {
        Self {
            round: value.round.number(),
            outcome: value.outcome.into(),
            recorded: value.recorded,
        }
    }
}

/// Progress found in the local cache for a restored session. Advisory only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResumeHint {
    pub team_id: Option<String>,
    pub round2_drawn: bool,
    pub round3_drawn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round2_outcome: Option<OutcomeSummary>,
}

impl From<&CachedProgress> for ResumeHint {
    fn from(value: &CachedProgress) -> Self {
        Self {
            team_id: value.team_id.clone(),
            round2_drawn: value.round2_drawn,
            round3_drawn: value.round3_drawn,
            round2_outcome: value.round2_outcome.map(Into::into),
        }
    }
}

/// Full view of a hosted session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: VisibleDrawPhase,
    /// Round the current phase refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u8>,
    /// Incremented on every transition and reset.
    pub version: usize,
    /// True while a result submission is in flight.
    pub submission_pending: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub verified: bool,
    pub draw_flags: DrawFlagsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round2_outcome: Option<OutcomeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round3_outcome: Option<OutcomeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reveal: Option<RevealSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_hint: Option<ResumeHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl SessionSnapshot {
    /// Project the guarded session state.
    pub fn from_state(id: Uuid, created_at: std::time::SystemTime, state: &SessionState) -> Self {
        let snapshot = state.machine.snapshot();
        let session = state.session.as_ref();

        Self {
            id,
            phase: (&snapshot.phase).into(),
            round: phase_round(&snapshot.phase),
            version: snapshot.version,
            submission_pending: snapshot.pending.is_some(),
            created_at: format_system_time(created_at),
            team_id: session.map(|s| s.team_id.clone()),
            verified: session.is_some_and(|s| s.verified),
            draw_flags: DrawFlagsSummary {
                round2: session.is_some_and(|s| s.draw_flags.round2),
                round3: session.is_some_and(|s| s.draw_flags.round3),
            },
            round2_outcome: session.and_then(|s| s.round2_outcome).map(Into::into),
            round3_outcome: session.and_then(|s| s.round3_outcome).map(Into::into),
            last_reveal: state.last_reveal.map(Into::into),
            resume_hint: state.restored.as_ref().map(Into::into),
            updated_at: session.map(|s| format_system_time(s.updated_at)),
        }
    }
}

/// Error attached to a draw whose outcome could not be recorded.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordingError {
    /// `recording_failed`, `connectivity_error` or `stale_session`.
    pub kind: String,
    pub message: String,
}

impl From<&ServiceError> for RecordingError {
    fn from(err: &ServiceError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of a draw. The outcome is always returned, even when recording it failed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResponse {
    pub round: u8,
    pub outcome: OutcomeSummary,
    /// The record store acknowledged the outcome.
    pub recorded: bool,
    /// Next round available to the team once recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<u8>,
    /// Every round is recorded.
    pub completed: bool,
    /// Why recording failed; retry through the commit route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_error: Option<RecordingError>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitResponse {
    pub round: u8,
    pub outcome: OutcomeSummary,
    /// The round was already recorded with this outcome; nothing changed.
    pub already_recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<u8>,
    pub completed: bool,
}
