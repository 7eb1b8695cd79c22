use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::DrawPhase;

/// Publicly visible draw phase exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleDrawPhase {
    /// No team verified yet.
    Unverified,
    /// Team record being fetched.
    Verifying,
    /// Waiting for the team to draw.
    AwaitingDraw,
    /// Draw in progress.
    Drawing,
    /// Outcome shown, not yet acknowledged by the record store.
    Revealed,
    /// Every round recorded.
    Completed,
}

impl From<&DrawPhase> for VisibleDrawPhase {
    fn from(value: &DrawPhase) -> Self {
        match value {
            DrawPhase::Unverified => VisibleDrawPhase::Unverified,
            DrawPhase::Verifying => VisibleDrawPhase::Verifying,
            DrawPhase::AwaitingDraw(_) => VisibleDrawPhase::AwaitingDraw,
            DrawPhase::Drawing(_) => VisibleDrawPhase::Drawing,
            DrawPhase::Revealed { .. } => VisibleDrawPhase::Revealed,
            DrawPhase::Completed => VisibleDrawPhase::Completed,
        }
    }
}

/// Round the phase refers to, if any.
pub fn phase_round(phase: &DrawPhase) -> Option<u8> {
    match phase {
        DrawPhase::AwaitingDraw(round)
        | DrawPhase::Drawing(round)
        | DrawPhase::Revealed { round, .. } => Some(round.number()),
        DrawPhase::Unverified | DrawPhase::Verifying | DrawPhase::Completed => None,
    }
}
