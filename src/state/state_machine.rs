use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::state::{outcome::Outcome, session::Round};

/// Phases a draw session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    /// No team has been verified against the record store.
    Unverified,
    /// The team record is being fetched.
    Verifying,
    /// The team may draw for the given round.
    AwaitingDraw(Round),
    /// A draw is in flight for the given round.
    Drawing(Round),
    /// An outcome was drawn and shown but the record store has not acknowledged it yet.
    Revealed {
        /// Round the outcome was drawn for.
        round: Round,
        /// Outcome shown to the team.
        outcome: Outcome,
    },
    /// Every round is recorded for the team.
    Completed,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawEvent {
    /// A verification request was sent to the record store.
    VerifyStarted,
    /// The record store answered; carries the next pending round, `None` when all are done.
    Verified(Option<Round>),
    /// Verification failed (bad team, transport error).
    VerifyFailed,
    /// The team asked for a draw in the awaiting round.
    DrawStarted,
    /// The engine produced an outcome.
    OutcomeRevealed(Outcome),
    /// The engine could not produce an outcome; the round stays available.
    DrawAborted,
    /// The record store acknowledged the revealed outcome; carries the next pending round.
    Recorded(Option<Round>),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: DrawPhase,
    /// The event that cannot be applied from this phase.
    pub event: DrawEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    #[error("a transition is already pending")]
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    #[error(transparent)]
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("plan {got} does not match pending plan {expected}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    #[error("phase changed from {expected:?} to {actual:?} since planning")]
    PhaseMismatch {
        /// Phase when plan was created.
        expected: DrawPhase,
        /// Current phase.
        actual: DrawPhase,
    },
    /// State machine version changed since the caller last observed it.
    #[error("version moved from {expected} to {actual}")]
    VersionMismatch {
        /// Version the caller expected.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("plan {got} does not match pending plan {expected}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: DrawPhase,
    /// Phase the state machine will transition to.
    pub to: DrawPhase,
    /// Event that triggered this transition.
    pub event: DrawEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: DrawPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<DrawPhase>,
}

/// Round progression for a single team session.
///
/// Short transitions are applied at once with [`DrawStateMachine::fire`]. A record store
/// submission is planned first and applied once the store acknowledges it, so no other
/// event is accepted while it is in flight. [`DrawStateMachine::reset`] always succeeds and
/// invalidates whatever was pending.
#[derive(Debug, Clone)]
pub struct DrawStateMachine {
    phase: DrawPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for DrawStateMachine {
    fn default() -> Self {
        Self {
            phase: DrawPhase::Unverified,
            version: 0,
            pending: None,
        }
    }
}

impl DrawStateMachine {
    /// Create a new state machine in the unverified state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    /// Current version, bumped by every applied transition and by resets.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: DrawEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<DrawPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, leaving the phase untouched.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Plan and apply `event` in one step.
    pub fn fire(&mut self, event: DrawEvent) -> Result<DrawPhase, PlanError> {
        let plan = self.plan(event)?;
        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;
        Ok(self.phase)
    }

    /// Fail with [`ApplyError::VersionMismatch`] when the machine moved past `expected`.
    ///
    /// Async callers capture the version before awaiting remote work and check it afterwards
    /// so results that land after a reset are dropped.
    pub fn ensure_version(&self, expected: usize) -> Result<(), ApplyError> {
        if self.version == expected {
            Ok(())
        } else {
            Err(ApplyError::VersionMismatch {
                expected,
                actual: self.version,
            })
        }
    }

    /// Return to the unverified phase from anywhere, discarding any pending plan.
    pub fn reset(&mut self) -> DrawPhase {
        self.pending = None;
        self.phase = DrawPhase::Unverified;
        self.version += 1;
        self.phase
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: DrawEvent) -> Result<DrawPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (
                DrawPhase::Unverified | DrawPhase::AwaitingDraw(_) | DrawPhase::Completed,
                DrawEvent::VerifyStarted,
            ) => DrawPhase::Verifying,
            (DrawPhase::Verifying, DrawEvent::Verified(Some(round))) => {
                DrawPhase::AwaitingDraw(round)
            }
            (DrawPhase::Verifying, DrawEvent::Verified(None)) => DrawPhase::Completed,
            (DrawPhase::Verifying, DrawEvent::VerifyFailed) => DrawPhase::Unverified,
            (DrawPhase::AwaitingDraw(round), DrawEvent::DrawStarted) => DrawPhase::Drawing(round),
            (DrawPhase::Drawing(round), DrawEvent::OutcomeRevealed(outcome)) => {
                DrawPhase::Revealed { round, outcome }
            }
            (DrawPhase::Drawing(round), DrawEvent::DrawAborted) => DrawPhase::AwaitingDraw(round),
            (DrawPhase::Revealed { .. }, DrawEvent::Recorded(Some(round))) => {
                DrawPhase::AwaitingDraw(round)
            }
            (DrawPhase::Revealed { .. }, DrawEvent::Recorded(None)) => DrawPhase::Completed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
