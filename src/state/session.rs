use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::{dao::models::TeamRecordEntity, state::outcome::Outcome};

/// One of the two draw opportunities a team gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    /// First wildcard draw.
    Two,
    /// Second wildcard draw, constrained by the first.
    Three,
}

impl Round {
    /// Competition round number as shown to participants and sent to the record store.
    pub fn number(self) -> u8 {
        match self {
            Round::Two => 2,
            Round::Three => 3,
        }
    }
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Round::Two),
            3 => Ok(Round::Three),
            other => Err(format!("round must be 2 or 3 (got {other})")),
        }
    }
}

impl From<Round> for u8 {
    fn from(value: Round) -> Self {
        value.number()
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Per-round "already drawn" flags mirrored from the record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawFlags {
    /// Round 2 has a recorded result.
    pub round2: bool,
    /// Round 3 has a recorded result.
    pub round3: bool,
}

impl DrawFlags {
    /// Flag for `round`.
    pub fn get(&self, round: Round) -> bool {
        match round {
            Round::Two => self.round2,
            Round::Three => self.round3,
        }
    }

    /// Mark `round` as drawn.
    pub fn set(&mut self, round: Round) {
        match round {
            Round::Two => self.round2 = true,
            Round::Three => self.round3 = true,
        }
    }

    /// First round that has not been drawn yet, or `None` once both are done.
    pub fn next_round(&self) -> Option<Round> {
        if !self.round2 {
            Some(Round::Two)
        } else if !self.round3 {
            Some(Round::Three)
        } else {
            None
        }
    }
}

/// Local progress of a single team through the draw flow.
///
/// Built from the authoritative team record on verification and mutated as rounds are
/// recorded. Dropped entirely on reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Team identifier as entered by the participant.
    pub team_id: String,
    /// Whether the flags were reconciled against the record store in this session.
    pub verified: bool,
    /// Round offered next, `None` once every round is recorded.
    pub current_round: Option<Round>,
    /// Round 2 outcome when it is known (recorded remotely or drawn here).
    pub round2_outcome: Option<Outcome>,
    /// Round 3 outcome when it is known.
    pub round3_outcome: Option<Outcome>,
    /// Rounds the record store holds a result for.
    pub draw_flags: DrawFlags,
    /// Last time the session changed.
    pub updated_at: SystemTime,
}

impl Session {
    /// Build a verified session from the team record fetched remotely.
    ///
    /// A round counts as drawn as soon as the record holds a non-empty label, even when the
    /// label does not match a known outcome.
    pub fn from_record(record: &TeamRecordEntity) -> Self {
        let draw_flags = DrawFlags {
            round2: is_filled(record.round2_outcome.as_deref()),
            round3: is_filled(record.round3_outcome.as_deref()),
        };

        Self {
            team_id: record.team_id.clone(),
            verified: true,
            current_round: draw_flags.next_round(),
            round2_outcome: record.round2_outcome.as_deref().and_then(Outcome::from_label),
            round3_outcome: record.round3_outcome.as_deref().and_then(Outcome::from_label),
            draw_flags,
            updated_at: SystemTime::now(),
        }
    }

    /// Outcome known for `round`, if any.
    pub fn outcome(&self, round: Round) -> Option<Outcome> {
        match round {
            Round::Two => self.round2_outcome,
            Round::Three => self.round3_outcome,
        }
    }

    /// Outcome type that must not be drawn for `round`.
    pub fn excluded_outcome(&self, round: Round) -> Option<Outcome> {
        match round {
            Round::Two => None,
            Round::Three => self.round2_outcome,
        }
    }

    /// Record an acknowledged result and move on to the next pending round.
    pub fn mark_recorded(&mut self, round: Round, outcome: Outcome) {
        match round {
            Round::Two => self.round2_outcome = Some(outcome),
            Round::Three => self.round3_outcome = Some(outcome),
        }
        self.draw_flags.set(round);
        self.current_round = self.draw_flags.next_round();
        self.updated_at = SystemTime::now();
    }
}

fn is_filled(label: Option<&str>) -> bool {
    label.is_some_and(|value| !value.trim().is_empty())
}
