use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wildcard card a team can draw. The set is closed and fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The team is frozen for a question.
    Freeze,
    /// The team must guess the point value.
    GuessPoint,
    /// Two members of the team sit out.
    TwoMemberOut,
}

impl Outcome {
    /// Every outcome in display order.
    pub const ALL: [Outcome; 3] = [Outcome::Freeze, Outcome::GuessPoint, Outcome::TwoMemberOut];

    /// Human readable label, also used as the value recorded in the remote store.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Freeze => "Freeze",
            Outcome::GuessPoint => "Guess the point",
            Outcome::TwoMemberOut => "2 Member Out",
        }
    }

    /// Short stable key used in the local progress cache.
    pub fn type_key(self) -> &'static str {
        match self {
            Outcome::Freeze => "freeze",
            Outcome::GuessPoint => "guess",
            Outcome::TwoMemberOut => "out",
        }
    }

    /// Resolve a label as recorded remotely. Matching ignores case and surrounding blanks.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|outcome| outcome.label().eq_ignore_ascii_case(label))
    }

    /// Resolve a cache type key.
    pub fn from_type_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|outcome| outcome.type_key() == key)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
