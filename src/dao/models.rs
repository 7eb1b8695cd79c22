use serde::{Deserialize, Serialize};

/// Team record as held by the record store.
///
/// Outcomes are stored as the labels the store was given; a blank or missing label means
/// the round has not been drawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamRecordEntity {
    /// Externally assigned numeric team identifier.
    pub team_id: String,
    /// Label recorded for round 2.
    pub round2_outcome: Option<String>,
    /// Label recorded for round 3.
    pub round3_outcome: Option<String>,
}

impl TeamRecordEntity {
    /// Empty record for a registered team that has not drawn yet.
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            round2_outcome: None,
            round3_outcome: None,
        }
    }

    /// Label recorded for `round` (2 or 3).
    pub fn label_for(&self, round: u8) -> Option<&str> {
        match round {
            2 => self.round2_outcome.as_deref(),
            3 => self.round3_outcome.as_deref(),
            _ => None,
        }
        .filter(|label| !label.trim().is_empty())
    }
}
