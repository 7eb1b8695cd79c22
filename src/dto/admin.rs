//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dao::models::TeamRecordEntity;

/// Query parameters accepted by the records listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordsQuery {
    /// Case-insensitive substring matched against team identifiers.
    #[serde(default)]
    pub search: Option<String>,
}

/// One team's recorded outcomes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordListItem {
    pub team_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round3: Option<String>,
}

impl From<TeamRecordEntity> for RecordListItem {
    fn from(value: TeamRecordEntity) -> Self {
        Self {
            round2: value.label_for(2).map(str::to_string),
            round3: value.label_for(3).map(str::to_string),
            team_id: value.team_id,
        }
    }
}

/// Counters computed over every record, regardless of the search filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecordStats {
    pub total_teams: usize,
    pub round2_drawn: usize,
    pub round3_drawn: usize,
}

/// Records listing returned to administrators.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordsResponse {
    pub records: Vec<RecordListItem>,
    pub stats: RecordStats,
}
