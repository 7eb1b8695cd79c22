use serde::Deserialize;

use crate::dao::models::TeamRecordEntity;

/// Status field carried by every record store response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Success,
    NotFound,
    Error,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub status: RemoteStatus,
    #[serde(default)]
    pub round2_outcome: Option<String>,
    #[serde(default)]
    pub round3_outcome: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifyResponse {
    pub fn into_entity(self, team_id: String) -> TeamRecordEntity {
        TeamRecordEntity {
            team_id,
            round2_outcome: self.round2_outcome,
            round3_outcome: self.round3_outcome,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    pub status: RemoteStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse {
    pub status: RemoteStatus,
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub team_id: String,
    #[serde(default)]
    pub round2_outcome: Option<String>,
    #[serde(default)]
    pub round3_outcome: Option<String>,
}

impl From<RemoteRecord> for TeamRecordEntity {
    fn from(record: RemoteRecord) -> Self {
        Self {
            team_id: record.team_id,
            round2_outcome: record.round2_outcome,
            round3_outcome: record.round3_outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_response_accepts_missing_rounds() {
        let parsed: VerifyResponse =
            serde_json::from_str(r#"{"status":"success","round2Outcome":"Freeze"}"#).unwrap();
        assert_eq!(parsed.status, RemoteStatus::Success);

        let entity = parsed.into_entity("101".into());
        assert_eq!(entity.round2_outcome.as_deref(), Some("Freeze"));
        assert_eq!(entity.round3_outcome, None);
    }

    #[test]
    fn not_found_status_is_recognised() {
        let parsed: VerifyResponse = serde_json::from_str(r#"{"status":"not_found"}"#).unwrap();
        assert_eq!(parsed.status, RemoteStatus::NotFound);
    }

    #[test]
    fn list_response_maps_records() {
        let parsed: ListResponse = serde_json::from_str(
            r#"{"status":"success","records":[{"teamId":"101","round2Outcome":"Freeze","round3Outcome":null}]}"#,
        )
        .unwrap();
        let records = parsed
            .records
            .into_iter()
            .map(TeamRecordEntity::from)
            .collect::<Vec<_>>();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team_id, "101");
        assert_eq!(records[0].label_for(2), Some("Freeze"));
    }
}
