//! Read-only administration over the record store.

use tracing::{info, warn};

use crate::{
    dao::{models::TeamRecordEntity, storage::StorageError},
    dto::admin::{RecordListItem, RecordStats, RecordsResponse},
    error::ServiceError,
    state::SharedState,
};

/// List every team record, optionally filtered by a team identifier substring.
///
/// Statistics always cover the full list; the filter only narrows `records`.
pub async fn list_records(
    state: &SharedState,
    search: Option<&str>,
) -> Result<RecordsResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let admin_key = state.config().admin_key.clone().unwrap_or_default();

    let records = store.list_all(admin_key).await.map_err(|err| match err {
        StorageError::Rejected { message } => ServiceError::Unauthorized(message),
        StorageError::Unavailable { message, .. } => {
            warn!(error = %message, "failed to list team records");
            ServiceError::Connectivity(message)
        }
    })?;

    let stats = compute_stats(&records);
    let needle = search
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
        .map(str::to_lowercase);

    let records: Vec<RecordListItem> = records
        .into_iter()
        .filter(|record| {
            needle
                .as_deref()
                .is_none_or(|needle| record.team_id.to_lowercase().contains(needle))
        })
        .map(Into::into)
        .collect();

    info!(
        listed = records.len(),
        total = stats.total_teams,
        "team records listed"
    );
    Ok(RecordsResponse { records, stats })
}

fn compute_stats(records: &[TeamRecordEntity]) -> RecordStats {
    RecordStats {
        total_teams: records.len(),
        round2_drawn: records.iter().filter(|r| r.label_for(2).is_some()).count(),
        round3_drawn: records.iter().filter(|r| r.label_for(3).is_some()).count(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::record_store::memory::MemoryRecordStore,
        state::AppState,
    };

    fn record(team: &str, round2: Option<&str>, round3: Option<&str>) -> TeamRecordEntity {
        TeamRecordEntity {
            team_id: team.into(),
            round2_outcome: round2.map(Into::into),
            round3_outcome: round3.map(Into::into),
        }
    }

    async fn state_with(records: Vec<TeamRecordEntity>) -> SharedState {
        let store = MemoryRecordStore::new();
        for entry in records {
            store.insert_record(entry);
        }
        let state = AppState::new(AppConfig::headless(Vec::<String>::new()));
        state.install_record_store(Arc::new(store)).await;
        state
    }

    #[tokio::test]
    async fn stats_ignore_search_filter() {
        let state = state_with(vec![
            record("101", Some("Freeze"), Some("2 Member Out")),
            record("102", Some("Guess the point"), None),
            record("203", None, None),
        ])
        .await;

        let listed = list_records(&state, Some("10")).await.unwrap();
        assert_eq!(listed.records.len(), 2);
        assert_eq!(
            listed.stats,
            RecordStats {
                total_teams: 3,
                round2_drawn: 2,
                round3_drawn: 1,
            }
        );
    }

    #[tokio::test]
    async fn blank_labels_do_not_count() {
        let state = state_with(vec![record("101", Some("  "), None)]).await;

        let listed = list_records(&state, None).await.unwrap();
        assert_eq!(listed.stats.round2_drawn, 0);
        assert_eq!(listed.records[0].round2, None);
    }

    #[tokio::test]
    async fn degraded_listing_fails() {
        let state = state_with(Vec::new()).await;
        state.update_degraded(true);

        assert!(matches!(
            list_records(&state, None).await,
            Err(ServiceError::Connectivity(_))
        ));
    }
}
