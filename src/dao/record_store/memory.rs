//! In-process record store used when no remote endpoint is configured and in tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    models::TeamRecordEntity,
    record_store::RecordStore,
    storage::{StorageError, StorageResult},
};

/// Record store keeping team records in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<String, TeamRecordEntity>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an empty record for every listed team.
    pub fn with_teams<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for team in teams {
            let record = TeamRecordEntity::new(team);
            store.records.insert(record.team_id.clone(), record);
        }
        store
    }

    /// Insert or replace a full record.
    pub fn insert_record(&self, record: TeamRecordEntity) {
        self.records.insert(record.team_id.clone(), record);
    }

    /// Current record for `team_id`.
    pub fn record(&self, team_id: &str) -> Option<TeamRecordEntity> {
        self.records.get(team_id).map(|entry| entry.value().clone())
    }

    fn apply_save(&self, team_id: &str, round: u8, label: String) -> StorageResult<()> {
        let mut entry = self
            .records
            .get_mut(team_id)
            .ok_or_else(|| StorageError::rejected(format!("team `{team_id}` not found")))?;

        let slot = match round {
            2 => &mut entry.round2_outcome,
            3 => &mut entry.round3_outcome,
            other => return Err(StorageError::rejected(format!("invalid round {other}"))),
        };

        match slot.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            Some(existing) if existing == label => Ok(()),
            Some(existing) => Err(StorageError::rejected(format!(
                "round {round} already recorded as `{existing}`"
            ))),
            None => {
                *slot = Some(label);
                Ok(())
            }
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn verify(
        &self,
        team_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.record(&team_id)) })
    }

    fn save(
        &self,
        team_id: String,
        round: u8,
        label: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.apply_save(&team_id, round, label) })
    }

    fn list_all(
        &self,
        _admin_key: String,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut records = store
                .records
                .iter()
                .map(|entry| entry.value().clone())
                .collect::<Vec<_>>();
            records.sort_by(|a, b| a.team_id.cmp(&b.team_id));
            Ok(records)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_team_verifies_as_none() {
        let store = MemoryRecordStore::with_teams(["101"]);
        assert!(store.verify("102".into()).await.unwrap().is_none());
        assert!(store.verify("101".into()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rounds_are_write_once() {
        let store = MemoryRecordStore::with_teams(["101"]);
        store.save("101".into(), 2, "Freeze".into()).await.unwrap();
        // Same label again is acknowledged without a second entry.
        store.save("101".into(), 2, "Freeze".into()).await.unwrap();

        let err = store
            .save("101".into(), 2, "2 Member Out".into())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));

        let record = store.record("101").unwrap();
        assert_eq!(record.round2_outcome.as_deref(), Some("Freeze"));
        assert_eq!(record.round3_outcome, None);
    }

    #[tokio::test]
    async fn saving_for_unknown_team_is_rejected() {
        let store = MemoryRecordStore::new();
        let err = store.save("7".into(), 2, "Freeze".into()).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
    }

    #[tokio::test]
    async fn listing_is_sorted_by_team() {
        let store = MemoryRecordStore::with_teams(["202", "101"]);
        let records = store.list_all(String::new()).await.unwrap();
        let ids = records.iter().map(|r| r.team_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["101", "202"]);
    }
}
