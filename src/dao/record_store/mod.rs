#[cfg(feature = "http-store")]
pub mod http;
pub mod memory;

use crate::dao::models::TeamRecordEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the remote system of record holding one entry per team.
///
/// The store is authoritative: local progress is always reconciled against it. Backends
/// are expected to keep results write-once per round, acknowledging a repeated save of the
/// same label and rejecting a different one.
pub trait RecordStore: Send + Sync {
    /// Fetch the record for `team_id`, `None` when the team is unknown.
    fn verify(
        &self,
        team_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamRecordEntity>>>;
    /// Record `label` as the result of `round` for `team_id`.
    fn save(
        &self,
        team_id: String,
        round: u8,
        label: String,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List every team record. `admin_key` is forwarded to stores that gate listing.
    fn list_all(
        &self,
        admin_key: String,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamRecordEntity>>>;
    /// Cheap reachability probe used by the supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
