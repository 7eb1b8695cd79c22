use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::dao::{
    models::TeamRecordEntity,
    record_store::RecordStore,
    storage::StorageResult,
};

use super::{
    config::HttpStoreConfig,
    error::{HttpStoreError, HttpStoreResult},
    models::{ListResponse, RemoteStatus, SaveResponse, VerifyResponse},
};

const ACTION_CHECK: &str = "check";
const ACTION_RECORD: &str = "record";
const ACTION_ADMIN: &str = "admin";

/// Record store reached through a single HTTP endpoint taking an `action` query parameter.
#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: Arc<str>,
}

impl HttpRecordStore {
    /// Build the HTTP client and make sure the endpoint answers.
    pub async fn connect(config: HttpStoreConfig) -> HttpStoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| HttpStoreError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
        };

        store.ping().await?;
        Ok(store)
    }

    async fn get<T>(&self, action: &'static str, params: &[(&str, &str)]) -> HttpStoreResult<T>
    where
        T: DeserializeOwned,
    {
        debug!(action, "sending record store request");
        let response = self
            .client
            .get(self.base_url.as_ref())
            .query(&[("action", action)])
            .query(params)
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend { action, source })?;

        if !response.status().is_success() {
            return Err(HttpStoreError::RequestStatus {
                action,
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| HttpStoreError::DecodeResponse { action, source })
    }

    async fn ping(&self) -> HttpStoreResult<()> {
        let response = self
            .client
            .get(self.base_url.as_ref())
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend {
                action: "ping",
                source,
            })?;

        // Any answer, even an application-level error page, proves the endpoint is reachable.
        if response.status().is_server_error() {
            return Err(HttpStoreError::RequestStatus {
                action: "ping",
                status: response.status(),
            });
        }
        Ok(())
    }

    async fn fetch_record(&self, team_id: String) -> HttpStoreResult<Option<TeamRecordEntity>> {
        let payload: VerifyResponse = self.get(ACTION_CHECK, &[("team", team_id.as_str())]).await?;
        match payload.status {
            RemoteStatus::Success => Ok(Some(payload.into_entity(team_id))),
            RemoteStatus::NotFound => Ok(None),
            RemoteStatus::Error => Err(HttpStoreError::Refused {
                action: ACTION_CHECK,
                message: payload
                    .message
                    .unwrap_or_else(|| "verification refused".into()),
            }),
        }
    }

    async fn record_result(
        &self,
        team_id: String,
        round: u8,
        label: String,
    ) -> HttpStoreResult<()> {
        let round = round.to_string();
        let payload: SaveResponse = self
            .get(
                ACTION_RECORD,
                &[
                    ("team", team_id.as_str()),
                    ("round", round.as_str()),
                    ("result", label.as_str()),
                ],
            )
            .await?;
        save_outcome(payload)
    }

    async fn fetch_all(&self, admin_key: String) -> HttpStoreResult<Vec<TeamRecordEntity>> {
        let payload: ListResponse = self.get(ACTION_ADMIN, &[("key", admin_key.as_str())]).await?;
        match payload.status {
            RemoteStatus::Success => Ok(payload.records.into_iter().map(Into::into).collect()),
            RemoteStatus::NotFound | RemoteStatus::Error => Err(HttpStoreError::Refused {
                action: ACTION_ADMIN,
                message: payload
                    .message
                    .unwrap_or_else(|| "failed to load results".into()),
            }),
        }
    }
}

/// Map a `record` answer onto the store contract: only `success` acknowledges the result.
fn save_outcome(payload: SaveResponse) -> HttpStoreResult<()> {
    match payload.status {
        RemoteStatus::Success => Ok(()),
        RemoteStatus::NotFound | RemoteStatus::Error => Err(HttpStoreError::Refused {
            action: ACTION_RECORD,
            message: payload
                .message
                .unwrap_or_else(|| "failed to record result".into()),
        }),
    }
}

impl RecordStore for HttpRecordStore {
    fn verify(
        &self,
        team_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.fetch_record(team_id).await.map_err(Into::into) })
    }

    fn save(
        &self,
        team_id: String,
        round: u8,
        label: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .record_result(team_id, round, label)
                .await
                .map_err(Into::into)
        })
    }

    fn list_all(
        &self,
        admin_key: String,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.fetch_all(admin_key).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
