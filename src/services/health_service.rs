use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report degraded mode and the session count, probing the record store on the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.record_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "record store probe failed");
            }
        }
        None => warn!("no record store installed (degraded mode)"),
    }

    HealthResponse::new(state.is_degraded(), state.sessions().len())
}
