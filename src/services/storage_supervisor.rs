use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{record_store::RecordStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_HEALTH_RETRIES: u32 = 3;

/// Connect to the record store and keep the shared state in degraded mode while it is
/// unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn RecordStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_record_store(store.clone()).await;
                info!("record store connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;

                state.clear_record_store().await;
                warn!("record store lost; reconnecting");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "record store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll `store` until it fails [`MAX_HEALTH_RETRIES`] consecutive probes.
async fn watch_health(state: &SharedState, store: &dyn RecordStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("record store healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "record store health check failed; entering degraded mode");
                state.update_degraded(true);

                let mut attempt = 1;
                let mut retry_delay = INITIAL_DELAY;
                let mut recovered = false;

                while attempt < MAX_HEALTH_RETRIES {
                    sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(MAX_DELAY);
                    match store.health_check().await {
                        Ok(()) => {
                            info!(
                                attempt,
                                "record store answered again after health check failure"
                            );
                            recovered = true;
                            break;
                        }
                        Err(retry_err) => {
                            warn!(attempt, error = %retry_err, "record store health retry failed");
                            attempt += 1;
                        }
                    }
                }

                if recovered {
                    state.update_degraded(false);
                    sleep(HEALTH_POLL_INTERVAL).await;
                } else {
                    warn!("exhausted record store health retries; staying in degraded mode");
                    return;
                }
            }
        }
    }
}
