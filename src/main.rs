//! Wildcard draw backend entrypoint wiring the REST API, the session registry and the
//! record store supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wildcard_draw_back::{
    config::AppConfig,
    dao::record_store::{RecordStore, memory::MemoryRecordStore},
    routes,
    services::{session_service, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);
    session_service::restore_sessions(&app_state);

    spawn_record_store_supervisor(app_state.clone());
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the supervisor on the HTTP record store when `RECORD_STORE_URL` is set, otherwise
/// on an in-memory store seeded with the configured teams.
fn spawn_record_store_supervisor(state: SharedState) {
    #[cfg(feature = "http-store")]
    {
        use wildcard_draw_back::dao::{
            record_store::http::{HttpRecordStore, HttpStoreConfig},
            storage::StorageError,
        };

        if let Ok(config) = HttpStoreConfig::from_env() {
            info!(base_url = %config.base_url, "using HTTP record store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = HttpRecordStore::connect(config)
                        .await
                        .map_err(StorageError::from)?;
                    Ok(Arc::new(store) as Arc<dyn RecordStore>)
                }
            }));
            return;
        }
    }

    info!(
        teams = state.config().teams.len(),
        "RECORD_STORE_URL not set; using in-memory record store"
    );
    let store = MemoryRecordStore::with_teams(state.config().teams.clone());
    tokio::spawn(storage_supervisor::run(state, move || {
        let store = store.clone();
        async move { Ok(Arc::new(store) as Arc<dyn RecordStore>) }
    }));
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
