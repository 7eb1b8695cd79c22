pub mod outcome;
pub mod session;
pub mod state_machine;

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        progress_cache::{CachedProgress, ProgressCache},
        record_store::RecordStore,
    },
    error::ServiceError,
    state::{
        outcome::Outcome,
        session::{Round, Session},
    },
};

pub use self::state_machine::{
    AbortError, ApplyError, DrawEvent, DrawPhase, DrawStateMachine, Plan, PlanError, PlanId,
    Snapshot,
};

pub type SharedState = Arc<AppState>;

/// Outcome last shown to the team and whether the record store acknowledged it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    /// Round the outcome was drawn for.
    pub round: Round,
    /// Outcome shown to the team.
    pub outcome: Outcome,
    /// The record store acknowledged the outcome.
    pub recorded: bool,
}

/// Mutable part of a hosted session, guarded as a whole.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Round progression.
    pub machine: DrawStateMachine,
    /// Verified team progress, `None` until verification succeeds.
    pub session: Option<Session>,
    /// Last outcome shown; survives failed submissions.
    pub last_reveal: Option<Reveal>,
    /// Progress found in the cache when the session was restored, kept as a resume hint.
    pub restored: Option<CachedProgress>,
}

/// One client's draw flow together with its own progress cache.
pub struct SessionHandle {
    id: Uuid,
    created_at: SystemTime,
    state: RwLock<SessionState>,
    cache: Arc<dyn ProgressCache>,
}

impl SessionHandle {
    /// Wrap a fresh session around `cache`.
    pub fn new(id: Uuid, cache: Arc<dyn ProgressCache>) -> Self {
        Self {
            id,
            created_at: SystemTime::now(),
            state: RwLock::new(SessionState::default()),
            cache,
        }
    }

    /// Wrap a session restored from `cache`, exposing the cached progress as a hint.
    pub fn restored(id: Uuid, cache: Arc<dyn ProgressCache>, progress: CachedProgress) -> Self {
        Self {
            id,
            created_at: SystemTime::now(),
            state: RwLock::new(SessionState {
                restored: Some(progress),
                ..SessionState::default()
            }),
            cache,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Guarded session state.
    pub fn state(&self) -> &RwLock<SessionState> {
        &self.state
    }

    /// Local progress cache scoped to this session.
    pub fn cache(&self) -> &dyn ProgressCache {
        self.cache.as_ref()
    }

    /// Plan `event`, run `work`, then apply the plan and hand the result to `finish` under
    /// the same lock.
    ///
    /// Planning fails with [`ServiceError::Stale`] when the machine moved past `observed`,
    /// the version the caller validated its inputs against. While `work` runs the plan
    /// stays pending so any other planned event is rejected. A failed or timed out `work`
    /// aborts the plan. When the session was reset in between, applying fails and the
    /// result is dropped without calling `finish`.
    ///
    /// Dropping the returned future before it completes leaves the plan pending; callers
    /// drive it on a task of its own.
    pub async fn run_transition<F, Fut, T, G>(
        &self,
        observed: usize,
        event: DrawEvent,
        limit: Option<Duration>,
        work: F,
        finish: G,
    ) -> Result<(T, DrawPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
        G: FnOnce(&mut SessionState, &T),
    {
        let Plan { id: plan_id, .. } = {
            let mut guard = self.state.write().await;
            guard.machine.ensure_version(observed)?;
            guard.machine.plan(event)?
        };

        let work_future = work();
        let outcome = if let Some(limit) = limit {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    self.abort_transition(event, plan_id, "timeout").await;
                    return Err(ServiceError::Connectivity(format!(
                        "record store did not answer within {}ms",
                        limit.as_millis()
                    )));
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let mut guard = self.state.write().await;
                let next = guard.machine.apply(plan_id)?;
                finish(&mut *guard, &value);
                Ok((value, next))
            }
            Err(err) => {
                self.abort_transition(event, plan_id, "work error").await;
                Err(err)
            }
        }
    }

    async fn abort_transition(&self, event: DrawEvent, plan_id: PlanId, cause: &'static str) {
        let mut guard = self.state.write().await;
        if let Err(abort_err) = guard.machine.abort(plan_id) {
            warn!(
                session_id = %self.id,
                event = ?event,
                plan_id = %plan_id,
                error = ?abort_err,
                cause,
                "failed to abort transition"
            );
        }
    }
}

/// Central application state: record store handle, hosted sessions and configuration.
pub struct AppState {
    record_store: RwLock<Option<Arc<dyn RecordStore>>>,
    degraded: watch::Sender<bool>,
    sessions: DashMap<Uuid, Arc<SessionHandle>>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a record store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            record_store: RwLock::new(None),
            degraded: degraded_tx,
            sessions: DashMap::new(),
            config,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current record store, if one is installed.
    pub async fn record_store(&self) -> Option<Arc<dyn RecordStore>> {
        let guard = self.record_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current record store or a connectivity error while degraded.
    pub async fn require_record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        match self.record_store().await {
            Some(store) if !self.is_degraded() => Ok(store),
            _ => Err(ServiceError::Connectivity(
                "record store unavailable (degraded mode)".into(),
            )),
        }
    }

    /// Install a new record store implementation and leave degraded mode.
    pub async fn install_record_store(&self, store: Arc<dyn RecordStore>) {
        {
            let mut guard = self.record_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current record store and enter degraded mode.
    pub async fn clear_record_store(&self) {
        {
            let mut guard = self.record_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Registry of hosted sessions keyed by their identifier.
    pub fn sessions(&self) -> &DashMap<Uuid, Arc<SessionHandle>> {
        &self.sessions
    }

    /// Look up a hosted session.
    pub fn session(&self, id: Uuid) -> Result<Arc<SessionHandle>, ServiceError> {
        self.sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
    }
}
