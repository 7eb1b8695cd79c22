//! Draw flow orchestration for hosted sessions: verification against the record store,
//! the suspenseful draw, result submission and reset.

use std::{fs, future::Future, io::ErrorKind, path::Path, sync::Arc};

use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        progress_cache::{FileProgressCache, MemoryProgressCache, ProgressCache},
        storage::StorageError,
    },
    dto::{
        session::{CommitResponse, DrawResponse, RecordingError, SessionSnapshot},
        validation::validate_team_id,
    },
    error::ServiceError,
    services::draw_engine,
    state::{
        DrawEvent, DrawPhase, Reveal, SessionHandle, SessionState, SharedState,
        outcome::Outcome,
        session::{Round, Session},
    },
};

/// Register a new session with an empty progress cache.
pub fn create_session(state: &SharedState) -> Result<SessionSnapshot, ServiceError> {
    let id = Uuid::new_v4();
    let cache: Arc<dyn ProgressCache> = match state.config().cache_dir.as_deref() {
        Some(dir) => Arc::new(FileProgressCache::open(cache_path(dir, id))?),
        None => Arc::new(MemoryProgressCache::new()),
    };

    let handle = Arc::new(SessionHandle::new(id, cache));
    let snapshot = SessionSnapshot::from_state(id, handle.created_at(), &SessionState::default());
    state.sessions().insert(id, handle);

    info!(session_id = %id, "session created");
    Ok(snapshot)
}

/// Rehydrate sessions from the cache directory so clients can resume after a restart.
///
/// Restored sessions start unverified and expose their cached progress as a hint only.
/// Unreadable files are skipped. Returns the number of restored sessions.
pub fn restore_sessions(state: &SharedState) -> usize {
    let Some(dir) = state.config().cache_dir.as_deref() else {
        return 0;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return 0,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to scan session cache directory");
            return 0;
        }
    };

    let mut restored = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(id) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| Uuid::parse_str(stem).ok())
        else {
            continue;
        };

        let cache = match FileProgressCache::open(&path) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable session cache");
                continue;
            }
        };

        let progress = cache.load_progress();
        if progress.team_id.is_none() {
            debug!(path = %path.display(), "skipping session cache without a team");
            continue;
        }

        state.sessions().insert(
            id,
            Arc::new(SessionHandle::restored(id, Arc::new(cache), progress)),
        );
        restored += 1;
    }

    if restored > 0 {
        info!(count = restored, dir = %dir.display(), "restored sessions from cache");
    }
    restored
}

/// Current view of a session.
pub async fn get_session(state: &SharedState, id: Uuid) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.session(id)?;
    let guard = handle.state().read().await;
    Ok(SessionSnapshot::from_state(id, handle.created_at(), &guard))
}

/// Identify the team and reconcile its progress with the record store.
///
/// The record store is authoritative: whatever the cache held is overwritten with the
/// remote flags. A team with every round recorded ends in the completed phase and the call
/// fails with [`ServiceError::AllRoundsComplete`]. The lookup runs to completion even when
/// the caller goes away.
pub async fn verify(
    state: &SharedState,
    id: Uuid,
    team_id: &str,
) -> Result<SessionSnapshot, ServiceError> {
    let state = state.clone();
    let team_id = team_id.to_string();
    detached(async move { verify_team(&state, id, &team_id).await }).await
}

async fn verify_team(
    state: &SharedState,
    id: Uuid,
    team_id: &str,
) -> Result<SessionSnapshot, ServiceError> {
    validate_team_id(team_id).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| format!("invalid team number `{team_id}`")),
        )
    })?;

    let handle = state.session(id)?;
    let store = state.require_record_store().await?;

    let observed = {
        let mut guard = handle.state().write().await;
        guard.machine.fire(DrawEvent::VerifyStarted)?;
        guard.machine.version()
    };

    let lookup = store.verify(team_id.to_string()).await;

    let mut guard = handle.state().write().await;
    guard.machine.ensure_version(observed)?;

    let record = match lookup {
        Ok(Some(record)) => record,
        Ok(None) => {
            fail_verification(&mut guard);
            info!(session_id = %id, team_id, "team not found in record store");
            return Err(ServiceError::TeamNotFound(team_id.to_string()));
        }
        Err(err) => {
            fail_verification(&mut guard);
            warn!(session_id = %id, team_id, error = %err, "team verification failed");
            return Err(ServiceError::Connectivity(storage_message(err)));
        }
    };

    let session = Session::from_record(&record);
    let next = session.current_round;
    guard.machine.fire(DrawEvent::Verified(next))?;
    guard.session = Some(session.clone());
    guard.last_reveal = None;
    guard.restored = None;

    let Some(round) = next else {
        info!(session_id = %id, team_id, "every round already recorded");
        return Err(ServiceError::AllRoundsComplete(team_id.to_string()));
    };

    if let Err(err) = handle.cache().store_verified(&session) {
        warn!(session_id = %id, team_id, error = %err, "failed to mirror verified progress");
    }

    info!(session_id = %id, team_id, round = %round, "team verified");
    Ok(SessionSnapshot::from_state(id, handle.created_at(), &guard))
}

/// Re-verify the team remembered by the session's cache.
pub async fn resume(state: &SharedState, id: Uuid) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.session(id)?;
    let team_id = {
        let guard = handle.state().read().await;
        guard
            .restored
            .as_ref()
            .and_then(|progress| progress.team_id.clone())
            .or_else(|| handle.cache().load_progress().team_id)
    };

    let Some(team_id) = team_id else {
        return Err(ServiceError::InvalidState("no cached team to resume".into()));
    };

    verify(state, id, &team_id).await
}

/// Run the draw for the current round and reveal its outcome.
///
/// The outcome is kept on the session as the last reveal until the record store
/// acknowledges it through [`commit`]. A draw that started is revealed even when the
/// caller goes away.
pub async fn draw(state: &SharedState, id: Uuid) -> Result<(Round, Outcome), ServiceError> {
    let state = state.clone();
    detached(async move { run_draw(&state, id).await }).await
}

async fn run_draw(state: &SharedState, id: Uuid) -> Result<(Round, Outcome), ServiceError> {
    let handle = state.session(id)?;

    let (round, excluded, observed) = {
        let mut guard = handle.state().write().await;
        let round = match guard.machine.phase() {
            DrawPhase::AwaitingDraw(round) => round,
            DrawPhase::Completed => {
                let team = guard
                    .session
                    .as_ref()
                    .map(|session| session.team_id.clone())
                    .unwrap_or_default();
                return Err(ServiceError::AllRoundsComplete(team));
            }
            other => {
                return Err(ServiceError::InvalidState(format!(
                    "cannot draw while in phase {other:?}"
                )));
            }
        };
        let Some(session) = guard.session.as_ref().filter(|session| session.verified) else {
            return Err(ServiceError::InvalidState("team is not verified".into()));
        };
        let excluded = session.excluded_outcome(round);
        guard.machine.fire(DrawEvent::DrawStarted)?;
        (round, excluded, guard.machine.version())
    };

    let delay = state.config().draw_delay;
    if !delay.is_zero() {
        sleep(delay).await;
    }

    let drawn = draw_engine::draw(excluded);

    let mut guard = handle.state().write().await;
    guard.machine.ensure_version(observed)?;

    let outcome = match drawn {
        Ok(outcome) => outcome,
        Err(err) => {
            guard.machine.fire(DrawEvent::DrawAborted)?;
            error!(
                session_id = %id,
                round = %round,
                excluded = ?excluded,
                "draw engine had no candidate"
            );
            return Err(err.into());
        }
    };

    guard.machine.fire(DrawEvent::OutcomeRevealed(outcome))?;
    guard.last_reveal = Some(Reveal {
        round,
        outcome,
        recorded: false,
    });

    info!(session_id = %id, round = %round, outcome = %outcome, "outcome revealed");
    Ok((round, outcome))
}

/// Draw and immediately submit the result.
///
/// The revealed outcome is returned even when the submission fails; the failure is
/// attached to the response and the result can be resubmitted with [`commit`].
pub async fn draw_and_commit(state: &SharedState, id: Uuid) -> Result<DrawResponse, ServiceError> {
    let (round, outcome) = draw(state, id).await?;

    let response = match commit(state, id, round, outcome).await {
        Ok(committed) => DrawResponse {
            round: round.number(),
            outcome: outcome.into(),
            recorded: true,
            next_round: committed.next_round,
            completed: committed.completed,
            recording_error: None,
        },
        Err(err) => DrawResponse {
            round: round.number(),
            outcome: outcome.into(),
            recorded: false,
            next_round: None,
            completed: false,
            recording_error: Some(RecordingError::from(&err)),
        },
    };

    Ok(response)
}

/// Submit the revealed outcome of `round` to the record store.
///
/// Submitting a result the session already holds is acknowledged without contacting the
/// store. On failure the session stays on the revealed outcome so the call can be retried.
/// A submission in flight is settled even when the caller goes away.
pub async fn commit(
    state: &SharedState,
    id: Uuid,
    round: Round,
    outcome: Outcome,
) -> Result<CommitResponse, ServiceError> {
    let state = state.clone();
    detached(async move { submit_result(&state, id, round, outcome).await }).await
}

async fn submit_result(
    state: &SharedState,
    id: Uuid,
    round: Round,
    outcome: Outcome,
) -> Result<CommitResponse, ServiceError> {
    let handle = state.session(id)?;

    let (team_id, next, observed) = {
        let guard = handle.state().read().await;
        let Some(session) = guard.session.as_ref() else {
            return Err(ServiceError::InvalidState("team is not verified".into()));
        };

        if session.draw_flags.get(round) {
            return match session.outcome(round) {
                Some(recorded) if recorded == outcome => Ok(CommitResponse {
                    round: round.number(),
                    outcome: outcome.into(),
                    already_recorded: true,
                    next_round: session.current_round.map(Round::number),
                    completed: session.current_round.is_none(),
                }),
                _ => Err(ServiceError::InvalidState(format!(
                    "round {round} is already recorded with a different outcome"
                ))),
            };
        }

        match guard.machine.phase() {
            DrawPhase::Revealed {
                round: revealed_round,
                outcome: revealed,
            } if revealed_round == round && revealed == outcome => {}
            _ => {
                return Err(ServiceError::InvalidState(format!(
                    "no revealed {outcome} outcome waiting to be recorded for round {round}"
                )));
            }
        }

        let mut flags = session.draw_flags;
        flags.set(round);
        (
            session.team_id.clone(),
            flags.next_round(),
            guard.machine.version(),
        )
    };

    let store = state.require_record_store().await?;
    let submit_timeout = state.config().submit_timeout;
    let label = outcome.label().to_string();
    let cache = handle.cache();

    let result = handle
        .run_transition(
            observed,
            DrawEvent::Recorded(next),
            Some(submit_timeout),
            || {
                let save = store.save(team_id.clone(), round.number(), label);
                async move { save.await.map_err(commit_error) }
            },
            |guard, _| {
                if let Some(session) = guard.session.as_mut() {
                    session.mark_recorded(round, outcome);
                }
                guard.last_reveal = Some(Reveal {
                    round,
                    outcome,
                    recorded: true,
                });
                if let Err(err) = cache.mark_drawn(round, outcome) {
                    warn!(
                        session_id = %id,
                        round = %round,
                        error = %err,
                        "failed to mirror recorded round"
                    );
                }
            },
        )
        .await;

    let ((), phase) = match result {
        Ok(done) => done,
        Err(err) => {
            warn!(
                session_id = %id,
                team_id = %team_id,
                round = %round,
                outcome = %outcome,
                error = %err,
                "result submission failed"
            );
            return Err(err);
        }
    };

    info!(
        session_id = %id,
        team_id = %team_id,
        round = %round,
        outcome = %outcome,
        "result recorded"
    );
    Ok(CommitResponse {
        round: round.number(),
        outcome: outcome.into(),
        already_recorded: false,
        next_round: match phase {
            DrawPhase::AwaitingDraw(next) => Some(next.number()),
            _ => None,
        },
        completed: phase == DrawPhase::Completed,
    })
}

/// Clear every trace of the team from the session and its cache.
///
/// Any submission still in flight is discarded when it completes.
pub async fn reset(state: &SharedState, id: Uuid) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.session(id)?;
    let mut guard = handle.state().write().await;

    guard.machine.reset();
    guard.session = None;
    guard.last_reveal = None;
    guard.restored = None;
    handle.cache().clear()?;

    info!(session_id = %id, "session reset");
    Ok(SessionSnapshot::from_state(id, handle.created_at(), &guard))
}

/// Drive `work` on its own task so state transitions it starts are settled even when the
/// awaiting request is dropped.
async fn detached<T, F>(work: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|err| ServiceError::Internal(format!("session task ended early: {err}")))?
}

fn fail_verification(guard: &mut SessionState) {
    if let Err(err) = guard.machine.fire(DrawEvent::VerifyFailed) {
        warn!(error = %err, "failed to leave verifying phase");
    }
    guard.session = None;
    guard.last_reveal = None;
}

fn commit_error(err: StorageError) -> ServiceError {
    match err {
        StorageError::Rejected { message } => ServiceError::RecordingFailed(message),
        other => ServiceError::Connectivity(storage_message(other)),
    }
}

fn storage_message(err: StorageError) -> String {
    match err {
        StorageError::Unavailable { message, .. } | StorageError::Rejected { message } => message,
    }
}

fn cache_path(dir: &Path, id: Uuid) -> std::path::PathBuf {
    dir.join(format!("{id}.json"))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use futures::future::BoxFuture;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::TeamRecordEntity,
            progress_cache::{KEY_ROUND2_DRAWN, KEY_ROUND2_OUTCOME_TYPE, KEY_TEAM_ID},
            record_store::{RecordStore, memory::MemoryRecordStore},
            storage::StorageResult,
        },
        state::AppState,
    };

    /// Memory store whose saves can be made to fail or to wait for a permit.
    #[derive(Clone)]
    struct ScriptedStore {
        inner: MemoryRecordStore,
        fail_saves: Arc<AtomicBool>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedStore {
        fn new(inner: MemoryRecordStore) -> Self {
            Self {
                inner,
                fail_saves: Arc::new(AtomicBool::new(false)),
                gate: None,
            }
        }
    }

    impl RecordStore for ScriptedStore {
        fn verify(
            &self,
            team_id: String,
        ) -> BoxFuture<'static, StorageResult<Option<TeamRecordEntity>>> {
            self.inner.verify(team_id)
        }

        fn save(
            &self,
            team_id: String,
            round: u8,
            label: String,
        ) -> BoxFuture<'static, StorageResult<()>> {
            let inner = self.inner.clone();
            let fail = self.fail_saves.load(Ordering::SeqCst);
            let gate = self.gate.clone();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _permit = gate.acquire().await;
                }
                if fail {
                    return Err(StorageError::unavailable(
                        "connection reset".into(),
                        std::io::Error::from(ErrorKind::ConnectionReset),
                    ));
                }
                inner.save(team_id, round, label).await
            })
        }

        fn list_all(
            &self,
            admin_key: String,
        ) -> BoxFuture<'static, StorageResult<Vec<TeamRecordEntity>>> {
            self.inner.list_all(admin_key)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
    }

    async fn setup(store: impl RecordStore + 'static) -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::headless(["101", "102"]));
        state.install_record_store(Arc::new(store)).await;
        let id = create_session(&state).expect("session").id;
        (state, id)
    }

    async fn phase(state: &SharedState, id: Uuid) -> DrawPhase {
        state
            .session(id)
            .expect("session")
            .state()
            .read()
            .await
            .machine
            .phase()
    }

    #[tokio::test]
    async fn unknown_team_stays_unverified() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["102"])).await;

        let err = verify(&state, id, "101").await.unwrap_err();
        assert!(matches!(err, ServiceError::TeamNotFound(team) if team == "101"));
        assert_eq!(phase(&state, id).await, DrawPhase::Unverified);
        assert!(state.session(id).unwrap().cache().keys().is_empty());
    }

    #[tokio::test]
    async fn malformed_team_is_rejected_before_lookup() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;

        let err = verify(&state, id, "10a").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(state.session(id).unwrap().state().read().await.machine.version(), 0);
    }

    #[tokio::test]
    async fn degraded_mode_reports_connectivity() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;
        state.update_degraded(true);

        let err = verify(&state, id, "101").await.unwrap_err();
        assert!(matches!(err, ServiceError::Connectivity(_)));
        assert_eq!(phase(&state, id).await, DrawPhase::Unverified);
    }

    #[tokio::test]
    async fn remote_flags_override_cached_progress() {
        let store = MemoryRecordStore::with_teams(["101"]);
        store.insert_record(TeamRecordEntity {
            team_id: "101".into(),
            round2_outcome: Some("Guess the point".into()),
            round3_outcome: None,
        });
        let (state, id) = setup(store).await;
        let handle = state.session(id).unwrap();
        handle.cache().set(KEY_TEAM_ID, "101".into()).unwrap();

        verify(&state, id, "101").await.unwrap();

        assert_eq!(phase(&state, id).await, DrawPhase::AwaitingDraw(Round::Three));
        assert_eq!(handle.cache().get(KEY_ROUND2_DRAWN).as_deref(), Some("true"));
        assert_eq!(handle.cache().get(KEY_ROUND2_OUTCOME_TYPE).as_deref(), Some("guess"));
    }

    #[tokio::test]
    async fn draw_then_commit_advances_round() {
        let store = MemoryRecordStore::with_teams(["101"]);
        let (state, id) = setup(store.clone()).await;
        verify(&state, id, "101").await.unwrap();

        let response = draw_and_commit(&state, id).await.unwrap();
        assert!(response.recorded);
        assert_eq!(response.round, 2);
        assert_eq!(response.next_round, Some(3));
        assert_eq!(phase(&state, id).await, DrawPhase::AwaitingDraw(Round::Three));

        let recorded = store.record("101").unwrap();
        assert_eq!(
            recorded.round2_outcome.as_deref(),
            Some(response.outcome.kind.label())
        );
    }

    #[tokio::test]
    async fn failed_submission_keeps_outcome_for_retry() {
        let store = ScriptedStore::new(MemoryRecordStore::with_teams(["101"]));
        let fail = store.fail_saves.clone();
        let (state, id) = setup(store.clone()).await;
        verify(&state, id, "101").await.unwrap();

        fail.store(true, Ordering::SeqCst);
        let response = draw_and_commit(&state, id).await.unwrap();
        assert!(!response.recorded);
        let recording_error = response.recording_error.expect("recording error");
        assert_eq!(recording_error.kind, "connectivity_error");

        let outcome = response.outcome.kind;
        assert_eq!(
            phase(&state, id).await,
            DrawPhase::Revealed {
                round: Round::Two,
                outcome
            }
        );
        assert!(matches!(
            draw(&state, id).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(state.session(id).unwrap().cache().get(KEY_ROUND2_DRAWN).is_none());

        fail.store(false, Ordering::SeqCst);
        let committed = commit(&state, id, Round::Two, outcome).await.unwrap();
        assert!(!committed.already_recorded);
        assert_eq!(committed.next_round, Some(3));
    }

    #[tokio::test]
    async fn repeated_commit_is_acknowledged_locally() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;
        verify(&state, id, "101").await.unwrap();
        let (round, outcome) = draw(&state, id).await.unwrap();
        commit(&state, id, round, outcome).await.unwrap();
        let version = state.session(id).unwrap().state().read().await.machine.version();

        let again = commit(&state, id, round, outcome).await.unwrap();
        assert!(again.already_recorded);
        assert_eq!(
            state.session(id).unwrap().state().read().await.machine.version(),
            version
        );
    }

    #[tokio::test]
    async fn commit_of_unrevealed_outcome_is_rejected() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;
        verify(&state, id, "101").await.unwrap();

        let err = commit(&state, id, Round::Two, Outcome::Freeze).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn submission_landing_after_reset_is_dropped() {
        let mut store = ScriptedStore::new(MemoryRecordStore::with_teams(["101"]));
        let gate = Arc::new(Semaphore::new(0));
        store.gate = Some(gate.clone());
        let (state, id) = setup(store).await;
        verify(&state, id, "101").await.unwrap();
        let (round, outcome) = draw(&state, id).await.unwrap();

        let pending = tokio::spawn({
            let state = state.clone();
            async move { commit(&state, id, round, outcome).await }
        });

        for _ in 0..100 {
            if get_session(&state, id).await.unwrap().submission_pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        reset(&state, id).await.unwrap();
        gate.add_permits(1);

        let result = pending.await.expect("join");
        assert!(matches!(result, Err(ServiceError::Stale(_))));
        assert_eq!(phase(&state, id).await, DrawPhase::Unverified);
        assert!(state.session(id).unwrap().cache().keys().is_empty());
        assert!(state.session(id).unwrap().state().read().await.session.is_none());
    }

    async fn wait_for_phase(state: &SharedState, id: Uuid, done: impl Fn(DrawPhase) -> bool) {
        for _ in 0..200 {
            if done(phase(state, id).await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("phase stuck at {:?}", phase(state, id).await);
    }

    #[tokio::test]
    async fn abandoned_draw_still_reveals() {
        let mut config = AppConfig::headless(["101"]);
        config.draw_delay = Duration::from_millis(300);
        let state = AppState::new(config);
        state
            .install_record_store(Arc::new(MemoryRecordStore::with_teams(["101"])))
            .await;
        let id = create_session(&state).unwrap().id;
        verify(&state, id, "101").await.unwrap();

        let caller = tokio::spawn({
            let state = state.clone();
            async move { draw(&state, id).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        wait_for_phase(&state, id, |phase| {
            matches!(phase, DrawPhase::Revealed { .. })
        })
        .await;
        let DrawPhase::Revealed { round, outcome } = phase(&state, id).await else {
            unreachable!();
        };
        assert_eq!(round, Round::Two);

        let committed = commit(&state, id, round, outcome).await.unwrap();
        assert_eq!(committed.next_round, Some(3));
        assert_eq!(phase(&state, id).await, DrawPhase::AwaitingDraw(Round::Three));
    }

    #[tokio::test]
    async fn abandoned_commit_settles_and_retry_succeeds() {
        let mut store = ScriptedStore::new(MemoryRecordStore::with_teams(["101"]));
        let gate = Arc::new(Semaphore::new(0));
        store.gate = Some(gate.clone());
        let records = store.inner.clone();
        let (state, id) = setup(store).await;
        verify(&state, id, "101").await.unwrap();
        let (round, outcome) = draw(&state, id).await.unwrap();

        let caller = tokio::spawn({
            let state = state.clone();
            async move { commit(&state, id, round, outcome).await }
        });
        for _ in 0..100 {
            if get_session(&state, id).await.unwrap().submission_pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        gate.add_permits(1);
        wait_for_phase(&state, id, |phase| phase == DrawPhase::AwaitingDraw(Round::Three)).await;
        assert!(!get_session(&state, id).await.unwrap().submission_pending);
        assert_eq!(
            records.record("101").unwrap().round2_outcome.as_deref(),
            Some(outcome.label())
        );

        let retried = commit(&state, id, round, outcome).await.unwrap();
        assert!(retried.already_recorded);
        assert_eq!(retried.next_round, Some(3));
    }

    #[tokio::test]
    async fn resume_reverifies_cached_team() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;
        let handle = state.session(id).unwrap();
        handle.cache().set(KEY_TEAM_ID, "101".into()).unwrap();

        let snapshot = resume(&state, id).await.unwrap();
        assert!(snapshot.verified);
        assert_eq!(snapshot.team_id.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn resume_without_cached_team_is_rejected() {
        let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;
        assert!(matches!(
            resume(&state, id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn sessions_are_restored_from_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::headless(["101"]);
        config.cache_dir = Some(dir.path().to_path_buf());

        let first = AppState::new(config.clone());
        first
            .install_record_store(Arc::new(MemoryRecordStore::with_teams(["101"])))
            .await;
        let id = create_session(&first).unwrap().id;
        verify(&first, id, "101").await.unwrap();

        let second = AppState::new(config);
        assert_eq!(restore_sessions(&second), 1);
        let snapshot = get_session(&second, id).await.unwrap();
        assert!(!snapshot.verified);
        assert_eq!(
            snapshot.resume_hint.and_then(|hint| hint.team_id).as_deref(),
            Some("101")
        );
    }
}
