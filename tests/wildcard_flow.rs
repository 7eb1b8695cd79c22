use std::sync::Arc;

use wildcard_draw_back::{
    config::AppConfig,
    dao::{
        models::TeamRecordEntity,
        progress_cache::{KEY_ROUND2_DRAWN, KEY_ROUND2_OUTCOME_TYPE, KEY_ROUND3_DRAWN, KEY_TEAM_ID},
        record_store::memory::MemoryRecordStore,
    },
    error::ServiceError,
    services::{admin_service, session_service},
    state::{AppState, DrawPhase, SharedState, outcome::Outcome, session::Round},
};
use uuid::Uuid;

async fn setup(store: MemoryRecordStore) -> (SharedState, Uuid) {
    let state = AppState::new(AppConfig::headless(["101", "102", "103"]));
    state.install_record_store(Arc::new(store)).await;
    let id = session_service::create_session(&state)
        .expect("create session")
        .id;
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
async fn unknown_team_is_reported_and_session_stays_unverified() {
    let (state, id) = setup(MemoryRecordStore::with_teams(["102"])).await;

    let err = session_service::verify(&state, id, "101").await.unwrap_err();
    assert!(matches!(err, ServiceError::TeamNotFound(_)));
    assert_eq!(phase(&state, id).await, DrawPhase::Unverified);
}

#[tokio::test]
async fn fresh_team_draws_round_two_then_round_three() {
    let store = MemoryRecordStore::with_teams(["101"]);
    let (state, id) = setup(store.clone()).await;

    let verified = session_service::verify(&state, id, "101").await.unwrap();
    assert!(verified.verified);
    assert_eq!(verified.round, Some(2));
    assert_eq!(phase(&state, id).await, DrawPhase::AwaitingDraw(Round::Two));

    let (round, outcome) = session_service::draw(&state, id).await.unwrap();
    assert_eq!(round, Round::Two);
    assert_eq!(
        phase(&state, id).await,
        DrawPhase::Revealed {
            round: Round::Two,
            outcome
        }
    );

    let committed = session_service::commit(&state, id, round, outcome).await.unwrap();
    assert_eq!(committed.next_round, Some(3));
    assert!(!committed.completed);
    assert_eq!(phase(&state, id).await, DrawPhase::AwaitingDraw(Round::Three));

    let handle = state.session(id).unwrap();
    assert_eq!(handle.cache().get(KEY_ROUND2_DRAWN).as_deref(), Some("true"));
    assert_eq!(
        handle.cache().get(KEY_ROUND2_OUTCOME_TYPE).as_deref(),
        Some(outcome.type_key())
    );

    let third = session_service::draw_and_commit(&state, id).await.unwrap();
    assert!(third.recorded);
    assert!(third.completed);
    assert_ne!(third.outcome.kind, outcome);
    assert_eq!(phase(&state, id).await, DrawPhase::Completed);
    assert_eq!(handle.cache().get(KEY_ROUND3_DRAWN).as_deref(), Some("true"));

    let record = store.record("101").unwrap();
    assert_eq!(record.round2_outcome.as_deref(), Some(outcome.label()));
    assert_eq!(
        record.round3_outcome.as_deref(),
        Some(third.outcome.kind.label())
    );
}

#[tokio::test]
async fn round_three_never_repeats_round_two_outcome() {
    for _ in 0..30 {
        let store = MemoryRecordStore::new();
        store.insert_record(TeamRecordEntity {
            team_id: "101".into(),
            round2_outcome: Some("Freeze".into()),
            round3_outcome: None,
        });
        let (state, id) = setup(store).await;

        session_service::verify(&state, id, "101").await.unwrap();
        let (round, outcome) = session_service::draw(&state, id).await.unwrap();
        assert_eq!(round, Round::Three);
        assert_ne!(outcome, Outcome::Freeze);
    }
}

#[tokio::test]
async fn fully_drawn_team_is_complete() {
    let store = MemoryRecordStore::new();
    store.insert_record(TeamRecordEntity {
        team_id: "101".into(),
        round2_outcome: Some("Freeze".into()),
        round3_outcome: Some("2 Member Out".into()),
    });
    let (state, id) = setup(store).await;

    let err = session_service::verify(&state, id, "101").await.unwrap_err();
    assert!(matches!(err, ServiceError::AllRoundsComplete(_)));
    assert_eq!(phase(&state, id).await, DrawPhase::Completed);
    assert!(matches!(
        session_service::draw(&state, id).await,
        Err(ServiceError::AllRoundsComplete(_))
    ));
}

#[tokio::test]
async fn reset_clears_every_cached_key() {
    let (state, id) = setup(MemoryRecordStore::with_teams(["101"])).await;
    session_service::verify(&state, id, "101").await.unwrap();
    session_service::draw_and_commit(&state, id).await.unwrap();

    let handle = state.session(id).unwrap();
    assert!(handle.cache().get(KEY_TEAM_ID).is_some());

    let snapshot = session_service::reset(&state, id).await.unwrap();
    assert!(!snapshot.verified);
    assert!(snapshot.team_id.is_none());
    assert_eq!(phase(&state, id).await, DrawPhase::Unverified);
    for key in [KEY_TEAM_ID, KEY_ROUND2_DRAWN, KEY_ROUND3_DRAWN, KEY_ROUND2_OUTCOME_TYPE] {
        assert!(handle.cache().get(key).is_none(), "{key} survived reset");
    }
}

#[tokio::test]
async fn committing_twice_does_not_change_anything() {
    let store = MemoryRecordStore::with_teams(["101"]);
    let (state, id) = setup(store.clone()).await;
    session_service::verify(&state, id, "101").await.unwrap();
    let (round, outcome) = session_service::draw(&state, id).await.unwrap();

    let first = session_service::commit(&state, id, round, outcome).await.unwrap();
    let second = session_service::commit(&state, id, round, outcome).await.unwrap();

    assert!(!first.already_recorded);
    assert!(second.already_recorded);
    assert_eq!(first.next_round, second.next_round);
    assert_eq!(phase(&state, id).await, DrawPhase::AwaitingDraw(Round::Three));
    assert_eq!(
        store.record("101").unwrap().round2_outcome.as_deref(),
        Some(outcome.label())
    );
}

#[tokio::test]
async fn rejected_submission_keeps_revealed_outcome() {
    let store = MemoryRecordStore::with_teams(["101"]);
    let (state, id) = setup(store.clone()).await;
    session_service::verify(&state, id, "101").await.unwrap();
    let (round, outcome) = session_service::draw(&state, id).await.unwrap();

    // Another device recorded a different outcome in the meantime.
    let other = Outcome::ALL
        .into_iter()
        .find(|candidate| *candidate != outcome)
        .unwrap();
    store.insert_record(TeamRecordEntity {
        team_id: "101".into(),
        round2_outcome: Some(other.label().into()),
        round3_outcome: None,
    });

    let err = session_service::commit(&state, id, round, outcome).await.unwrap_err();
    assert!(matches!(err, ServiceError::RecordingFailed(_)));
    assert_eq!(
        phase(&state, id).await,
        DrawPhase::Revealed {
            round: Round::Two,
            outcome
        }
    );
    let snapshot = session_service::get_session(&state, id).await.unwrap();
    let reveal = snapshot.last_reveal.expect("reveal kept");
    assert!(!reveal.recorded);
    assert_eq!(reveal.outcome.kind, outcome);
    assert!(matches!(
        session_service::draw(&state, id).await,
        Err(ServiceError::InvalidState(_))
    ));

    // Re-verifying picks up the authoritative record.
    let resynced = session_service::verify(&state, id, "101").await;
    assert!(matches!(resynced, Err(ServiceError::InvalidState(_))));
    session_service::reset(&state, id).await.unwrap();
    let resynced = session_service::verify(&state, id, "101").await.unwrap();
    assert_eq!(resynced.round, Some(3));
    assert_eq!(resynced.round2_outcome.map(|summary| summary.kind), Some(other));
}

#[tokio::test]
async fn admin_stats_cover_all_teams() {
    let store = MemoryRecordStore::with_teams(["101", "102", "201"]);
    let (state, id) = setup(store).await;
    session_service::verify(&state, id, "101").await.unwrap();
    session_service::draw_and_commit(&state, id).await.unwrap();

    let listed = admin_service::list_records(&state, Some("20")).await.unwrap();
    assert_eq!(listed.records.len(), 1);
    assert_eq!(listed.records[0].team_id, "201");
    assert_eq!(listed.stats.total_teams, 3);
    assert_eq!(listed.stats.round2_drawn, 1);
    assert_eq!(listed.stats.round3_drawn, 0);
}
