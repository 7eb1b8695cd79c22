use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::session::{CommitRequest, CommitResponse, DrawResponse, SessionSnapshot, VerifyRequest},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Participant-facing draw flow endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/verify", post(verify_team))
        .route("/sessions/{id}/resume", post(resume_session))
        .route("/sessions/{id}/draw", post(draw))
        .route("/sessions/{id}/commit", post(commit))
        .route("/sessions/{id}/reset", post(reset_session))
}

/// Open a new draw session.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    responses((status = 200, description = "Session created", body = SessionSnapshot))
)]
pub async fn create_session(
    State(state): State<SharedState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::create_session(&state)?))
}

/// Fetch the current state of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session state", body = SessionSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::get_session(&state, id).await?))
}

/// Identify the team and reconcile its progress with the record store.
#[utoipa::path(
    post,
    path = "/sessions/{id}/verify",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Team verified", body = SessionSnapshot),
        (status = 400, description = "Malformed team number"),
        (status = 404, description = "Unknown team or session"),
        (status = 409, description = "Every round already drawn"),
        (status = 503, description = "Record store unreachable")
    )
)]
pub async fn verify_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    payload.validate()?;
    Ok(Json(
        session_service::verify(&state, id, &payload.team_id).await?,
    ))
}

/// Re-verify the team remembered by the session's local cache.
#[utoipa::path(
    post,
    path = "/sessions/{id}/resume",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Team verified", body = SessionSnapshot),
        (status = 409, description = "Nothing to resume or every round already drawn")
    )
)]
pub async fn resume_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::resume(&state, id).await?))
}

/// Draw the current round and submit the result.
///
/// The outcome is returned even when it could not be recorded.
#[utoipa::path(
    post,
    path = "/sessions/{id}/draw",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Outcome revealed", body = DrawResponse),
        (status = 409, description = "No draw available in the current phase")
    )
)]
pub async fn draw(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DrawResponse>, AppError> {
    Ok(Json(session_service::draw_and_commit(&state, id).await?))
}

/// Submit, or resubmit, a revealed outcome.
#[utoipa::path(
    post,
    path = "/sessions/{id}/commit",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Outcome recorded", body = CommitResponse),
        (status = 409, description = "Outcome does not match the session"),
        (status = 502, description = "Record store refused the result"),
        (status = 503, description = "Record store unreachable")
    )
)]
pub async fn commit(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommitRequest>,
) -> Result<Json<CommitResponse>, AppError> {
    let round = payload.round()?;
    Ok(Json(
        session_service::commit(&state, id, round, payload.outcome).await?,
    ))
}

/// Forget the team and clear the local cache.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Session reset", body = SessionSnapshot))
)]
pub async fn reset_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::reset(&state, id).await?))
}
