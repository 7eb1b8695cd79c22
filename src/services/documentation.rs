use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the wildcard draw backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::verify_team,
        crate::routes::session::resume_session,
        crate::routes::session::draw,
        crate::routes::session::commit,
        crate::routes::session::reset_session,
        crate::routes::admin::list_records,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::phase::VisibleDrawPhase,
            crate::dto::session::VerifyRequest,
            crate::dto::session::CommitRequest,
            crate::dto::session::SessionSnapshot,
            crate::dto::session::DrawResponse,
            crate::dto::session::CommitResponse,
            crate::dto::session::RecordingError,
            crate::dto::admin::RecordsResponse,
            crate::dto::admin::RecordListItem,
            crate::dto::admin::RecordStats,
            crate::state::outcome::Outcome,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Team verification and wildcard draws"),
        (name = "admin", description = "Record store administration"),
    )
)]
pub struct ApiDoc;
