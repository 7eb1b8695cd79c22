use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
};

use crate::{
    dto::admin::{RecordsQuery, RecordsResponse},
    error::{AppError, ServiceError},
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only views over the record store.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/records", get(list_records))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// List team records with round statistics.
#[utoipa::path(
    get,
    path = "/admin/records",
    tag = "admin",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin key"),
        RecordsQuery
    ),
    responses(
        (status = 200, description = "Team records", body = RecordsResponse),
        (status = 401, description = "Missing or invalid admin key")
    )
)]
pub async fn list_records(
    State(state): State<SharedState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, AppError> {
    Ok(Json(
        admin_service::list_records(&state, query.search.as_deref()).await?,
    ))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            ServiceError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_key.as_deref() {
        Some(key) if key == provided => Ok(next.run(req).await),
        Some(_) => Err(ServiceError::Unauthorized("invalid admin token".into()).into()),
        None => Err(ServiceError::Unauthorized("admin access is not configured".into()).into()),
    }
}
