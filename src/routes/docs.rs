use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const SWAGGER_UI_PATH: &str = "/docs";
const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI for the session and admin API, served next to its OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "wildcard-draw-back".into();
    doc.info.description = Some("Team verification, wildcard draws and result recording.".into());

    let ui: Router<SharedState> = SwaggerUi::new(SWAGGER_UI_PATH)
        .url(OPENAPI_JSON_PATH, doc)
        .into();

    ui.with_state(state)
}
