//! OpenAPI documentation for the relay API, served at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ClauseGuard Relay API",
        description = "Thin relay between contract uploads and the analysis service"
    ),
    paths(api::handlers::analyze::analyze_contract),
    components(schemas(api::models::analyze::AnalyzeResponse, api::models::analyze::ErrorBody)),
    tags((name = "analyze", description = "Contract analysis relay"))
)]
pub struct ApiDoc;
