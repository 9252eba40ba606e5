//! The contract upload relay endpoint.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde_json::Value;

use crate::AppState;
use crate::api::models::analyze::{AnalyzeResponse, ErrorBody, success_envelope};
use crate::errors::{Error, Result};
use crate::spool::SpooledFile;

#[utoipa::path(
    post,
    path = "/analyze",
    tag = "analyze",
    summary = "Analyze a contract",
    description = "Upload a contract under the `contract` form field. The file is forwarded to the \
                   analysis service and the resulting JSON document is relayed back inside a success \
                   envelope carrying the original filename.",
    request_body(
        content_type = "multipart/form-data",
        description = "Contract file upload (field name `contract`)"
    ),
    responses(
        (status = 200, description = "Analysis result", body = AnalyzeResponse),
        (status = 400, description = "No file uploaded", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn analyze_contract(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Value>> {
    let mut spooled: Option<SpooledFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        match field.name().unwrap_or("") {
            // First `contract` field wins; repeats are drained and ignored
            "contract" if spooled.is_none() => {
                spooled = Some(SpooledFile::from_field(&state.config.upload_dir, field).await?);
            }
            _ => {
                // Ignore unknown fields (forward compatibility)
            }
        }
    }

    // The spool guard deletes the temp file on every exit path below.
    let spooled = spooled.ok_or(Error::NoFileUploaded)?;

    tracing::info!(
        filename = spooled.original_name(),
        size_bytes = spooled.size(),
        content_type = ?spooled.content_type(),
        "Forwarding contract to analysis service"
    );

    let document = state.analyzer.analyze(spooled.path(), spooled.original_name()).await?;

    Ok(Json(success_envelope(spooled.original_name(), document)))
}
