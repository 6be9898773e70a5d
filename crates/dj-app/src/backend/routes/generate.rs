use std::collections::BTreeMap;
use std::sync::Arc;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::extract::multipart::MultipartRejection;
use crate::backend::form::read_generation_form;
use crate::backend::schemas::StatusResponse;
use crate::backend::state::GenState;
use crate::error::GenerateError;
use crate::generator::GenerationResponse;

pub async fn generate(
    State(state): State<Arc<GenState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerationResponse>, GenerateError> {
    // Credentials are checked before the body is read.
    state.generator.ensure_configured()?;

    let multipart = multipart.map_err(|e| GenerateError::MalformedForm(e.body_text()))?;
    let form = read_generation_form(multipart).await?;

    Ok(Json(state.generator.generate(form).await?))
}

pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "AI Job Image Generator API",
        status: "active",
        endpoints: BTreeMap::from([
            ("GET /api/generate", "API status"),
            ("POST /api/generate", "Generate job-themed images"),
            ("POST /api/jobs", "Queue a generation job"),
            ("GET /api/jobs/{id}", "Fetch a generation job"),
            ("POST /api/jobs/{id}/run", "Run a pending generation job"),
            ("DELETE /api/jobs/{id}", "Discard a generation job"),
        ]),
    })
}
