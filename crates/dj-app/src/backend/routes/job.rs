use std::sync::Arc;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use dj_core::GenerationJob;
use crate::backend::form::read_generation_form;
use crate::backend::schemas::JobCreateResponse;
use crate::backend::state::GenState;
use crate::error::GenerateError;

pub async fn submit_job(
    State(state): State<Arc<GenState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<JobCreateResponse>), GenerateError> {
    let multipart = multipart.map_err(|e| GenerateError::MalformedForm(e.body_text()))?;
    let form = read_generation_form(multipart).await?;
    let job = state.generator.submit_job(form)?;

    Ok((StatusCode::CREATED, Json(JobCreateResponse::from(&job))))
}

pub async fn get_job(
    State(state): State<Arc<GenState>>,
    Path(id): Path<String>,
) -> Result<Json<GenerationJob>, GenerateError> {
    Ok(Json(state.generator.get_job(&id)?))
}

pub async fn run_job(
    State(state): State<Arc<GenState>>,
    Path(id): Path<String>,
) -> Result<Json<GenerationJob>, GenerateError> {
    Ok(Json(state.generator.run_job(&id).await?))
}

pub async fn delete_job(
    State(state): State<Arc<GenState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, GenerateError> {
    state.generator.remove_job(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
