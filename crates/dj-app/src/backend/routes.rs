use std::sync::Arc;
use axum::Router;
use axum::routing::{get, post};
use crate::backend::routes::generate::{generate, status};
use crate::backend::routes::job::{delete_job, get_job, run_job, submit_job};
use crate::backend::state::GenState;

mod generate;
mod job;

pub fn api_routes() -> Router<Arc<GenState>> {
    Router::new()
        .route("/api/generate", post(generate).get(status))
        .route("/api/jobs", post(submit_job))
        .route("/api/jobs/{id}", get(get_job).delete(delete_job))
        .route("/api/jobs/{id}/run", post(run_job))
}
