use std::collections::BTreeMap;
use serde::Serialize;
use dj_core::{GenerationJob, JobStatus};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobCreateResponse {
    pub id: String,
    pub status: JobStatus,
    pub result_path: String,
}

impl From<&GenerationJob> for JobCreateResponse {
    fn from(job: &GenerationJob) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status(),
            result_path: format!("/result/{}", job.id),
        }
    }
}
