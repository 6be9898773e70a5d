use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// A record may only leave `Pending`; terminal states are final.
    pub fn can_become(&self, next: JobStatus) -> bool {
        match self {
            Self::Pending => true,
            terminal => *terminal == next,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed job hands back to the result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub message: String,
    /// Base64 encoded image returned by the provider.
    pub image_data: String,
    pub job_text: String,
    pub prompt: String,
}

/// One generation attempt carried from the submission page to the result page.
///
/// The uploaded image travels inline as a data URI so the record is
/// self-contained. `status` and `result` are only mutated through
/// [`GenerationJob::complete`] and [`GenerationJob::fail`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: String,
    pub job_text: String,
    pub image_file: String,
    pub file_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl GenerationJob {
    pub fn new_pending(
        job_text: impl Into<String>,
        image_file: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_text: job_text.into(),
            image_file: image_file.into(),
            file_name: file_name.into(),
            timestamp: Utc::now(),
            status: JobStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn complete(&mut self, result: JobResult) -> Result<()> {
        self.ensure_pending()?;
        self.status = JobStatus::Completed;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.ensure_pending()?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        Ok(())
    }

    /// `result` is present iff the job completed.
    pub fn is_consistent(&self) -> bool {
        self.result.is_some() == (self.status == JobStatus::Completed)
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(Error::AlreadyFinished {
                id: self.id.clone(),
                status: self.status,
            })
        }
    }
}
