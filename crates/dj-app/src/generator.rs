use std::sync::Arc;
use dj_core::data_uri;
use dj_core::prompt::{normalize_occupation, occupation_prompt};
use dj_core::{GenerationJob, JobResult, JobStore};
use dj_imaging::TargetSize;
use serde::Serialize;
use tracing::{info, warn};
use crate::config::ApiKey;
use crate::error::GenerateError;
use crate::provider::{ImageProvider, ProviderRequest};

/// Image-to-image keeps the input size, so inputs are fixed to the engine's native size.
pub const PROVIDER_IMAGE_SIZE: TargetSize = TargetSize::square(1024);

const SUCCESS_MESSAGE: &str = "Image generated successfully!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw form fields as received, before any validation.
#[derive(Debug, Clone, Default)]
pub struct GenerationForm {
    pub image: Option<UploadedImage>,
    pub job_text: Option<String>,
}

/// A form that passed validation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: UploadedImage,
    pub occupation: String,
}

impl GenerationRequest {
    /// Checks the image, then the occupation, then the image type.
    pub fn validate(form: GenerationForm) -> Result<Self, GenerateError> {
        let image = form.image.ok_or(GenerateError::MissingImage)?;
        let occupation = form
            .job_text
            .as_deref()
            .and_then(normalize_occupation)
            .ok_or(GenerateError::MissingOccupation)?
            .to_string();

        if !image.content_type.starts_with("image/") {
            return Err(GenerateError::InvalidImageType);
        }

        Ok(Self { image, occupation })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub message: String,
    pub image_data: String,
    pub job_text: String,
    pub prompt: String,
}

impl From<GenerationResponse> for JobResult {
    fn from(resp: GenerationResponse) -> Self {
        JobResult {
            message: resp.message,
            image_data: resp.image_data,
            job_text: resp.job_text,
            prompt: resp.prompt,
        }
    }
}

pub struct Generator {
    api_key: Option<ApiKey>,
    target: TargetSize,
    provider: Arc<dyn ImageProvider>,
    store: Arc<dyn JobStore>,
}

impl Generator {
    pub fn new(
        api_key: Option<ApiKey>,
        provider: Arc<dyn ImageProvider>,
        store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            api_key,
            target: PROVIDER_IMAGE_SIZE,
            provider,
            store,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn ensure_configured(&self) -> Result<&ApiKey, GenerateError> {
        self.api_key.as_ref().ok_or(GenerateError::Configuration)
    }

    /// Validate, normalize, call the provider once.
    pub async fn generate(&self, form: GenerationForm) -> Result<GenerationResponse, GenerateError> {
        let api_key = self.ensure_configured()?;
        let GenerationRequest { image, occupation } = GenerationRequest::validate(form)?;

        info!(
            "Generating portrait for {:?} from {} ({} bytes)",
            occupation, image.file_name, image.bytes.len()
        );

        let target = self.target;
        let source = image.bytes;
        let normalized = tokio::task::spawn_blocking(move || dj_imaging::normalize(&source, target))
            .await
            .map_err(|e| GenerateError::Unknown(e.to_string()))??;
        info!("Image resized to {}x{}", target.width, target.height);

        let prompt = occupation_prompt(&occupation);
        let image_data = self.provider
            .image_to_image(api_key, ProviderRequest {
                image: normalized,
                file_name: image.file_name,
                prompt: prompt.clone(),
            })
            .await?;

        Ok(GenerationResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            image_data,
            job_text: occupation,
            prompt,
        })
    }

    /// Stores a pending job with the image embedded inline.
    pub fn submit_job(&self, form: GenerationForm) -> Result<GenerationJob, GenerateError> {
        let image = form.image.ok_or(GenerateError::MissingImage)?;
        let job_text = form
            .job_text
            .as_deref()
            .and_then(normalize_occupation)
            .ok_or(GenerateError::MissingOccupation)?;

        let image_file = data_uri::encode(&image.content_type, &image.bytes);
        let job = GenerationJob::new_pending(job_text, image_file, image.file_name);
        self.store.put(job.clone())?;

        info!("Queued job {} for {:?}", job.id, job.job_text);
        Ok(job)
    }

    pub fn get_job(&self, id: &str) -> Result<GenerationJob, GenerateError> {
        self.store
            .get(id)?
            .ok_or_else(|| GenerateError::JobNotFound(id.to_string()))
    }

    /// Runs a pending job and records the outcome. Finished jobs are
    /// returned untouched.
    pub async fn run_job(&self, id: &str) -> Result<GenerationJob, GenerateError> {
        let mut job = self.get_job(id)?;
        if job.status().is_complete() {
            return Ok(job);
        }

        let outcome = match data_uri::decode(&job.image_file) {
            Ok(image) => {
                self.generate(GenerationForm {
                    image: Some(UploadedImage {
                        file_name: job.file_name.clone(),
                        content_type: image.mime,
                        bytes: image.data,
                    }),
                    job_text: Some(job.job_text.clone()),
                })
                .await
            }
            Err(e) => Err(GenerateError::MalformedForm(e.to_string())),
        };

        match outcome {
            Ok(resp) => job.complete(resp.into())?,
            Err(err) => {
                warn!("Job {} failed ({}): {}", job.id, err.kind(), err);
                job.fail(err.to_string())?;
            }
        }

        // The job may have been discarded while the provider call was in flight.
        if !self.store.update(job.clone())? {
            info!("Job {} was removed during its run; dropping the outcome", job.id);
            return Err(GenerateError::JobNotFound(job.id));
        }
        Ok(job)
    }

    /// Removing an unknown id is not an error.
    pub fn remove_job(&self, id: &str) -> Result<(), GenerateError> {
        if self.store.remove(id)?.is_some() {
            info!("Removed job {}", id);
        }
        Ok(())
    }

    pub fn purge_expired_jobs(&self) -> Result<usize, GenerateError> {
        Ok(self.store.purge_expired()?)
    }
}
