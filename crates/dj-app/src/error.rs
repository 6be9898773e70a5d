use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Every failure the HTTP surface can report. Each variant maps to one
/// status code and a stable `kind` string.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Stability AI API key is not configured")]
    Configuration,

    #[error("An image file is required.")]
    MissingImage,

    #[error("Occupation text is required.")]
    MissingOccupation,

    #[error("Please upload a valid image file.")]
    InvalidImageType,

    #[error("Malformed form data: {0}")]
    MalformedForm(String),

    #[error("The upload is too large.")]
    PayloadTooLarge,

    #[error("An error occurred while processing the image.")]
    Processing(#[from] dj_imaging::Error),

    #[error("The Stability AI API key is invalid.")]
    InvalidCredentials,

    #[error("Insufficient Stability AI credits.")]
    InsufficientCredits,

    #[error("Image generation failed.")]
    EmptyResult,

    #[error("{0}")]
    Provider(String),

    #[error("The image generation service did not respond in time.")]
    ProviderTimeout,

    #[error("Generation request data could not be found.")]
    JobNotFound(String),

    #[error("Job store error: {0}")]
    JobStore(#[from] dj_core::Error),

    #[error("A server error occurred.")]
    Unknown(String),
}

impl GenerateError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::MissingImage => "MissingImage",
            Self::MissingOccupation => "MissingOccupation",
            Self::InvalidImageType => "InvalidImageType",
            Self::MalformedForm(_) => "MalformedForm",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::Processing(_) => "ProcessingError",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::InsufficientCredits => "InsufficientCredits",
            Self::EmptyResult => "EmptyResult",
            Self::Provider(_) => "ProviderError",
            Self::ProviderTimeout => "ProviderTimeout",
            Self::JobNotFound(_) => "JobNotFound",
            Self::JobStore(_) => "JobStoreError",
            Self::Unknown(_) => "UnknownServerError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImage
            | Self::MissingOccupation
            | Self::InvalidImageType
            | Self::MalformedForm(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            Self::JobNotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration
            | Self::Processing(_)
            | Self::EmptyResult
            | Self::Provider(_)
            | Self::JobStore(_)
            | Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Processing(source) => error!("Image processing failed: {}", source),
            Self::Unknown(detail) => error!("Unhandled server error: {}", detail),
            e if status.is_server_error() => error!("{} ({}): {}", status, e.kind(), e),
            e => warn!("{} ({}): {}", status, e.kind(), e),
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
