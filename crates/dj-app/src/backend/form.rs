use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use crate::error::GenerateError;
use crate::generator::{GenerationForm, UploadedImage};

const IMAGE_FIELD: &str = "image";
const JOB_TEXT_FIELD: &str = "jobText";

fn malformed(e: MultipartError) -> GenerateError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GenerateError::PayloadTooLarge
    } else {
        GenerateError::MalformedForm(e.body_text())
    }
}

/// Collects the `image` and `jobText` fields. Unknown fields are skipped and
/// an image part with no bytes counts as absent.
pub async fn read_generation_form(mut multipart: Multipart) -> Result<GenerationForm, GenerateError> {
    let mut form = GenerationForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                form.image = (!bytes.is_empty()).then(|| UploadedImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some(JOB_TEXT_FIELD) => {
                form.job_text = Some(field.text().await.map_err(malformed)?);
            }
            _ => {}
        }
    }

    Ok(form)
}
