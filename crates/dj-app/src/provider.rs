use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};
use crate::config::{ApiKey, ProviderConfig};
use crate::error::GenerateError;

/// Share of the init image kept in the output.
const IMAGE_STRENGTH: &str = "0.6";
const PROMPT_WEIGHT: &str = "1";
const CFG_SCALE: &str = "7";
const SAMPLES: &str = "1";
const STEPS: &str = "30";

const GENERIC_FAILURE: &str = "An error occurred while generating the AI image.";

/// Input for a single image-to-image call. Output size equals input size.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub image: Vec<u8>,
    pub file_name: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    InvalidCredentials,
    InsufficientCredits,
    EmptyResult,
    Timeout,
    Upstream { status: Option<u16>, message: String },
}

impl ProviderFailure {
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Upstream {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<ProviderFailure> for GenerateError {
    fn from(failure: ProviderFailure) -> Self {
        match failure {
            ProviderFailure::InvalidCredentials => Self::InvalidCredentials,
            ProviderFailure::InsufficientCredits => Self::InsufficientCredits,
            ProviderFailure::EmptyResult => Self::EmptyResult,
            ProviderFailure::Timeout => Self::ProviderTimeout,
            ProviderFailure::Upstream { message, .. } => Self::Provider(message),
        }
    }
}

/// One upstream call per invocation, no retries. Returns the first
/// generated image as base64.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn image_to_image(
        &self,
        api_key: &ApiKey,
        request: ProviderRequest,
    ) -> Result<String, ProviderFailure>;
}

#[derive(Debug, Deserialize)]
struct GenerationPayload {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(default)]
    base64: String,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
}

pub struct StabilityClient {
    http: reqwest::Client,
    endpoint: String,
}

impl StabilityClient {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let endpoint = format!(
            "{}/v1/generation/{}/image-to-image",
            config.host.trim_end_matches('/'),
            config.engine
        );

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(request: ProviderRequest) -> Result<Form, ProviderFailure> {
        let image = Part::bytes(request.image)
            .file_name(request.file_name)
            .mime_str("image/jpeg")
            .map_err(ProviderFailure::from_transport)?;

        Ok(Form::new()
            .part("init_image", image)
            .text("init_image_mode", "IMAGE_STRENGTH")
            .text("image_strength", IMAGE_STRENGTH)
            .text("text_prompts[0][text]", request.prompt)
            .text("text_prompts[0][weight]", PROMPT_WEIGHT)
            .text("cfg_scale", CFG_SCALE)
            .text("samples", SAMPLES)
            .text("steps", STEPS))
    }
}

#[async_trait]
impl ImageProvider for StabilityClient {
    async fn image_to_image(
        &self,
        api_key: &ApiKey,
        request: ProviderRequest,
    ) -> Result<String, ProviderFailure> {
        let form = Self::form(request)?;

        debug!("Sending image-to-image request to {}", self.endpoint);
        let response = self.http
            .post(&self.endpoint)
            .bearer_auth(api_key.expose())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(ProviderFailure::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Stability AI returned HTTP {}: {}", status, body);
            return Err(classify_failure(status.as_u16(), &body));
        }

        let payload: GenerationPayload = response
            .json()
            .await
            .map_err(ProviderFailure::from_transport)?;

        first_artifact(payload)
    }
}

fn classify_failure(status: u16, body: &str) -> ProviderFailure {
    match status {
        401 => ProviderFailure::InvalidCredentials,
        402 => ProviderFailure::InsufficientCredits,
        _ => {
            let message = serde_json::from_str::<ErrorPayload>(body)
                .ok()
                .and_then(|p| p.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            ProviderFailure::Upstream { status: Some(status), message }
        }
    }
}

fn first_artifact(payload: GenerationPayload) -> Result<String, ProviderFailure> {
    let artifact = payload
        .artifacts
        .into_iter()
        .next()
        .ok_or(ProviderFailure::EmptyResult)?;

    if let Some(reason) = &artifact.finish_reason {
        debug!("First artifact finished with {}", reason);
    }
    if artifact.base64.is_empty() {
        return Err(ProviderFailure::EmptyResult);
    }

    Ok(artifact.base64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use axum::Router;
    use axum::extract::{Multipart, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Captured {
        fields: HashMap<String, String>,
        image_len: usize,
        image_type: Option<String>,
        authorization: Option<String>,
    }

    struct FakeProvider {
        status: StatusCode,
        body: String,
        delay: Duration,
        captured: Mutex<Captured>,
    }

    async fn fake_generate(
        State(fake): State<Arc<FakeProvider>>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> (StatusCode, String) {
        let mut captured = Captured {
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            ..Captured::default()
        };
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            if name == "init_image" {
                captured.image_type = field.content_type().map(str::to_owned);
                captured.image_len = field.bytes().await.unwrap().len();
            } else {
                captured.fields.insert(name, field.text().await.unwrap());
            }
        }
        *fake.captured.lock().unwrap() = captured;

        tokio::time::sleep(fake.delay).await;
        (fake.status, fake.body.clone())
    }

    async fn spawn_fake(status: StatusCode, body: Value, delay: Duration) -> (String, Arc<FakeProvider>) {
        let fake = Arc::new(FakeProvider {
            status,
            body: body.to_string(),
            delay,
            captured: Mutex::new(Captured::default()),
        });
        let app = Router::new()
            .route("/v1/generation/{engine}/image-to-image", post(fake_generate))
            .with_state(fake.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), fake)
    }

    fn client(host: String, timeout: Duration) -> StabilityClient {
        StabilityClient::new(&ProviderConfig {
            host,
            engine: "test-engine".into(),
            timeout,
        })
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            image: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3],
            file_name: "selfie.jpg".into(),
            prompt: "A professional portrait of a person working as a \"pilot\"".into(),
        }
    }

    fn key() -> ApiKey {
        ApiKey::new("sk-test").unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let client = client("https://api.stability.ai/".into(), Duration::from_secs(1));
        assert_eq!(
            client.endpoint(),
            "https://api.stability.ai/v1/generation/test-engine/image-to-image"
        );
    }

    #[tokio::test]
    async fn test_sends_form_and_returns_first_artifact() {
        let body = json!({"artifacts": [
            {"base64": "Zmlyc3Q=", "seed": 1, "finishReason": "SUCCESS"},
            {"base64": "c2Vjb25k", "seed": 2, "finishReason": "SUCCESS"}
        ]});
        let (host, fake) = spawn_fake(StatusCode::OK, body, Duration::ZERO).await;

        let image = client(host, Duration::from_secs(5))
            .image_to_image(&key(), request())
            .await
            .unwrap();
        assert_eq!(image, "Zmlyc3Q=");

        let captured = fake.captured.lock().unwrap();
        assert_eq!(captured.authorization.as_deref(), Some("Bearer sk-test"));
        assert_eq!(captured.image_len, 7);
        assert_eq!(captured.image_type.as_deref(), Some("image/jpeg"));
        assert_eq!(captured.fields["init_image_mode"], "IMAGE_STRENGTH");
        assert_eq!(captured.fields["image_strength"], "0.6");
        assert_eq!(captured.fields["text_prompts[0][weight]"], "1");
        assert_eq!(captured.fields["cfg_scale"], "7");
        assert_eq!(captured.fields["samples"], "1");
        assert_eq!(captured.fields["steps"], "30");
        assert!(captured.fields["text_prompts[0][text]"].contains("\"pilot\""));
    }

    #[tokio::test]
    async fn test_classifies_credentials_and_credits() {
        let (host, _) = spawn_fake(StatusCode::UNAUTHORIZED, json!({"message": "bad key"}), Duration::ZERO).await;
        let err = client(host, Duration::from_secs(5)).image_to_image(&key(), request()).await.unwrap_err();
        assert_eq!(err, ProviderFailure::InvalidCredentials);

        let (host, _) = spawn_fake(StatusCode::PAYMENT_REQUIRED, json!({}), Duration::ZERO).await;
        let err = client(host, Duration::from_secs(5)).image_to_image(&key(), request()).await.unwrap_err();
        assert_eq!(err, ProviderFailure::InsufficientCredits);
    }

    #[tokio::test]
    async fn test_upstream_message_is_surfaced() {
        let body = json!({"id": "abc", "name": "bad_request", "message": "init_image: dimensions invalid"});
        let (host, _) = spawn_fake(StatusCode::BAD_REQUEST, body, Duration::ZERO).await;
        let err = client(host, Duration::from_secs(5)).image_to_image(&key(), request()).await.unwrap_err();
        assert_eq!(err, ProviderFailure::Upstream {
            status: Some(400),
            message: "init_image: dimensions invalid".into(),
        });
    }

    #[tokio::test]
    async fn test_empty_artifacts() {
        let (host, _) = spawn_fake(StatusCode::OK, json!({"artifacts": []}), Duration::ZERO).await;
        let err = client(host, Duration::from_secs(5)).image_to_image(&key(), request()).await.unwrap_err();
        assert_eq!(err, ProviderFailure::EmptyResult);
    }

    #[tokio::test]
    async fn test_timeout() {
        let (host, _) = spawn_fake(StatusCode::OK, json!({"artifacts": []}), Duration::from_secs(5)).await;
        let err = client(host, Duration::from_millis(200)).image_to_image(&key(), request()).await.unwrap_err();
        assert_eq!(err, ProviderFailure::Timeout);
    }

    #[test]
    fn test_unparseable_error_body_uses_generic_message() {
        let failure = classify_failure(503, "<html>Service Unavailable</html>");
        assert_eq!(failure, ProviderFailure::Upstream {
            status: Some(503),
            message: GENERIC_FAILURE.into(),
        });
    }

    #[test]
    fn test_failure_maps_to_generate_error() {
        assert_eq!(GenerateError::from(ProviderFailure::InvalidCredentials).kind(), "InvalidCredentials");
        assert_eq!(GenerateError::from(ProviderFailure::InsufficientCredits).kind(), "InsufficientCredits");
        assert_eq!(GenerateError::from(ProviderFailure::EmptyResult).kind(), "EmptyResult");
        assert_eq!(GenerateError::from(ProviderFailure::Timeout).kind(), "ProviderTimeout");
    }
}
