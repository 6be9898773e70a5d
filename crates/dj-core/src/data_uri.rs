use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crate::error::{Error, Result};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub data: Vec<u8>,
}

pub fn encode(mime: &str, data: &[u8]) -> String {
    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

/// Decodes a base64 `data:` URI. Plain (non-base64) payloads are rejected.
pub fn decode(uri: &str) -> Result<DataUri> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::DataUri("missing data: scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::DataUri("missing payload separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::DataUri("payload is not base64".into()))?;
    let data = STANDARD
        .decode(payload)
        .map_err(|e| Error::DataUri(e.to_string()))?;

    Ok(DataUri {
        mime: if mime.is_empty() { FALLBACK_MIME.to_string() } else { mime.to_string() },
        data,
    })
}
