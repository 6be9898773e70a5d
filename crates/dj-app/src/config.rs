use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use anyhow::Context;

/// Value shipped in `.env.example`; treated the same as an unset key.
pub const PLACEHOLDER_API_KEY: &str = "your_stability_api_key_here";

const DEFAULT_HOST: &str = "https://api.stability.ai";
const DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

/// Provider secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// `None` for empty or placeholder values.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == PLACEHOLDER_API_KEY {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub host: String,
    pub engine: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub api_key: Option<ApiKey>,
    pub provider: ProviderConfig,
    pub job_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is fine; the process environment still applies.
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("failed to read .env");
            }
        }

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = ProviderConfig::default();

        Ok(Self {
            port: parse_var(&lookup, "PORT", 3000)?,
            api_key: lookup("STABILITY_API_KEY").and_then(ApiKey::new),
            provider: ProviderConfig {
                host: lookup("STABILITY_API_HOST").unwrap_or(defaults.host),
                engine: lookup("STABILITY_ENGINE").unwrap_or(defaults.engine),
                timeout: Duration::from_secs(parse_var(&lookup, "PROVIDER_TIMEOUT_SECS", 120)?),
            },
            job_ttl: Duration::from_secs(parse_var(&lookup, "JOB_TTL_SECS", 3600)?),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}
