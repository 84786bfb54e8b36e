use anyhow::{Context, Result};
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_THUMBNAIL_EDGE: u32 = 500;
const DEFAULT_JPEG_QUALITY: u8 = 80;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Connection and addressing settings for the S3-compatible backend.
///
/// Passed explicitly into [`crate::services::backend::S3Backend`] and
/// [`crate::services::object_store::ObjectStore`] construction so the
/// pipeline stays testable with substituted backends.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend host, optionally with port (e.g. `minio.internal:9000`).
    pub endpoint: String,
    /// Signing region; S3-compatible stores usually accept any value.
    pub region: String,
    /// Whether to reach the endpoint over TLS.
    pub secure: bool,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Prefix under which all managed keys live. May be empty.
    pub base_path: String,
    /// Public base URL from which stored objects are served.
    pub base_url: String,
    /// Canned ACL applied to uploads. `None` means no ACL header is sent
    /// at all, not a default-deny value.
    pub default_acl: Option<String>,
}

impl StoreConfig {
    /// Full endpoint URL, scheme derived from the `secure` flag.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

/// Knobs for the processing side: size cap and thumbnail rendering.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Cap applied uniformly to remote fetches and direct uploads.
    pub max_upload_bytes: u64,
    /// Target length of the thumbnail's longer dimension, in pixels.
    pub thumbnail_edge: u32,
    pub jpeg_quality: u8,
    pub fetch_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            thumbnail_edge: DEFAULT_THUMBNAIL_EDGE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

/// Centralized configuration, built from `MEDIA_STORE_*` environment
/// variables or assembled directly by the embedding application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// Required: `MEDIA_STORE_ENDPOINT`, `MEDIA_STORE_ACCESS_KEY`,
    /// `MEDIA_STORE_SECRET_KEY`, `MEDIA_STORE_BUCKET`,
    /// `MEDIA_STORE_BASE_URL`. Everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let endpoint = require_env("MEDIA_STORE_ENDPOINT")?;
        let access_key = require_env("MEDIA_STORE_ACCESS_KEY")?;
        let secret_key = require_env("MEDIA_STORE_SECRET_KEY")?;
        let bucket = require_env("MEDIA_STORE_BUCKET")?;
        let base_url = require_env("MEDIA_STORE_BASE_URL")?;

        let region = env::var("MEDIA_STORE_REGION").unwrap_or_else(|_| "us-east-1".into());
        let secure = match env::var("MEDIA_STORE_SECURE") {
            Ok(value) => matches!(value.as_str(), "1" | "true" | "TRUE"),
            Err(_) => true,
        };
        let base_path = env::var("MEDIA_STORE_BASE_PATH").unwrap_or_default();
        let default_acl = env::var("MEDIA_STORE_DEFAULT_ACL").ok().filter(|v| !v.is_empty());

        let max_upload_bytes = match env::var("MEDIA_STORE_MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing MEDIA_STORE_MAX_UPLOAD_BYTES value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_UPLOAD_BYTES,
            Err(err) => return Err(err).context("reading MEDIA_STORE_MAX_UPLOAD_BYTES"),
        };
        let fetch_timeout_secs = match env::var("MEDIA_STORE_FETCH_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing MEDIA_STORE_FETCH_TIMEOUT_SECS value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_FETCH_TIMEOUT_SECS,
            Err(err) => return Err(err).context("reading MEDIA_STORE_FETCH_TIMEOUT_SECS"),
        };

        Ok(Self {
            store: StoreConfig {
                endpoint,
                region,
                secure,
                access_key,
                secret_key,
                bucket,
                base_path,
                base_url,
                default_acl,
            },
            media: MediaConfig {
                max_upload_bytes,
                fetch_timeout_secs,
                ..MediaConfig::default()
            },
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("reading required variable {}", name))
}
