//! Retrieving image bytes for a locator

use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Raw bytes of one image
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Content type reported by the source, if any
    pub mime_type: Option<String>,
}

/// Source of image bytes
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<FetchedImage, FetchError>;
}

const ASSET_SCHEMES: &[&str] = &["file-service://", "sediment://"];

/// File id of an asset pointer (`file-service://file-abc` -> `file-abc`)
pub fn asset_id(locator: &str) -> Option<&str> {
    ASSET_SCHEMES
        .iter()
        .find_map(|scheme| locator.strip_prefix(scheme))
        .filter(|id| !id.is_empty())
}

/// Decode a `data:` URI
pub fn decode_data_uri(locator: &str) -> Result<FetchedImage, FetchError> {
    let rest = locator
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::Decode("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::Decode("data URI without payload".to_string()))?;

    let mime = header.split(';').next().filter(|m| !m.is_empty());
    let bytes = if header.ends_with(";base64") {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| FetchError::Decode(e.to_string()))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(FetchedImage {
        bytes,
        mime_type: mime.map(str::to_string),
    })
}

/// Fetches over HTTP(S); decodes data URIs locally
pub struct HttpFetcher {
    client: reqwest::Client,
    asset_base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self {
            client,
            asset_base_url: config
                .asset_base_url
                .as_ref()
                .map(|base| base.trim_end_matches('/').to_string()),
        })
    }

    fn resolve(&self, locator: &str) -> Result<String, FetchError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(locator.to_string());
        }
        match (asset_id(locator), &self.asset_base_url) {
            (Some(id), Some(base)) => Ok(format!("{}/{}", base, id)),
            _ => Err(FetchError::Unresolvable(locator.to_string())),
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedImage, FetchError> {
        if locator.starts_with("data:") {
            return decode_data_uri(locator);
        }

        let url = self.resolve(locator)?;
        debug!("Fetching image {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                locator: locator.to_string(),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"));
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

/// Resolves asset pointers to files in a local directory
///
/// A data export names asset files `<file id>-<original name>`, so the first
/// entry whose name starts with the pointer's id wins. Other locators go to
/// the fallback fetcher when one is configured.
pub struct LocalAssetFetcher {
    dir: PathBuf,
    fallback: Option<Arc<dyn ImageFetcher>>,
}

impl LocalAssetFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn ImageFetcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    async fn find_asset(&self, id: &str) -> Result<Option<PathBuf>, FetchError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut matches = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if names_asset(&name.to_string_lossy(), id) {
                matches.push(entry.path());
            }
        }
        matches.sort();
        Ok(matches.into_iter().next())
    }
}

/// Whether a file name belongs to an asset id: the id followed by `-`,
/// `.` or nothing
fn names_asset(file_name: &str, id: &str) -> bool {
    match file_name.strip_prefix(id) {
        Some(rest) => rest.is_empty() || rest.starts_with('-') || rest.starts_with('.'),
        None => false,
    }
}

#[async_trait]
impl ImageFetcher for LocalAssetFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedImage, FetchError> {
        if let Some(id) = asset_id(locator) {
            if let Some(path) = self.find_asset(id).await? {
                debug!("Reading asset {} from {:?}", id, path);
                let bytes = tokio::fs::read(&path).await?;
                let mime = path
                    .file_name()
                    .map(|name| super::naming::infer_mime(&name.to_string_lossy()));
                return Ok(FetchedImage {
                    bytes,
                    mime_type: mime,
                });
            }
        }

        match &self.fallback {
            Some(fallback) => fallback.fetch(locator).await,
            None if locator.starts_with("data:") => decode_data_uri(locator),
            None => Err(FetchError::Unresolvable(locator.to_string())),
        }
    }
}
