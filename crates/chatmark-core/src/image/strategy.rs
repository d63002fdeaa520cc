//! Image materialization strategies
//!
//! The set of strategies is closed: [`StrategyKind`] names them and
//! [`create_strategy`] builds the matching implementation.

use super::context::{ImageContext, ImageMetadata, ProcessedImage, ProcessedKind};
use super::fetch::{FetchedImage, ImageFetcher};
use super::naming::{image_file_name, image_path};
use crate::config::ImageSettings;
use crate::error::{ChatmarkError, FetchError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Content used when an image could not be retrieved
pub const FAILURE_MARKER: &str = "[Image Failed to Load]";

/// Available strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Inline data URIs
    Embed,
    /// Placeholder text, no fetch
    TextMarker,
    /// Sibling files in an archive
    SeparateFiles,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Embed,
        StrategyKind::TextMarker,
        StrategyKind::SeparateFiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Embed => "embed",
            StrategyKind::TextMarker => "text_marker",
            StrategyKind::SeparateFiles => "separate_files",
        }
    }

    /// Whether the strategy produces sibling files
    pub fn produces_files(&self) -> bool {
        matches!(self, StrategyKind::SeparateFiles)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ChatmarkError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ChatmarkError::Config(format!("Unknown image strategy: {}", s)))
    }
}

/// Turns one image reference into exportable content
#[async_trait]
pub trait ImageStrategy: Send + Sync {
    /// Process one image; failures degrade to a marker, never an error
    async fn process_image(&self, locator: &str, context: &ImageContext) -> ProcessedImage;

    fn strategy_name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn kind(&self) -> StrategyKind;
}

/// Build the strategy for `kind`
pub fn create_strategy(
    kind: StrategyKind,
    settings: &ImageSettings,
    fetcher: Arc<dyn ImageFetcher>,
) -> Result<Box<dyn ImageStrategy>> {
    Ok(match kind {
        StrategyKind::Embed => Box::new(EmbedStrategy::new(fetcher, settings.max_size)),
        StrategyKind::TextMarker => Box::new(TextMarkerStrategy::new(&settings.marker_text)?),
        StrategyKind::SeparateFiles => {
            Box::new(SeparateFilesStrategy::new(fetcher, settings.max_size))
        }
    })
}

fn failed(context: &ImageContext, error: &FetchError) -> ProcessedImage {
    warn!(
        "Image {} of message {} failed: {}",
        context.image_index, context.message_id, error
    );
    ProcessedImage {
        id: context.image_id(),
        content: FAILURE_MARKER.to_string(),
        kind: ProcessedKind::Failed,
        original_data: None,
        metadata: ImageMetadata::from_context(context),
        file_name: None,
    }
}

async fn fetch_checked(
    fetcher: &dyn ImageFetcher,
    locator: &str,
    max_size: usize,
) -> std::result::Result<FetchedImage, FetchError> {
    let image = fetcher.fetch(locator).await?;
    if image.bytes.is_empty() {
        return Err(FetchError::Decode("empty payload".to_string()));
    }
    if max_size > 0 && image.bytes.len() > max_size {
        return Err(FetchError::TooLarge {
            size: image.bytes.len(),
            limit: max_size,
        });
    }
    Ok(image)
}

/// Inlines images as data URIs
pub struct EmbedStrategy {
    fetcher: Arc<dyn ImageFetcher>,
    max_size: usize,
}

impl EmbedStrategy {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, max_size: usize) -> Self {
        Self { fetcher, max_size }
    }
}

#[async_trait]
impl ImageStrategy for EmbedStrategy {
    async fn process_image(&self, locator: &str, context: &ImageContext) -> ProcessedImage {
        let image = match fetch_checked(self.fetcher.as_ref(), locator, self.max_size).await {
            Ok(image) => image,
            Err(err) => return failed(context, &err),
        };

        let mime = image
            .mime_type
            .unwrap_or_else(|| context.mime_type.clone());
        let encoded = STANDARD.encode(&image.bytes);
        let mut metadata = ImageMetadata::from_context(context);
        metadata.mime_type = Some(mime.clone());
        metadata.size = Some(image.bytes.len());

        ProcessedImage {
            id: context.image_id(),
            content: format!("data:{};base64,{}", mime, encoded),
            kind: ProcessedKind::DataUri,
            original_data: Some(encoded),
            metadata,
            file_name: None,
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Embed
    }
}

/// Replaces images with configurable text
pub struct TextMarkerStrategy {
    marker: String,
}

impl TextMarkerStrategy {
    pub fn new(marker: &str) -> Result<Self> {
        if marker.trim().is_empty() {
            return Err(ChatmarkError::Config(
                "Image marker text must not be empty".to_string(),
            ));
        }
        Ok(Self {
            marker: marker.to_string(),
        })
    }
}

#[async_trait]
impl ImageStrategy for TextMarkerStrategy {
    async fn process_image(&self, _locator: &str, context: &ImageContext) -> ProcessedImage {
        ProcessedImage {
            id: context.image_id(),
            content: self.marker.clone(),
            kind: ProcessedKind::Marker,
            original_data: None,
            metadata: ImageMetadata::from_context(context),
            file_name: None,
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::TextMarker
    }
}

/// Extracts images as sibling files under `images/`
pub struct SeparateFilesStrategy {
    fetcher: Arc<dyn ImageFetcher>,
    max_size: usize,
}

impl SeparateFilesStrategy {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, max_size: usize) -> Self {
        Self { fetcher, max_size }
    }
}

#[async_trait]
impl ImageStrategy for SeparateFilesStrategy {
    async fn process_image(&self, locator: &str, context: &ImageContext) -> ProcessedImage {
        let image = match fetch_checked(self.fetcher.as_ref(), locator, self.max_size).await {
            Ok(image) => image,
            Err(err) => return failed(context, &err),
        };

        let mime = image
            .mime_type
            .unwrap_or_else(|| context.mime_type.clone());
        let file_name = image_file_name(context.author.as_ref(), context.global_index, &mime);
        let mut metadata = ImageMetadata::from_context(context);
        metadata.mime_type = Some(mime);
        metadata.size = Some(image.bytes.len());

        ProcessedImage {
            id: context.image_id(),
            content: image_path(&file_name),
            kind: ProcessedKind::File,
            original_data: Some(STANDARD.encode(&image.bytes)),
            metadata,
            file_name: Some(file_name),
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::SeparateFiles
    }
}
