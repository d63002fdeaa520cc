//! Value objects shared by extraction, strategies and renderers

use crate::config::ImageSettings;
use crate::types::{Author, FormatVersion, ImageId, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where in the message an image reference was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    /// Image result of a code execution
    ImageUrl,
    /// Multimodal part already carrying a fetchable URL
    MultimodalText,
    /// Multimodal part pointing at an uploaded asset
    ImageAssetPointer,
}

/// One image occurrence in a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ImageContext {
    pub conversation_id: String,
    pub message_id: String,
    /// Position within the owning message
    pub image_index: usize,
    /// Position across the whole conversation
    pub global_index: usize,
    pub mime_type: String,
    pub locator: String,
    pub origin: ContentOrigin,
    pub author: Option<Author>,
    pub timestamp: Option<f64>,
}

impl ImageContext {
    pub fn image_id(&self) -> ImageId {
        ImageId::derive(
            &self.conversation_id,
            &self.message_id,
            self.image_index,
            self.timestamp,
        )
    }

    pub fn role(&self) -> Option<Role> {
        self.author.as_ref().map(|a| a.role)
    }
}

/// An image locator paired with its context
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    pub locator: String,
    pub context: ImageContext,
}

/// How a renderer should treat [`ProcessedImage::content`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedKind {
    /// Self-contained data URI
    DataUri,
    /// Relative path to a sibling file
    File,
    /// Literal marker text
    Marker,
    /// Literal failure text
    Failed,
}

impl ProcessedKind {
    /// Whether `content` should be rendered as an image reference
    pub fn is_reference(&self) -> bool {
        matches!(self, ProcessedKind::DataUri | ProcessedKind::File)
    }
}

/// Descriptive metadata attached to a processed image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub original_url: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<usize>,
    pub timestamp: Option<f64>,
    pub author_role: Option<Role>,
    pub author_name: Option<String>,
}

impl ImageMetadata {
    pub fn from_context(context: &ImageContext) -> Self {
        Self {
            original_url: Some(context.locator.clone()),
            mime_type: Some(context.mime_type.clone()),
            size: None,
            timestamp: context.timestamp,
            author_role: context.role(),
            author_name: context.author.as_ref().and_then(|a| a.name.clone()),
        }
    }
}

/// Result of running one image through the active strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub id: ImageId,
    pub content: String,
    pub kind: ProcessedKind,
    /// Base64 payload
    pub original_data: Option<String>,
    pub metadata: ImageMetadata,
    pub file_name: Option<String>,
}

impl ProcessedImage {
    pub fn is_failed(&self) -> bool {
        self.kind == ProcessedKind::Failed
    }
}

/// A sibling file produced by the file-producing strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub path: String,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Per-image manifest entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub original_url: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    pub message_id: String,
    pub author: Option<String>,
    pub role: Option<Role>,
    pub timestamp: Option<f64>,
}

/// Settings that produced an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub quality: f32,
    pub max_size: usize,
    pub include_metadata: bool,
    pub marker_text: String,
}

impl From<&ImageSettings> for SettingsSnapshot {
    fn from(settings: &ImageSettings) -> Self {
        Self {
            quality: settings.quality,
            max_size: settings.max_size,
            include_metadata: settings.include_metadata,
            marker_text: settings.marker_text.clone(),
        }
    }
}

/// Manifest written next to a multi-file export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub format_version: String,
    pub export_date: DateTime<Utc>,
    pub conversation_title: String,
    pub strategy: String,
    pub total_images: usize,
    pub images: Vec<ImageRecord>,
    pub settings: SettingsSnapshot,
}

impl ExportMetadata {
    pub fn new(strategy: impl Into<String>, images: Vec<ImageRecord>) -> Self {
        Self {
            format_version: FormatVersion::V1_0.to_string(),
            export_date: Utc::now(),
            conversation_title: String::new(),
            strategy: strategy.into(),
            total_images: images.len(),
            images,
            settings: SettingsSnapshot::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.conversation_title = title.into();
        self
    }

    pub fn with_settings(mut self, settings: SettingsSnapshot) -> Self {
        self.settings = settings;
        self
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ImageContext {
        ImageContext {
            conversation_id: "c".to_string(),
            message_id: "m".to_string(),
            image_index: 1,
            global_index: 4,
            mime_type: "image/png".to_string(),
            locator: "https://example.com/a.png".to_string(),
            origin: ContentOrigin::ImageUrl,
            author: Some(Author::named(Role::Tool, "python")),
            timestamp: Some(12.0),
        }
    }

    #[test]
    fn test_metadata_from_context() {
        let meta = ImageMetadata::from_context(&context());
        assert_eq!(meta.original_url.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(meta.author_role, Some(Role::Tool));
        assert_eq!(meta.author_name.as_deref(), Some("python"));
    }

    #[test]
    fn test_image_id_matches_derivation() {
        let ctx = context();
        assert_eq!(ctx.image_id(), ImageId::derive("c", "m", 1, Some(12.0)));
    }

    #[test]
    fn test_kind_reference() {
        assert!(ProcessedKind::DataUri.is_reference());
        assert!(ProcessedKind::File.is_reference());
        assert!(!ProcessedKind::Marker.is_reference());
        assert!(!ProcessedKind::Failed.is_reference());
    }

    #[test]
    fn test_manifest_builder() {
        let manifest = ExportMetadata::new("separate_files", Vec::new())
            .with_title("Plots")
            .with_settings(SettingsSnapshot::from(&ImageSettings::default()));
        assert_eq!(manifest.format_version, "1.0");
        assert_eq!(manifest.conversation_title, "Plots");
        assert_eq!(manifest.settings.marker_text, "[Image Omitted]");

        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"strategy\": \"separate_files\""));
        assert!(json.contains("\"total_images\": 0"));
    }
}
