//! Configuration management for chatmark

use crate::error::{ChatmarkError, Result};
use crate::image::StrategyKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Export settings
    pub export: ExportConfig,
    /// Image materialization settings
    pub image: ImageSettings,
    /// Timestamp display settings
    pub timestamp: TimestampSettings,
    /// Document metadata settings
    pub metadata: MetadataSettings,
    /// HTML page settings
    pub html: HtmlConfig,
    /// Image fetching settings
    pub fetch: FetchConfig,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ChatmarkError::Io(e).with_context(format!("Failed to read {}", path.display()))
        })?;
        let settings: Settings = toml::from_str(&content)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges and cross-field requirements
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.image.quality) {
            return Err(ChatmarkError::Config(format!(
                "image.quality must be between 0 and 1, got {}",
                self.image.quality
            )));
        }
        if self.image.strategy == StrategyKind::TextMarker && self.image.marker_text.trim().is_empty()
        {
            return Err(ChatmarkError::Config(
                "image.marker_text must not be empty for the text_marker strategy".to_string(),
            ));
        }
        if self.image.max_concurrent_fetches == 0 {
            return Err(ChatmarkError::Config(
                "image.max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.export.file_name_template.trim().is_empty() {
            return Err(ChatmarkError::Config(
                "export.file_name_template must not be empty".to_string(),
            ));
        }
        for field in &self.metadata.fields {
            if field.name.trim().is_empty() {
                return Err(ChatmarkError::Config(
                    "metadata fields need a name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Export-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default export format
    pub format: String,
    /// File name template (`{title}`, `{chat_id}`, `{create_time}`, `{update_time}`, `{timestamp}`, `{ext}`)
    pub file_name_template: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "markdown".to_string(),
            file_name_template: "ChatGPT-{title}".to_string(),
        }
    }
}

/// Image strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Active strategy
    pub strategy: StrategyKind,
    /// Text used by the text marker strategy
    pub marker_text: String,
    /// Encoding quality hint (0.0 - 1.0), recorded in the manifest
    pub quality: f32,
    /// Maximum accepted payload in bytes (0 = unlimited)
    pub max_size: usize,
    /// Whether the manifest is written for file exports
    pub include_metadata: bool,
    /// Upper bound on concurrent fetches per conversation
    pub max_concurrent_fetches: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Embed,
            marker_text: "[Image Omitted]".to_string(),
            quality: 0.92,
            max_size: 0,
            include_metadata: true,
            max_concurrent_fetches: 8,
        }
    }
}

/// Timestamp display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampSettings {
    /// Show message timestamps at all
    pub enabled: bool,
    /// 24-hour clock instead of AM/PM
    pub use_24h: bool,
    /// Show timestamps in Markdown output
    pub markdown: bool,
    /// Show timestamps in HTML output
    pub html: bool,
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            use_24h: true,
            markdown: true,
            html: true,
        }
    }
}

impl TimestampSettings {
    /// strftime pattern for the configured clock
    pub fn pattern(&self) -> &'static str {
        if self.use_24h {
            "%Y-%m-%d %H:%M:%S"
        } else {
            "%Y-%m-%d %I:%M:%S %p"
        }
    }
}

/// One `name: value` front-matter line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}

impl MetadataField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Document metadata configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Emit the metadata block
    pub enabled: bool,
    /// Field templates
    pub fields: Vec<MetadataField>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            fields: vec![
                MetadataField::new("title", "{title}"),
                MetadataField::new("date", "{date}"),
                MetadataField::new("source", "{source}"),
            ],
        }
    }
}

/// HTML color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

/// HTML page configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    /// Value of the `lang` attribute
    pub lang: String,
    /// Color theme
    pub theme: Theme,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            theme: Theme::System,
        }
    }
}

/// Image fetching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Base URL that asset pointers are resolved against
    pub asset_base_url: Option<String>,
    /// Local directory holding exported asset files
    pub assets_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            asset_base_url: None,
            assets_dir: None,
        }
    }
}
