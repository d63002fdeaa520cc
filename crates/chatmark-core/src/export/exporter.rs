//! Exporter trait and manager

use super::filename::{manifest_file_name, render_file_name};
use crate::config::Settings;
use crate::conversation::{is_message_visible, Conversation};
use crate::error::{ChatmarkError, Result};
use crate::image::{
    extract_images, ExportFile, ExportMetadata, ImageBatch, ImageCoordinator, ImageFetcher,
    ProcessedImage, SettingsSnapshot,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Document family an exporter produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Markdown,
    Html,
    Json,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Html => "html",
            DocumentFormat::Json => "json",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an exporter needs to render one conversation
pub struct ExportContext<'a> {
    pub conversation: &'a Conversation,
    /// Processed images in extraction order
    pub images: &'a [ProcessedImage],
    pub settings: &'a Settings,
    pub exported_at: DateTime<Utc>,
}

/// Trait for document exporters
pub trait DocumentExporter: Send + Sync {
    /// Render the conversation to a document string
    fn render(&self, ctx: &ExportContext<'_>) -> Result<String>;

    /// Get the format name
    fn format_name(&self) -> &str;

    /// Get the file extension
    fn file_extension(&self) -> &str;

    fn document_format(&self) -> DocumentFormat;

    /// Whether images are run through the strategy before rendering
    fn uses_images(&self) -> bool {
        true
    }
}

/// Result of exporting one conversation
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub document: String,
    /// Document file name, extension included
    pub file_name: String,
    pub format: String,
    /// Sibling files; empty unless the strategy produces files
    pub files: Vec<ExportFile>,
    pub metadata: Option<ExportMetadata>,
    pub image_count: usize,
    pub failed_images: usize,
}

impl ExportOutput {
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    /// File name of the manifest, when one was produced
    pub fn manifest_name(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .map(|m| manifest_file_name(&m.conversation_title, &m.strategy))
    }
}

/// Manager for handling multiple export formats
pub struct ExportManager {
    exporters: HashMap<String, Box<dyn DocumentExporter>>,
    settings: Settings,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ExportManager {
    /// Create a new export manager with default exporters
    pub fn new(settings: Settings, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let mut manager = Self {
            exporters: HashMap::new(),
            settings,
            fetcher,
        };

        manager.register(Box::new(super::markdown::MarkdownExporter::new()));
        manager.register(Box::new(super::html::HtmlExporter::new()));
        manager.register(Box::new(super::json::JsonExporter::pretty()));
        manager.register(Box::new(super::json::JsonExporter::compact()));

        manager
    }

    /// Register a new exporter
    pub fn register(&mut self, exporter: Box<dyn DocumentExporter>) {
        self.exporters
            .insert(exporter.format_name().to_string(), exporter);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Export a conversation to the specified format
    pub async fn export(&self, conversation: &Conversation, format: &str) -> Result<ExportOutput> {
        self.export_at(conversation, format, Utc::now()).await
    }

    /// Export with an explicit export time
    pub async fn export_at(
        &self,
        conversation: &Conversation,
        format: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<ExportOutput> {
        let exporter = self
            .get(format)
            .ok_or_else(|| ChatmarkError::UnknownFormat(format.to_string()))?;

        if !conversation.messages().any(is_message_visible) {
            return Err(ChatmarkError::EmptyConversation(conversation.title.clone()));
        }

        let batch = if exporter.uses_images() {
            let images = extract_images(conversation);
            debug!("Found {} images in {}", images.len(), conversation.id);
            let coordinator = ImageCoordinator::new(&self.settings.image, self.fetcher.clone())?;
            coordinator
                .process_conversation_images(&images, exporter.document_format())
                .await
        } else {
            ImageBatch::default()
        };

        let ctx = ExportContext {
            conversation,
            images: &batch.processed,
            settings: &self.settings,
            exported_at,
        };
        let document = exporter.render(&ctx)?;
        let file_name = render_file_name(
            &self.settings.export.file_name_template,
            conversation,
            exported_at,
            exporter.file_extension(),
        );

        let image_count = batch.processed.len();
        let failed_images = batch.failed_count();
        let metadata = batch
            .metadata
            .filter(|_| self.settings.image.include_metadata)
            .map(|manifest| {
                manifest
                    .with_title(conversation.title.clone())
                    .with_settings(SettingsSnapshot::from(&self.settings.image))
            });

        info!(
            "Exported '{}' as {} ({} images, {} failed)",
            conversation.title, format, image_count, failed_images
        );

        Ok(ExportOutput {
            document,
            file_name,
            format: format.to_string(),
            files: batch.files.unwrap_or_default(),
            metadata,
            image_count,
            failed_images,
        })
    }

    /// Get list of available format names
    pub fn available_formats(&self) -> Vec<String> {
        let mut formats: Vec<_> = self.exporters.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Check if a format is available
    pub fn has_format(&self, format: &str) -> bool {
        self.exporters.contains_key(format)
    }

    /// Get an exporter by format name
    pub fn get(&self, format: &str) -> Option<&dyn DocumentExporter> {
        self.exporters.get(format).map(|e| e.as_ref())
    }
}
