//! Runs every image of a conversation through the active strategy

use super::context::{ExportFile, ExportMetadata, ExtractedImage, ImageRecord, ProcessedImage};
use super::fetch::ImageFetcher;
use super::strategy::{create_strategy, ImageStrategy};
use crate::config::ImageSettings;
use crate::error::Result;
use crate::export::DocumentFormat;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output of processing one conversation's images
#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    /// Same length and order as the extracted list
    pub processed: Vec<ProcessedImage>,
    /// Sibling files, only for the file-producing strategy
    pub files: Option<Vec<ExportFile>>,
    /// Manifest; title and settings are filled in by the caller
    pub metadata: Option<ExportMetadata>,
}

impl ImageBatch {
    pub fn failed_count(&self) -> usize {
        self.processed.iter().filter(|p| p.is_failed()).count()
    }
}

/// Owns the active strategy for one export
pub struct ImageCoordinator {
    strategy: Box<dyn ImageStrategy>,
    max_concurrent: usize,
}

impl ImageCoordinator {
    /// Build the strategy selected in `settings`
    pub fn new(settings: &ImageSettings, fetcher: Arc<dyn ImageFetcher>) -> Result<Self> {
        let strategy = create_strategy(settings.strategy, settings, fetcher)?;
        Ok(Self::with_strategy(strategy, settings.max_concurrent_fetches))
    }

    pub fn with_strategy(strategy: Box<dyn ImageStrategy>, max_concurrent: usize) -> Self {
        Self {
            strategy,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Process all images concurrently and return them in extraction order
    pub async fn process_conversation_images(
        &self,
        images: &[ExtractedImage],
        target_format: DocumentFormat,
    ) -> ImageBatch {
        debug!(
            "Processing {} images with {} for {}",
            images.len(),
            self.strategy.strategy_name(),
            target_format
        );

        let strategy = self.strategy.as_ref();
        let mut indexed: Vec<(usize, ProcessedImage)> = stream::iter(images.iter().enumerate())
            .map(|(index, image)| async move {
                let processed = strategy.process_image(&image.locator, &image.context).await;
                (index, processed)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);
        let processed: Vec<ProcessedImage> = indexed.into_iter().map(|(_, p)| p).collect();

        let mut batch = ImageBatch {
            processed,
            files: None,
            metadata: None,
        };

        if self.strategy.kind().produces_files() {
            let (files, records) = collect_files(images, &batch.processed);
            if !files.is_empty() {
                info!("Extracted {} image files", files.len());
                batch.metadata = Some(ExportMetadata::new(self.strategy.strategy_name(), records));
                batch.files = Some(files);
            }
        }

        let failed = batch.failed_count();
        if failed > 0 {
            warn!("{} of {} images failed to load", failed, images.len());
        }
        batch
    }
}

fn collect_files(
    images: &[ExtractedImage],
    processed: &[ProcessedImage],
) -> (Vec<ExportFile>, Vec<ImageRecord>) {
    let mut files = Vec::new();
    let mut records = Vec::new();

    for (image, result) in images.iter().zip(processed) {
        let (Some(data), Some(file_name)) = (&result.original_data, &result.file_name) else {
            continue;
        };
        let bytes = match STANDARD.decode(data) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Dropping {}: payload does not decode: {}", file_name, err);
                continue;
            }
        };
        let mime_type = result
            .metadata
            .mime_type
            .clone()
            .unwrap_or_else(|| image.context.mime_type.clone());

        records.push(ImageRecord {
            id: result.id.to_string(),
            original_url: result.metadata.original_url.clone(),
            file_name: file_name.clone(),
            mime_type: mime_type.clone(),
            size: bytes.len(),
            message_id: image.context.message_id.clone(),
            author: result.metadata.author_name.clone(),
            role: result.metadata.author_role,
            timestamp: result.metadata.timestamp,
        });
        files.push(ExportFile {
            path: result.content.clone(),
            data: bytes,
            mime_type,
        });
    }

    (files, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::context::ProcessedKind;
    use crate::image::extract_images;
    use crate::image::strategy::{StrategyKind, FAILURE_MARKER};
    use crate::test_support::{ConversationBuilder, MapFetcher};

    fn conversation() -> crate::conversation::Conversation {
        ConversationBuilder::new("conv")
            .user_images(&["https://x.test/0.png"])
            .tool_execution(
                "python",
                "ok",
                &["https://x.test/1.png", "https://x.test/2.png", "https://x.test/3.png"],
            )
            .assistant_text("done")
            .tool_images("dalle", &["https://x.test/4.png"])
            .build()
    }

    fn fetcher() -> MapFetcher {
        // Later images answer sooner, so completion order is reversed.
        MapFetcher::new()
            .with("https://x.test/0.png", b"zero", Some("image/png"))
            .with("https://x.test/1.png", b"one", Some("image/png"))
            .with("https://x.test/3.png", b"three", Some("image/png"))
            .with("https://x.test/4.png", b"four", Some("image/png"))
            .with_delays(&[
                ("https://x.test/0.png", 40),
                ("https://x.test/1.png", 30),
                ("https://x.test/3.png", 10),
            ])
    }

    fn settings(strategy: StrategyKind) -> ImageSettings {
        ImageSettings {
            strategy,
            ..ImageSettings::default()
        }
    }

    #[tokio::test]
    async fn test_order_restored_for_every_strategy() {
        let conversation = conversation();
        let images = extract_images(&conversation);

        for kind in StrategyKind::ALL {
            let coordinator =
                ImageCoordinator::new(&settings(kind), Arc::new(fetcher())).unwrap();
            let batch = coordinator
                .process_conversation_images(&images, DocumentFormat::Markdown)
                .await;

            assert_eq!(batch.processed.len(), images.len());
            for (image, processed) in images.iter().zip(&batch.processed) {
                assert_eq!(processed.id, image.context.image_id());
                assert_eq!(
                    processed.metadata.original_url.as_deref(),
                    Some(image.locator.as_str())
                );
            }
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_its_slot() {
        let conversation = conversation();
        let images = extract_images(&conversation);
        let coordinator =
            ImageCoordinator::new(&settings(StrategyKind::Embed), Arc::new(fetcher())).unwrap();
        let batch = coordinator
            .process_conversation_images(&images, DocumentFormat::Html)
            .await;

        assert_eq!(batch.failed_count(), 1);
        assert_eq!(batch.processed[2].content, FAILURE_MARKER);
        assert_eq!(batch.processed[3].kind, ProcessedKind::DataUri);
        assert!(batch.files.is_none());
        assert!(batch.metadata.is_none());
    }

    #[tokio::test]
    async fn test_separate_files_builds_files_and_manifest() {
        let conversation = conversation();
        let images = extract_images(&conversation);
        let coordinator =
            ImageCoordinator::new(&settings(StrategyKind::SeparateFiles), Arc::new(fetcher()))
                .unwrap();
        let batch = coordinator
            .process_conversation_images(&images, DocumentFormat::Markdown)
            .await;

        let files = batch.files.expect("files");
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "images/user-upload-001.png",
                "images/tool-python-002.png",
                "images/tool-python-004.png",
                "images/tool-dalle-005.png",
            ]
        );
        assert_eq!(files[0].data, b"zero");

        let manifest = batch.metadata.expect("manifest");
        assert_eq!(manifest.strategy, "separate_files");
        assert_eq!(manifest.total_images, 4);
        assert_eq!(manifest.images[1].file_name, "tool-python-002.png");
        assert_eq!(manifest.images[1].size, 3);
        assert!(manifest.conversation_title.is_empty());
    }

    #[tokio::test]
    async fn test_separate_files_without_successes_has_no_manifest() {
        let conversation = conversation();
        let images = extract_images(&conversation);
        let coordinator = ImageCoordinator::new(
            &settings(StrategyKind::SeparateFiles),
            Arc::new(MapFetcher::new()),
        )
        .unwrap();
        let batch = coordinator
            .process_conversation_images(&images, DocumentFormat::Markdown)
            .await;

        assert_eq!(batch.processed.len(), 5);
        assert!(batch.processed.iter().all(|p| p.is_failed()));
        assert!(batch.files.is_none());
        assert!(batch.metadata.is_none());
    }

    #[tokio::test]
    async fn test_text_marker_never_fetches() {
        let conversation = conversation();
        let images = extract_images(&conversation);
        let fetcher = Arc::new(MapFetcher::new());
        let coordinator =
            ImageCoordinator::new(&settings(StrategyKind::TextMarker), fetcher.clone()).unwrap();
        let batch = coordinator
            .process_conversation_images(&images, DocumentFormat::Markdown)
            .await;

        assert_eq!(fetcher.calls(), 0);
        assert!(batch
            .processed
            .iter()
            .all(|p| p.content == "[Image Omitted]"));
    }
}
