//! Image extraction and materialization
//!
//! An export discovers every image in conversation order
//! ([`extract_images`]), runs them through one [`ImageStrategy`] via the
//! [`ImageCoordinator`], and hands the processed list to the renderers,
//! which index into it with the same counting rule.
//!
//! # Example
//!
//! ```ignore
//! use chatmark_core::image::{extract_images, HttpFetcher, ImageCoordinator};
//!
//! let fetcher = Arc::new(HttpFetcher::new(&settings.fetch)?);
//! let coordinator = ImageCoordinator::new(&settings.image, fetcher)?;
//! let batch = coordinator
//!     .process_conversation_images(&extract_images(&conversation), DocumentFormat::Markdown)
//!     .await;
//! ```

mod context;
mod coordinator;
mod extractor;
mod fetch;
mod naming;
mod strategy;

pub use context::{
    ContentOrigin, ExportFile, ExportMetadata, ExtractedImage, ImageContext, ImageMetadata,
    ImageRecord, ProcessedImage, ProcessedKind, SettingsSnapshot,
};
pub use coordinator::{ImageBatch, ImageCoordinator};
pub use extractor::{extract_images, image_offsets, message_image_count, message_image_locators};
pub use fetch::{asset_id, decode_data_uri, FetchedImage, HttpFetcher, ImageFetcher, LocalAssetFetcher};
pub use naming::{extension_for, image_file_name, image_path, infer_mime, role_prefix, IMAGE_DIR, PLACEHOLDER_MIME};
pub use strategy::{
    create_strategy, EmbedStrategy, ImageStrategy, SeparateFilesStrategy, StrategyKind,
    TextMarkerStrategy, FAILURE_MARKER,
};
