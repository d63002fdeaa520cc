//! Export functionality for conversations
//!
//! This module turns a conversation into a document: Markdown, a
//! standalone HTML page, or JSON.
//!
//! # Overview
//!
//! Export functionality supports:
//! - Markdown with optional front matter and footnotes
//! - HTML from a fixed page template
//! - JSON format (compact and pretty-printed)
//!
//! Markdown and HTML run the conversation's images through the configured
//! strategy first; the JSON formats leave image references untouched.
//!
//! # Example
//!
//! ```ignore
//! use chatmark_core::export::ExportManager;
//!
//! let manager = ExportManager::new(settings, fetcher);
//! let output = manager.export(&conversation, "markdown").await?;
//! std::fs::write(&output.file_name, output.document)?;
//! ```

mod exporter;
mod filename;
mod html;
mod json;
mod markdown;
mod template;

pub use exporter::{DocumentExporter, DocumentFormat, ExportContext, ExportManager, ExportOutput};
pub use filename::{
    manifest_file_name, render_file_name, sanitize_title, split_extension, UniqueNames,
    MAX_NAME_BYTES,
};
pub use html::HtmlExporter;
pub use json::{JsonDocument, JsonExporter};
pub use markdown::MarkdownExporter;
pub use template::{fill_page, model_name, TemplateValues};
