//! Zip packaging of exports

use chatmark_core::conversation::ParsedConversation;
use chatmark_core::error::{ChatmarkError, Result};
use chatmark_core::export::{split_extension, ExportManager, ExportOutput, UniqueNames};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A finished archive held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub name: String,
    pub bytes: Vec<u8>,
}

fn archive_error(err: zip::result::ZipError) -> ChatmarkError {
    ChatmarkError::Archive(err.to_string())
}

/// Builds a zip archive entry by entry
struct ZipBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ZipBuilder {
    fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        }
    }

    fn add(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, self.options)
            .map_err(archive_error)?;
        self.writer.write_all(data)?;
        self.entries += 1;
        debug!("Added {} ({} bytes)", name, data.len());
        Ok(())
    }

    /// Document, sibling files and manifest, all below `prefix`
    fn add_output(
        &mut self,
        prefix: &str,
        document_name: &str,
        output: &ExportOutput,
        manifest: Option<&(String, String)>,
    ) -> Result<()> {
        self.add(&format!("{}{}", prefix, document_name), output.document.as_bytes())?;
        for file in &output.files {
            self.add(&format!("{}{}", prefix, file.path), &file.data)?;
        }
        if let Some((name, json)) = manifest {
            self.add(&format!("{}{}", prefix, name), json.as_bytes())?;
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.writer.finish().map_err(archive_error)?;
        Ok(cursor.into_inner())
    }
}

/// Serialize the manifest and check entry paths before anything is written
///
/// Returns the manifest file name and content, when the export has one.
fn prepare(output: &ExportOutput) -> Result<Option<(String, String)>> {
    let manifest = match (&output.metadata, output.manifest_name()) {
        (Some(manifest), Some(name)) => Some((name, manifest.to_json()?)),
        _ => None,
    };

    let mut seen = HashSet::new();
    let paths = std::iter::once(output.file_name.as_str())
        .chain(output.files.iter().map(|file| file.path.as_str()))
        .chain(manifest.iter().map(|(name, _)| name.as_str()));
    for path in paths {
        if !seen.insert(path) {
            return Err(ChatmarkError::Archive(format!("duplicate entry {}", path)));
        }
    }
    Ok(manifest)
}

/// Packages one export into a zip archive
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportPackager;

impl ExportPackager {
    pub fn new() -> Self {
        Self
    }

    /// Archive named `<document stem>.zip` holding the document, its
    /// `images/` directory and the manifest
    pub fn package(&self, output: &ExportOutput) -> Result<Archive> {
        let manifest = prepare(output)?;
        let mut zip = ZipBuilder::new();
        zip.add_output("", &output.file_name, output, manifest.as_ref())?;
        let entries = zip.entries;
        let bytes = zip.finish()?;

        let (stem, _) = split_extension(&output.file_name);
        let name = format!("{}.zip", stem);
        info!("Packaged {} entries into {}", entries, name);
        Ok(Archive { name, bytes })
    }
}

/// A conversation that could not be exported
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub conversation_id: String,
    pub title: String,
    pub reason: String,
}

/// Outcome of a batch export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Archive paths of the exported documents, in input order
    pub exported: Vec<String>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Collects many exports into one archive
///
/// Document names are de-duplicated across the batch. An export with
/// sibling files goes into a folder named after its document stem.
pub struct BatchPackager {
    zip: ZipBuilder,
    names: UniqueNames,
    report: BatchReport,
}

impl BatchPackager {
    pub fn new() -> Self {
        Self {
            zip: ZipBuilder::new(),
            names: UniqueNames::new(),
            report: BatchReport::default(),
        }
    }

    /// Add one export; returns the archive path of its document
    ///
    /// The export is checked before its name is taken or anything is
    /// written, so a rejected export leaves no entries behind. A failure of
    /// the zip writer itself can still leave the entries written so far.
    pub fn add(&mut self, output: &ExportOutput) -> Result<String> {
        let manifest = prepare(output)?;
        let document_name = self.names.allocate(&output.file_name);
        let path = if output.has_files() {
            let (stem, _) = split_extension(&document_name);
            let prefix = format!("{}/", stem);
            self.zip.add_output(&prefix, &document_name, output, manifest.as_ref())?;
            format!("{}{}", prefix, document_name)
        } else {
            self.zip.add(&document_name, output.document.as_bytes())?;
            document_name
        };
        self.report.exported.push(path.clone());
        Ok(path)
    }

    pub fn record_failure(
        &mut self,
        conversation_id: impl Into<String>,
        title: impl Into<String>,
        reason: impl Into<String>,
    ) {
        let failure = BatchFailure {
            conversation_id: conversation_id.into(),
            title: title.into(),
            reason: reason.into(),
        };
        warn!("Skipping '{}': {}", failure.title, failure.reason);
        self.report.failures.push(failure);
    }

    pub fn finish(self, name: &str) -> Result<(Archive, BatchReport)> {
        let bytes = self.zip.finish()?;
        info!(
            "Batch archive {}: {} exported, {} failed",
            name,
            self.report.exported.len(),
            self.report.failures.len()
        );
        Ok((
            Archive {
                name: name.to_string(),
                bytes,
            },
            self.report,
        ))
    }
}

impl Default for BatchPackager {
    fn default() -> Self {
        Self::new()
    }
}

/// Export every parsed entry into one archive
///
/// Entries that failed to parse and conversations that fail to export are
/// recorded in the report and the batch goes on. `progress` is called with
/// each entry's title after it is handled.
pub async fn export_batch(
    manager: &ExportManager,
    entries: &[ParsedConversation],
    format: &str,
    archive_name: &str,
    mut progress: impl FnMut(&str),
) -> Result<(Archive, BatchReport)> {
    if !manager.has_format(format) {
        return Err(ChatmarkError::UnknownFormat(format.to_string()));
    }

    let mut packager = BatchPackager::new();
    for entry in entries {
        let conversation = match entry {
            Ok(conversation) => conversation,
            Err(failure) => {
                packager.record_failure(&failure.label, &failure.title, failure.error.to_string());
                progress(&failure.title);
                continue;
            }
        };
        let exported = match manager.export(conversation, format).await {
            Ok(output) => packager.add(&output).map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = exported {
            packager.record_failure(&conversation.id, &conversation.title, err.to_string());
        }
        progress(&conversation.title);
    }
    packager.finish(archive_name)
}
