//! Writing exports to disk

use crate::packager::{Archive, ExportPackager};
use chatmark_core::error::{ChatmarkError, Result};
use chatmark_core::export::ExportOutput;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How exports with sibling files are laid out on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputLayout {
    /// One zip archive per export
    #[default]
    Archive,
    /// Document, `images/` and manifest written into the output directory
    Directory,
}

/// Writes documents and archives into an output directory
pub struct OutputWriter {
    dir: PathBuf,
    layout: OutputLayout,
}

impl OutputWriter {
    /// Create a writer, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let writer = Self {
            dir: dir.into(),
            layout: OutputLayout::default(),
        };
        ensure_dir(&writer.dir)?;
        Ok(writer)
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` to `name` below the output directory
    pub fn write_bytes(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let final_path = self.dir.join(name);
        if let Some(parent) = final_path.parent() {
            ensure_dir(parent)?;
        }
        atomic_write(&final_path, data)?;
        debug!("Wrote {} bytes to {:?}", data.len(), final_path);
        Ok(final_path)
    }

    pub fn write_archive(&self, archive: &Archive) -> Result<PathBuf> {
        self.write_bytes(&archive.name, &archive.bytes)
    }

    /// Write one export; returns the path of the primary file written
    ///
    /// A single-file export is written as its document. An export with
    /// sibling files follows the writer's layout.
    pub fn write_output(&self, output: &ExportOutput) -> Result<PathBuf> {
        if !output.has_files() {
            return self.write_bytes(&output.file_name, output.document.as_bytes());
        }

        match self.layout {
            OutputLayout::Archive => {
                let archive = ExportPackager::new().package(output)?;
                self.write_archive(&archive)
            }
            OutputLayout::Directory => {
                let document = self.write_bytes(&output.file_name, output.document.as_bytes())?;
                for file in &output.files {
                    self.write_bytes(&file.path, &file.data)?;
                }
                if let (Some(manifest), Some(name)) = (&output.metadata, output.manifest_name()) {
                    self.write_bytes(&name, manifest.to_json()?.as_bytes())?;
                }
                Ok(document)
            }
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            ChatmarkError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create output directory: {}", e),
            ))
        })?;
        debug!("Created output directory: {:?}", dir);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write to a temp file, then rename over the target
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let temp = temp_path(path);

    let file = fs::File::create(&temp).map_err(|e| {
        ChatmarkError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create temp file: {}", e),
        ))
    })?;
    let mut writer = BufWriter::new(file);
    let written = writer.write_all(data).and_then(|_| writer.flush());
    drop(writer);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        ChatmarkError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to rename temp file: {}", e),
        ))
    })?;
    Ok(())
}
