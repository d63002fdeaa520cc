//! Export command
//!
//! Export conversations to Markdown, HTML or JSON documents.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};

use chatmark_archive::{OutputLayout, OutputWriter};
use chatmark_core::config::Settings;
use chatmark_core::conversation::ParsedConversation;
use chatmark_core::export::{split_extension, ExportManager, ExportOutput, UniqueNames};

use super::{build_fetcher, load_settings, read_conversations, ExportFormat, ImageStrategy};

/// Layout options for exports with image files
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Layout {
    /// One zip archive per conversation
    Archive,
    /// Document, images and manifest in the output directory
    Directory,
}

impl From<Layout> for OutputLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Archive => OutputLayout::Archive,
            Layout::Directory => OutputLayout::Directory,
        }
    }
}

/// Options shared by the export and batch commands
#[derive(Debug, Args)]
pub struct ExportOptions {
    /// Export format (defaults to `export.format` from the configuration)
    #[arg(long, short, value_enum)]
    pub format: Option<ExportFormat>,

    /// Image strategy (defaults to `image.strategy` from the configuration)
    #[arg(long, short, value_enum)]
    pub strategy: Option<ImageStrategy>,

    /// Directory holding asset files from a data export
    #[arg(long)]
    pub assets_dir: Option<PathBuf>,
}

impl ExportOptions {
    /// Load settings, apply overrides and build the export manager
    ///
    /// Returns the manager and the format name to export with.
    pub fn manager(&self, config: Option<&Path>) -> Result<(ExportManager, String)> {
        let mut settings = load_settings(config)?;
        let format = self.apply(&mut settings);
        settings.validate().context("Invalid configuration")?;

        let fetcher = build_fetcher(&settings.fetch)?;
        let manager = ExportManager::new(settings, fetcher);
        if !manager.has_format(&format) {
            bail!(
                "Unknown format '{}' (available: {})",
                format,
                manager.available_formats().join(", ")
            );
        }
        Ok((manager, format))
    }

    fn apply(&self, settings: &mut Settings) -> String {
        if let Some(strategy) = self.strategy {
            settings.image.strategy = strategy.into();
        }
        if let Some(dir) = &self.assets_dir {
            settings.fetch.assets_dir = Some(dir.clone());
        }
        match self.format {
            Some(format) => format.name().to_string(),
            None => settings.export.format.clone(),
        }
    }
}

/// Arguments for the export command
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Conversation JSON file, or a directory of them
    pub input: PathBuf,

    #[command(flatten)]
    pub options: ExportOptions,

    /// Only export the conversation with this id
    #[arg(long)]
    pub id: Option<String>,

    /// Output directory
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,

    /// Write the document to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,

    /// Layout for exports that carry image files
    #[arg(long, value_enum, default_value = "archive")]
    pub layout: Layout,
}

/// Execute the export command
///
/// Every conversation gets a file name unique within the run. A
/// conversation that fails to parse or export is reported and the rest
/// are still written.
pub async fn execute(args: ExportArgs, config: Option<&Path>) -> Result<()> {
    use colored::Colorize;

    let mut entries = read_conversations(&args.input)?;
    if let Some(id) = &args.id {
        entries.retain(|entry| entry_id(entry) == id.as_str());
        if entries.is_empty() {
            bail!("Conversation '{}' not found in {}", id, args.input.display());
        }
    }
    if entries.is_empty() {
        bail!("No conversations found in {}", args.input.display());
    }

    let (manager, format) = args.options.manager(config)?;

    if args.stdout {
        if entries.len() > 1 {
            bail!(
                "{} conversations found; use --id to pick one for --stdout",
                entries.len()
            );
        }
        let conversation = match &entries[0] {
            Ok(conversation) => conversation,
            Err(failure) => bail!("Failed to parse '{}': {}", failure.title, failure.error),
        };
        let output = manager
            .export(conversation, &format)
            .await
            .context(format!("Failed to export '{}'", conversation.title))?;
        if output.has_files() {
            bail!("This export produces image files; write it to a directory instead of stdout");
        }
        std::io::stdout()
            .write_all(output.document.as_bytes())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    let layout: OutputLayout = args.layout.into();
    let writer = OutputWriter::new(&args.output)?.with_layout(layout);
    let mut names = UniqueNames::new();
    let mut exported = 0;
    for entry in &entries {
        let conversation = match entry {
            Ok(conversation) => conversation,
            Err(failure) => {
                report_failure(&failure.title, &failure.label, &failure.error.to_string());
                continue;
            }
        };

        let written = match manager.export(conversation, &format).await {
            Ok(mut output) => {
                output.file_name = names.allocate(&output.file_name);
                write(&writer, &output, layout, entries.len() > 1).map(|path| (output, path))
            }
            Err(err) => Err(err.into()),
        };
        match written {
            Ok((output, path)) => {
                exported += 1;
                report(&output, &path);
            }
            Err(err) => {
                report_failure(&conversation.title, &conversation.id, &format!("{:#}", err));
            }
        }
    }

    eprintln!(
        "Exported {} of {} conversation(s) as {}",
        exported.to_string().cyan(),
        entries.len(),
        format.cyan()
    );
    if exported == 0 {
        bail!("No conversation could be exported");
    }
    Ok(())
}

fn entry_id(entry: &ParsedConversation) -> &str {
    match entry {
        Ok(conversation) => &conversation.id,
        Err(failure) => &failure.label,
    }
}

/// Write one export; with several conversations a directory layout export
/// that carries image files goes into a folder named after its document
fn write(
    writer: &OutputWriter,
    output: &ExportOutput,
    layout: OutputLayout,
    shared: bool,
) -> Result<PathBuf> {
    let path = if shared && layout == OutputLayout::Directory && output.has_files() {
        let (stem, _) = split_extension(&output.file_name);
        OutputWriter::new(writer.dir().join(stem))?
            .with_layout(layout)
            .write_output(output)
    } else {
        writer.write_output(output)
    };
    path.context(format!("Failed to write {}", output.file_name))
}

fn report_failure(title: &str, id: &str, reason: &str) {
    use colored::Colorize;

    eprintln!("{} {} ({}): {}", "✗".red(), title, id.dimmed(), reason);
}

fn report(output: &ExportOutput, path: &Path) {
    use colored::Colorize;

    eprintln!("{} {}", "✓".green(), path.display());
    if output.failed_images > 0 {
        eprintln!(
            "  {} {} of {} images could not be loaded",
            "⚠".yellow(),
            output.failed_images.to_string().yellow(),
            output.image_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmark_core::image::StrategyKind;

    fn options(format: Option<ExportFormat>, strategy: Option<ImageStrategy>) -> ExportOptions {
        ExportOptions {
            format,
            strategy,
            assets_dir: Some(PathBuf::from("assets")),
        }
    }

    #[test]
    fn test_layout_values() {
        assert!(Layout::from_str("archive", true).is_ok());
        assert!(Layout::from_str("directory", true).is_ok());
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let mut settings = Settings::default();
        let format = options(Some(ExportFormat::Html), Some(ImageStrategy::SeparateFiles))
            .apply(&mut settings);

        assert_eq!(format, "html");
        assert_eq!(settings.image.strategy, StrategyKind::SeparateFiles);
        assert_eq!(settings.fetch.assets_dir, Some(PathBuf::from("assets")));
    }

    #[test]
    fn test_format_falls_back_to_configuration() {
        let mut settings = Settings::default();
        settings.export.format = "json".to_string();
        assert_eq!(options(None, None).apply(&mut settings), "json");
        assert_eq!(settings.image.strategy, StrategyKind::Embed);
    }
}
