//! Batch command
//!
//! Export every conversation of a data dump into one zip archive.

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use chatmark_archive::{export_batch, OutputWriter};

use super::export::ExportOptions;
use super::read_conversations;

/// Arguments for the batch command
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Conversation JSON file, or a directory of them
    pub input: PathBuf,

    #[command(flatten)]
    pub options: ExportOptions,

    /// Archive to write
    #[arg(long, short, default_value = "chatmark-export.zip")]
    pub output: PathBuf,
}

/// Execute the batch command
pub async fn execute(args: BatchArgs, config: Option<&Path>) -> Result<()> {
    use colored::Colorize;

    let entries = read_conversations(&args.input)?;
    if entries.is_empty() {
        bail!("No conversations found in {}", args.input.display());
    }
    let (manager, format) = args.options.manager(config)?;

    let archive_name = args
        .output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("Output path must name a file")?;
    let dir = match args.output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let progress = ProgressBar::new(entries.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let (archive, report) = export_batch(&manager, &entries, &format, &archive_name, |title| {
        progress.set_message(title.to_string());
        progress.inc(1);
    })
    .await?;
    progress.finish_and_clear();

    let path = OutputWriter::new(&dir)?
        .write_archive(&archive)
        .context(format!("Failed to write {}", archive.name))?;

    eprintln!(
        "{} Exported {} of {} conversations to {}",
        "✓".green(),
        report.exported.len().to_string().cyan(),
        entries.len(),
        path.display()
    );
    for failure in &report.failures {
        eprintln!(
            "  {} {} ({}): {}",
            "✗".red(),
            failure.title,
            failure.conversation_id.dimmed(),
            failure.reason
        );
    }

    if report.exported.is_empty() {
        bail!("No conversation could be exported");
    }
    Ok(())
}
