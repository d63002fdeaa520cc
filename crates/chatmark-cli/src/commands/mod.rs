//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod batch;
pub mod config;
pub mod export;

use anyhow::{Context, Result};
use chatmark_core::config::{FetchConfig, Settings};
use chatmark_core::conversation::{parse_conversations, ParseFailure, ParsedConversation};
use chatmark_core::error::ChatmarkError;
use chatmark_core::image::{HttpFetcher, ImageFetcher, LocalAssetFetcher, StrategyKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Configuration file looked up in the working directory
pub const LOCAL_CONFIG: &str = "chatmark.toml";

/// chatmark - Export ChatGPT conversations to Markdown, HTML and JSON
#[derive(Debug, Parser)]
#[command(name = "chatmark")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export conversations to documents
    Export(export::ExportArgs),

    /// Export many conversations into one archive
    Batch(batch::BatchArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

/// Export format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    /// Markdown with optional front matter
    Markdown,
    /// Standalone HTML page
    Html,
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
}

impl ExportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
            ExportFormat::JsonCompact => "json-compact",
        }
    }
}

/// Image strategy options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ImageStrategy {
    /// Inline data URIs
    Embed,
    /// Placeholder text, nothing is fetched
    TextMarker,
    /// Image files next to the document
    SeparateFiles,
}

impl From<ImageStrategy> for StrategyKind {
    fn from(strategy: ImageStrategy) -> Self {
        match strategy {
            ImageStrategy::Embed => StrategyKind::Embed,
            ImageStrategy::TextMarker => StrategyKind::TextMarker,
            ImageStrategy::SeparateFiles => StrategyKind::SeparateFiles,
        }
    }
}

/// Run the CLI application
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose);

    // Handle color output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Export(args) => export::execute(args, config).await,
        Commands::Batch(args) => batch::execute(args, config).await,
        Commands::Config(cmd) => config::execute(cmd, config),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Platform configuration file (`~/.config/chatmark/config.toml` on Linux)
pub fn global_config_path() -> PathBuf {
    directories::ProjectDirs::from("com", "chatmark", "chatmark")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".chatmark")
                .join("config.toml")
        })
}

/// The configuration file in effect, if any
///
/// An explicit path wins, then `chatmark.toml` in the working directory,
/// then the platform configuration file.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    [PathBuf::from(LOCAL_CONFIG), global_config_path()]
        .into_iter()
        .find(|path| path.exists())
}

/// Load settings, falling back to defaults when no file exists
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match resolve_config_path(explicit) {
        Some(path) => {
            debug!("Using configuration {}", path.display());
            Settings::load(&path).context(format!("Failed to load {}", path.display()))
        }
        None => Ok(Settings::default()),
    }
}

/// HTTP fetcher, behind a local asset directory when one is configured
pub fn build_fetcher(config: &FetchConfig) -> Result<Arc<dyn ImageFetcher>> {
    let http: Arc<dyn ImageFetcher> =
        Arc::new(HttpFetcher::new(config).context("Failed to build HTTP client")?);
    Ok(match &config.assets_dir {
        Some(dir) => Arc::new(LocalAssetFetcher::new(dir).with_fallback(http)),
        None => http,
    })
}

/// Read conversations from a JSON file or every `*.json` file in a directory
///
/// Entries that do not parse come back as failures next to the good ones.
/// An unreadable input file is an error, except inside a directory where it
/// becomes one failure named after the file.
pub fn read_conversations(input: &Path) -> Result<Vec<ParsedConversation>> {
    if !input.is_dir() {
        let json =
            fs::read_to_string(input).context(format!("Failed to read {}", input.display()))?;
        return parse_conversations(&json).context(format!("Failed to parse {}", input.display()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input)
        .context(format!("Failed to read {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut entries = Vec::new();
    for file in files {
        let parsed = fs::read_to_string(&file)
            .map_err(ChatmarkError::from)
            .and_then(|json| parse_conversations(&json));
        match parsed {
            Ok(parsed) => entries.extend(parsed),
            Err(error) => {
                let name = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                entries.push(Err(ParseFailure::new(name.clone(), name, error)));
            }
        }
    }
    Ok(entries)
}
