//! Config command
//!
//! Manage chatmark configuration.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

use chatmark_core::config::Settings;

use super::{global_config_path, load_settings, resolve_config_path, LOCAL_CONFIG};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Show as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Write to the platform configuration directory instead of ./chatmark.toml
        #[arg(long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, config: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show_config(config, json),
        ConfigCommand::Init { global, force } => init_config(config, global, force),
        ConfigCommand::Validate => validate_config(config),
    }
}

fn show_config(config: Option<&Path>, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let settings = load_settings(config)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("{}", "Configuration:".bold().underline());
    match resolve_config_path(config) {
        Some(path) => println!("{}", path.display().to_string().dimmed()),
        None => println!("{}", "(defaults)".dimmed()),
    }
    println!();
    println!("{}", settings.to_toml()?);
    Ok(())
}

fn init_config(config: Option<&Path>, global: bool, force: bool) -> Result<()> {
    use colored::Colorize;

    let path = match config {
        Some(path) => path.to_path_buf(),
        None if global => global_config_path(),
        None => PathBuf::from(LOCAL_CONFIG),
    };

    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }
    }

    let content = format!("# chatmark configuration\n\n{}", Settings::default().to_toml()?);
    fs::write(&path, content).context(format!("Failed to write {}", path.display()))?;

    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

fn validate_config(config: Option<&Path>) -> Result<()> {
    use colored::Colorize;

    let Some(path) = resolve_config_path(config) else {
        println!("{} No configuration file found, defaults are in effect.", "⚠".yellow());
        return Ok(());
    };

    let settings = Settings::load(&path).context(format!("Failed to load {}", path.display()))?;
    match settings.validate() {
        Ok(()) => {
            println!("{} Configuration is valid.", "✓".green());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            bail!("{} is invalid", path.display())
        }
    }
}
