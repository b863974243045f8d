//! The `hue config` command for configuration management.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use hue_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show the config file path
    Path,

    /// Write a config file with the defaults
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
///
/// `explicit` is the `--config` path when one was given; it takes the place
/// of the platform default for `path` and `init`.
pub async fn execute(args: ConfigArgs, explicit: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    let path = explicit.unwrap_or_else(Config::default_path);

    match args.command {
        ConfigCommand::Show => {
            match &config.source {
                Some(source) => eprintln!("# Loaded from {}", source.display()),
                None => eprintln!("# No config file at {}; showing defaults", path.display()),
            }
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            init_config(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}
