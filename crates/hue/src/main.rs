//! Hue CLI - send images to vision models with named prompts.
//!
//! Each image is sent to a vision model together with a prompt from the
//! configured set. Answers, HTTP status and request timings are collected
//! into JSON reports that can later be exported to CSV.
//!
//! # Usage
//!
//! ```bash
//! # List the configured prompts
//! hue --list-prompts
//!
//! # Analyze one image with a named prompt
//! hue --image red.jpg --prompt color_description
//!
//! # Analyze every image in the image directory
//! hue --all --output run1.json
//!
//! # Export saved results to CSV
//! hue export --sort natural
//!
//! # Guided mode
//! hue
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hue_core::Config;

mod cli;
mod logging;

/// Hue - vision-model image analysis with named prompts and request timings.
#[derive(Parser, Debug)]
#[command(name = "hue")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "HUE_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    analyze: cli::analyze::AnalyzeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// View and manage configuration
    Config(cli::config::ConfigArgs),

    /// Export saved result files to CSV
    Export(cli::export::ExportArgs),

    /// Check configuration, directories, credentials and provider reachability
    Check(cli::check::CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let lenient = match &cli.command {
        Some(Commands::Config(_)) => true,
        Some(_) => false,
        None => cli.analyze.list_prompts || !cli.analyze.has_action(),
    };
    let config = match Config::load_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if lenient => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `hue config path`."
            );
            Config::default()
        }
        Err(e) => {
            return Err(e).context("Failed to load configuration (see `hue config path`)");
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Hue v{}", hue_core::VERSION);
    if let Some(path) = &config.source {
        tracing::debug!("Configuration loaded from {}", path.display());
    }

    match cli.command {
        Some(Commands::Config(args)) => cli::config::execute(args, cli.config, config).await,
        Some(Commands::Export(args)) => cli::export::execute(args, &config),
        Some(Commands::Check(args)) => cli::check::execute(args, &config).await,
        None if cli.analyze.has_action() => cli::analyze::execute(cli.analyze, config).await,
        None if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() => {
            cli::interactive::run(config, cli.analyze).await
        }
        None => {
            tracing::info!("No action given and not on a terminal, analyzing all images");
            let args = cli::analyze::AnalyzeArgs {
                all: true,
                ..cli.analyze
            };
            cli::analyze::execute(args, config).await
        }
    }
}
