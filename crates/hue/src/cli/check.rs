//! The `hue check` command: verify the environment before a long run.

use std::path::Path;
use std::time::Duration;

use clap::Args;
use console::Style;
use hue_core::llm::api_key_env_var;
use hue_core::{Config, FileDiscovery, ProviderFactory, ProviderOverrides};

use crate::cli::analyze::ProviderArg;
use crate::cli::interactive::setup::has_key;

/// Arguments for the `check` command.
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Provider to check (defaults to api.provider)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Skip the network reachability check
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pass,
    Warn,
    Fail,
    Skip,
}

#[derive(Debug)]
struct Check {
    label: &'static str,
    status: Status,
    detail: String,
}

impl Check {
    fn new(label: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            label,
            status,
            detail: detail.into(),
        }
    }
}

/// Execute the check command.
pub async fn execute(args: CheckArgs, config: &Config) -> anyhow::Result<()> {
    let provider = args
        .provider
        .map(|p| p.to_string())
        .unwrap_or_else(|| config.api.provider.clone());

    let mut checks = vec![
        check_config(config),
        check_image_dir(config),
        check_results_dir(&config.results_dir()),
        check_api_key(config, &provider),
    ];

    let key_ok = checks.last().is_some_and(|c| c.status == Status::Pass);
    checks.push(if args.offline {
        Check::new("Provider reachable", Status::Skip, "--offline")
    } else if !key_ok {
        Check::new("Provider reachable", Status::Skip, "no API key")
    } else {
        check_provider(config, &provider).await
    });

    print_checks(&checks);

    let failed = checks.iter().filter(|c| c.status == Status::Fail).count();
    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(())
}

fn check_config(config: &Config) -> Check {
    match &config.source {
        Some(path) => Check::new("Configuration", Status::Pass, path.display().to_string()),
        None => Check::new(
            "Configuration",
            Status::Pass,
            format!("defaults (no file at {})", Config::default_path().display()),
        ),
    }
}

fn check_image_dir(config: &Config) -> Check {
    let dir = config.image_dir();
    if !dir.is_dir() {
        return Check::new(
            "Image directory",
            Status::Fail,
            format!("{} does not exist", dir.display()),
        );
    }
    let files = FileDiscovery::new(config.images.clone()).resolve(&config.images.files, &dir);
    let status = if files.is_empty() {
        Status::Warn
    } else {
        Status::Pass
    };
    Check::new(
        "Image directory",
        status,
        format!("{} ({} image(s))", dir.display(), files.len()),
    )
}

fn check_results_dir(dir: &Path) -> Check {
    let marker = dir.join(".hue_write_check");
    let outcome = std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&marker, b"ok"))
        .and_then(|_| std::fs::remove_file(&marker));
    match outcome {
        Ok(()) => Check::new("Results directory", Status::Pass, dir.display().to_string()),
        Err(e) => Check::new(
            "Results directory",
            Status::Fail,
            format!("{} is not writable: {e}", dir.display()),
        ),
    }
}

fn check_api_key(config: &Config, provider: &str) -> Check {
    if !ProviderFactory::PROVIDERS.contains(&provider) {
        return Check::new("API key", Status::Fail, format!("unknown provider '{provider}'"));
    }
    let var = api_key_env_var(provider).unwrap_or("the provider key variable");
    if has_key(config, provider) {
        Check::new("API key", Status::Pass, format!("{provider} key resolved"))
    } else {
        Check::new(
            "API key",
            Status::Fail,
            format!("{provider} key missing (set {var} or provider.{provider}.api_key)"),
        )
    }
}

async fn check_provider(config: &Config, provider: &str) -> Check {
    let overrides = ProviderOverrides {
        timeout: Some(Duration::from_millis(config.api.timeout_ms)),
        ..Default::default()
    };
    match ProviderFactory::create(provider, &config.provider, overrides) {
        Ok(p) => {
            if p.is_available().await {
                Check::new("Provider reachable", Status::Pass, format!("{} / {}", p.name(), p.model()))
            } else {
                Check::new(
                    "Provider reachable",
                    Status::Fail,
                    format!("{} did not answer for model {}", p.name(), p.model()),
                )
            }
        }
        Err(e) => Check::new("Provider reachable", Status::Fail, e.to_string()),
    }
}

fn print_checks(checks: &[Check]) {
    let pass = Style::new().for_stderr().green();
    let warn = Style::new().for_stderr().yellow();
    let fail = Style::new().for_stderr().red();
    let dim = Style::new().for_stderr().dim();

    eprintln!();
    for check in checks {
        let mark = match check.status {
            Status::Pass => pass.apply_to("✓"),
            Status::Warn => warn.apply_to("!"),
            Status::Fail => fail.apply_to("✗"),
            Status::Skip => dim.apply_to("-"),
        };
        eprintln!(
            "  {mark} {:<20} {}",
            check.label,
            dim.apply_to(&check.detail)
        );
    }
    eprintln!();
}
