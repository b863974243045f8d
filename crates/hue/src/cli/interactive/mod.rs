//! Interactive mode: a guided menu for bare `hue` invocation on a terminal.
//!
//! Every flow collects its choices into the same argument structs the flag
//! CLI uses and then hands off to the regular command code.

pub mod analyze;
pub mod export;
pub mod setup;
pub mod theme;

use console::Style;
use dialoguer::Select;
use hue_core::Config;

use crate::cli::analyze::AnalyzeArgs;

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Main menu options.
const MENU_ITEMS: &[&str] = &[
    "Analyze one image",
    "Analyze all images",
    "List prompts",
    "Export results to CSV",
    "Show configuration",
    "Exit",
];

/// Entry point for interactive mode.
///
/// `base` carries modifier flags given alongside the bare invocation
/// (provider, model, image directory, ...); each flow starts from them.
pub async fn run(config: Config, base: AnalyzeArgs) -> anyhow::Result<()> {
    theme::print_banner();
    let theme = theme::hue_theme();
    let err = Style::new().for_stderr().red();

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        let outcome = match selection {
            Some(0) => analyze::guided_single(&config, &base).await,
            Some(1) => analyze::guided_batch(&config, &base).await,
            Some(2) => {
                crate::cli::analyze::print_prompts(&config);
                Ok(())
            }
            Some(3) => export::guided_export(&config),
            Some(4) => show_config(&config),
            _ => break,
        };

        // A failed flow returns to the menu instead of ending the session.
        if let Err(e) = outcome {
            eprintln!();
            eprintln!("  {} {e:#}", err.apply_to("✗"));
            eprintln!();
        }
    }

    Ok(())
}

/// Summary of the effective settings, with the full TOML on request.
fn show_config(config: &Config) -> anyhow::Result<()> {
    let theme = theme::hue_theme();
    let dim = Style::new().for_stderr().dim();
    let accent = Style::new().for_stderr().magenta();
    let label = Style::new().for_stderr().bold();
    let config_path = config.source.clone().unwrap_or_else(Config::default_path);

    loop {
        eprintln!();
        eprintln!("  {}", accent.apply_to("Current configuration:"));
        eprintln!();

        let path_note = if config.source.is_some() {
            "(loaded)"
        } else {
            "(using defaults)"
        };
        let rows = summary_rows(config);
        eprintln!(
            "    {:<20} {} {}",
            label.apply_to("Config file:"),
            config_path.display(),
            dim.apply_to(path_note)
        );
        for (name, value) in &rows {
            eprintln!("    {:<20} {}", label.apply_to(name), value);
        }
        eprintln!();

        let items = &["View full config (TOML)", "Show config file path", "Back"];
        let selection = Select::with_theme(&theme)
            .with_prompt("Configuration")
            .items(items)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => {
                let toml = config.to_toml()?;
                eprintln!();
                eprintln!("{}", dim.apply_to("─".repeat(50)));
                eprintln!("{toml}");
                eprintln!("{}", dim.apply_to("─".repeat(50)));
                eprintln!();
            }
            Some(1) => {
                eprintln!();
                eprintln!("  {}", config_path.display());
                eprintln!();
            }
            _ => break,
        }
    }

    Ok(())
}

/// Label/value pairs for the configuration summary.
fn summary_rows(config: &Config) -> Vec<(&'static str, String)> {
    let provider = config.api.provider.as_str();
    let model = match provider {
        "openai" => config.provider.openai.model.as_str(),
        _ => config.provider.gemini.model.as_str(),
    };
    let key_state = if setup::has_key(config, provider) {
        "key set"
    } else {
        "no key"
    };

    vec![
        (
            "Provider:",
            format!("{} ({model}, {key_state})", setup::provider_label(provider)),
        ),
        ("Image dir:", config.image_dir().display().to_string()),
        ("Results dir:", config.results_dir().display().to_string()),
        (
            "Prompts:",
            format!(
                "{} available, default '{}'",
                config.available_prompts().len(),
                config.prompts.default
            ),
        ),
        (
            "Requests:",
            format!(
                "{} in parallel, {} ms pacing, {} retries",
                config.api.parallel, config.performance.request_delay_ms, config.api.max_retries
            ),
        ),
        (
            "Timing:",
            if config.performance.enable_timing {
                config.performance.timing_mode.clone()
            } else {
                "disabled".to_string()
            },
        ),
        ("Log level:", config.logging.level.clone()),
    ]
}
