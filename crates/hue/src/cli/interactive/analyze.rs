//! Guided analysis flows: pick an image (or all), a prompt, then run.

use std::path::PathBuf;

use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use hue_core::{Config, FileDiscovery};

use super::handle_interrupt;
use super::setup::{ensure_api_key, KeyChoice};
use super::theme::hue_theme;
use crate::cli::analyze::setup::provider_name;
use crate::cli::analyze::AnalyzeArgs;

/// Prompt selection: one named prompt or every prompt in turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptChoice {
    One(String),
    All,
}

/// Analyze a single image picked from the image directory or typed in.
pub async fn guided_single(config: &Config, base: &AnalyzeArgs) -> anyhow::Result<()> {
    let theme = hue_theme();
    let image_dir = image_dir(config, base);

    let files = if image_dir.is_dir() {
        FileDiscovery::new(config.images.clone()).discover(&image_dir)
    } else {
        Vec::new()
    };
    let mut items: Vec<String> = files.iter().map(|f| f.display_name(&image_dir)).collect();
    items.push("Enter a path...".to_string());

    let Some(choice) = Select::with_theme(&theme)
        .with_prompt(format!("Image ({})", image_dir.display()))
        .items(&items)
        .default(0)
        .interact_opt()?
    else {
        return Ok(());
    };

    let image = match files.get(choice) {
        Some(file) => file.path.clone(),
        None => {
            let Some(path) = handle_interrupt(
                Input::<String>::with_theme(&theme)
                    .with_prompt("Image path")
                    .interact_text(),
            )?
            else {
                return Ok(());
            };
            PathBuf::from(shellexpand::tilde(path.trim()).into_owned())
        }
    };

    let Some(prompt) = select_prompt(config, &theme)? else {
        return Ok(());
    };

    let args = AnalyzeArgs {
        image: Some(image),
        all: false,
        ..with_prompt(base, prompt)
    };
    let Some(args) = with_api_key(config, args)? else {
        return Ok(());
    };

    crate::cli::analyze::execute(args, config.clone()).await
}

/// Analyze every image in the image directory with one or all prompts.
pub async fn guided_batch(config: &Config, base: &AnalyzeArgs) -> anyhow::Result<()> {
    let theme = hue_theme();
    let bold = Style::new().for_stderr().bold();
    let dim = Style::new().for_stderr().dim();
    let image_dir = image_dir(config, base);

    if !image_dir.is_dir() {
        anyhow::bail!("Image directory does not exist: {}", image_dir.display());
    }
    let files = FileDiscovery::new(config.images.clone()).resolve(&config.images.files, &image_dir);
    if files.is_empty() {
        eprintln!(
            "  No supported images in {}",
            dim.apply_to(image_dir.display())
        );
        return Ok(());
    }

    let Some(prompt) = select_prompt(config, &theme)? else {
        return Ok(());
    };

    let Some(output) = handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Output file name (empty for the default)")
            .allow_empty(true)
            .interact_text(),
    )?
    else {
        return Ok(());
    };
    let output = Some(output.trim())
        .filter(|o| !o.is_empty())
        .map(|o| PathBuf::from(shellexpand::tilde(o).into_owned()));

    let prompt_label = match &prompt {
        PromptChoice::One(name) => name.clone(),
        PromptChoice::All => format!("all {} prompts", config.available_prompts().len()),
    };
    eprintln!();
    eprintln!(
        "  {}",
        bold.apply_to(format!("Ready to analyze {} image(s)", files.len()))
    );
    eprintln!(
        "  {}",
        dim.apply_to(format!(
            "Prompt: {prompt_label} | Provider: {} | Parallel: {}",
            provider_name(base, config),
            base.parallel.unwrap_or(config.api.parallel)
        ))
    );
    eprintln!();

    let confirm = Confirm::with_theme(&theme)
        .with_prompt("Start?")
        .default(true)
        .interact_opt()?;
    if !matches!(confirm, Some(true)) {
        return Ok(());
    }

    let args = AnalyzeArgs {
        all: true,
        image: None,
        output,
        ..with_prompt(base, prompt)
    };
    let Some(args) = with_api_key(config, args)? else {
        return Ok(());
    };

    crate::cli::analyze::execute(args, config.clone()).await
}

fn image_dir(config: &Config, base: &AnalyzeArgs) -> PathBuf {
    match &base.image_dir {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned()),
        None => config.image_dir(),
    }
}

/// Choose a prompt; the configured default is preselected.
fn select_prompt(config: &Config, theme: &ColorfulTheme) -> anyhow::Result<Option<PromptChoice>> {
    let (names, items) = prompt_items(config);
    let default = names
        .iter()
        .position(|n| *n == config.prompts.default)
        .unwrap_or(0);

    let choice = Select::with_theme(theme)
        .with_prompt("Prompt")
        .items(&items)
        .default(default)
        .interact_opt()?;

    Ok(choice.map(|i| match names.get(i) {
        Some(name) => PromptChoice::One(name.clone()),
        None => PromptChoice::All,
    }))
}

/// Prompt names and their menu labels; the last label is "all prompts".
fn prompt_items(config: &Config) -> (Vec<String>, Vec<String>) {
    let names = config.prompt_names();
    let mut items: Vec<String> = config
        .available_prompts()
        .iter()
        .map(|(name, p)| {
            let marker = if *name == config.prompts.default {
                " (default)"
            } else {
                ""
            };
            if p.description.is_empty() {
                format!("{name}{marker}")
            } else {
                format!("{name}{marker} - {}", p.description)
            }
        })
        .collect();
    items.push("All prompts, one after another".to_string());
    (names, items)
}

fn with_prompt(base: &AnalyzeArgs, prompt: PromptChoice) -> AnalyzeArgs {
    match prompt {
        PromptChoice::One(name) => AnalyzeArgs {
            prompt: Some(name),
            multi_prompt: false,
            ..base.clone()
        },
        PromptChoice::All => AnalyzeArgs {
            prompt: None,
            multi_prompt: true,
            ..base.clone()
        },
    }
}

/// Attach a session key when the provider has none configured.
fn with_api_key(config: &Config, args: AnalyzeArgs) -> anyhow::Result<Option<AnalyzeArgs>> {
    if args.api_key.is_some() {
        return Ok(Some(args));
    }
    let provider = provider_name(&args, config);
    Ok(match ensure_api_key(config, &provider)? {
        KeyChoice::Configured => Some(args),
        KeyChoice::Entered(key) => Some(AnalyzeArgs {
            api_key: Some(key),
            ..args
        }),
        KeyChoice::Cancelled => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_items_mark_default_and_end_with_all() {
        let config = Config::default();
        let (names, items) = prompt_items(&config);
        assert_eq!(items.len(), names.len() + 1);
        assert!(items.last().unwrap().starts_with("All prompts"));
        let idx = names
            .iter()
            .position(|n| n == "color_detection_speed")
            .unwrap();
        assert!(items[idx].contains("(default)"));
    }

    #[test]
    fn test_with_prompt() {
        let base = AnalyzeArgs {
            model: Some("gemini-x".into()),
            ..Default::default()
        };
        let one = with_prompt(&base, PromptChoice::One("scene_description".into()));
        assert_eq!(one.prompt.as_deref(), Some("scene_description"));
        assert!(!one.multi_prompt);
        assert_eq!(one.model.as_deref(), Some("gemini-x"));

        let all = with_prompt(&base, PromptChoice::All);
        assert!(all.prompt.is_none());
        assert!(all.multi_prompt);
    }

    #[test]
    fn test_image_dir_prefers_flag() {
        let config = Config::default();
        let base = AnalyzeArgs {
            image_dir: Some(PathBuf::from("/data/pics")),
            ..Default::default()
        };
        assert_eq!(image_dir(&config, &base), PathBuf::from("/data/pics"));
        assert_eq!(image_dir(&config, &AnalyzeArgs::default()), config.image_dir());
    }

    #[test]
    fn test_with_api_key_keeps_existing_session_key() {
        let config = Config::default();
        let args = AnalyzeArgs {
            api_key: Some("k".into()),
            ..Default::default()
        };
        let args = with_api_key(&config, args).unwrap().unwrap();
        assert_eq!(args.api_key.as_deref(), Some("k"));
    }
}
