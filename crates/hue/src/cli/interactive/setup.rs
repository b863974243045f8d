//! Provider API key setup: detection, entry, and optional persistence.

use std::path::Path;

use console::Style;
use dialoguer::{Password, Select};
use hue_core::llm::{api_key_env_var, resolve_env_var};
use hue_core::Config;

use super::theme::hue_theme;

/// Outcome of the key check.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyChoice {
    /// A key already resolves from the config or the environment
    Configured,
    /// Key typed in this session
    Entered(String),
    /// The user backed out
    Cancelled,
}

/// Make sure `provider` has an API key, asking for one when none resolves.
pub fn ensure_api_key(config: &Config, provider: &str) -> anyhow::Result<KeyChoice> {
    let theme = hue_theme();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();
    let env_var = api_key_env_var(provider).unwrap_or("the provider key variable");

    if has_key(config, provider) {
        eprintln!(
            "  {}",
            dim.apply_to(format!("Using {} API key from {env_var} / config", provider_label(provider)))
        );
        return Ok(KeyChoice::Configured);
    }

    eprintln!("  {}", warn.apply_to(format!("{env_var} not set.")));

    let key = match Password::with_theme(&theme)
        .with_prompt(format!(
            "Enter your {} API key (empty to cancel)",
            provider_label(provider)
        ))
        .allow_empty_password(true)
        .interact()
    {
        Ok(k) if !k.trim().is_empty() => k.trim().to_string(),
        _ => return Ok(KeyChoice::Cancelled),
    };

    let save_options = &["Yes, save to config file", "No, use for this session only"];
    let save_choice = Select::with_theme(&theme)
        .with_prompt("Save this key for future sessions?")
        .items(save_options)
        .default(1)
        .interact_opt()?;

    match save_choice {
        Some(0) => {
            let path = config.source.clone().unwrap_or_else(Config::default_path);
            match save_key_to_config(&path, provider, &key) {
                Ok(()) => eprintln!(
                    "  {}",
                    dim.apply_to(format!("Key saved to {}", path.display()))
                ),
                Err(e) => {
                    eprintln!("  {}", warn.apply_to(format!("Could not save to config: {e}")));
                    eprintln!("  Using key for this session only.");
                }
            }
            Ok(KeyChoice::Entered(key))
        }
        Some(_) => Ok(KeyChoice::Entered(key)),
        None => Ok(KeyChoice::Cancelled),
    }
}

/// Configured key value (possibly an `${ENV_VAR}` reference) for a provider.
fn configured_key<'a>(config: &'a Config, provider: &str) -> Option<&'a str> {
    match provider {
        "gemini" => Some(&config.provider.gemini.api_key),
        "openai" => Some(&config.provider.openai.api_key),
        _ => None,
    }
}

/// True when the provider's key resolves to a non-empty value.
pub(crate) fn has_key(config: &Config, provider: &str) -> bool {
    configured_key(config, provider)
        .and_then(resolve_env_var)
        .is_some()
}

pub(crate) fn provider_label(provider: &str) -> &str {
    match provider {
        "gemini" => "Gemini",
        "openai" => "OpenAI",
        other => other,
    }
}

/// Write `[provider.<name>] api_key` into the TOML file at `path`,
/// keeping the rest of the document (comments included) as it was.
fn save_key_to_config(path: &Path, provider: &str, key: &str) -> anyhow::Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc: toml_edit::DocumentMut = content.parse()?;

    if !doc.contains_key("provider") {
        let mut table = toml_edit::Table::new();
        table.set_implicit(true);
        doc["provider"] = toml_edit::Item::Table(table);
    }
    if !doc["provider"]
        .as_table()
        .is_some_and(|t| t.contains_key(provider))
    {
        doc["provider"][provider] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["provider"][provider]["api_key"] = toml_edit::value(key);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, doc.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_key_literal_value() {
        let mut config = Config::default();
        config.provider.gemini.api_key = "AIza-real-key".to_string();
        assert!(has_key(&config, "gemini"));
    }

    #[test]
    fn has_key_unset_env_reference() {
        let mut config = Config::default();
        config.provider.openai.api_key = "${HUE_TEST_NEVER_SET_VAR}".to_string();
        assert!(!has_key(&config, "openai"));
    }

    #[test]
    fn has_key_empty_or_unknown() {
        let mut config = Config::default();
        config.provider.gemini.api_key = String::new();
        assert!(!has_key(&config, "gemini"));
        assert!(!has_key(&config, "anthropic"));
    }

    #[test]
    fn provider_labels() {
        assert_eq!(provider_label("gemini"), "Gemini");
        assert_eq!(provider_label("openai"), "OpenAI");
        assert_eq!(provider_label("custom"), "custom");
    }

    #[test]
    fn save_key_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hue/config.toml");

        save_key_to_config(&path, "gemini", "AIza-123").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider.gemini.api_key, "AIza-123");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[provider.gemini]"));
        assert!(!text.contains("[provider]\n"));
    }

    #[test]
    fn save_key_preserves_comments_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "# my settings\n[api]\nparallel = 2\n\n[provider.openai]\nmodel = \"gpt-4o\" # keep\n",
        )
        .unwrap();

        save_key_to_config(&path, "openai", "sk-test").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("# my settings"));
        assert!(text.contains("# keep"));
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.parallel, 2);
        assert_eq!(config.provider.openai.model, "gpt-4o");
        assert_eq!(config.provider.openai.api_key, "sk-test");
    }
}
