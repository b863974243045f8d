//! Provider and analyzer construction for the analysis commands.

use std::time::Duration;

use hue_core::llm::api_key_env_var;
use hue_core::{AnalysisError, AnalyzeOptions, Analyzer, Config, ProviderFactory, ProviderOverrides};

use super::AnalyzeArgs;

/// Provider name from the flags, falling back to `api.provider`.
pub fn provider_name(args: &AnalyzeArgs, config: &Config) -> String {
    args.provider
        .map(|p| p.to_string())
        .unwrap_or_else(|| config.api.provider.clone())
}

/// Build the provider named by the flags/config and wrap it in an analyzer.
pub fn create_analyzer(args: &AnalyzeArgs, config: &Config) -> anyhow::Result<Analyzer> {
    let name = provider_name(args, config);
    let overrides = ProviderOverrides {
        model: args.model.as_deref(),
        api_key: args.api_key.as_deref(),
        timeout: Some(Duration::from_millis(config.api.timeout_ms)),
    };

    let provider = ProviderFactory::create(&name, &config.provider, overrides)
        .map_err(|e| provider_setup_error(&name, e))?;

    tracing::info!("Using {} model {}", provider.name(), provider.model());
    Ok(Analyzer::new(provider, config, AnalyzeOptions::from_config(config)))
}

fn provider_setup_error(name: &str, e: AnalysisError) -> anyhow::Error {
    match api_key_env_var(name) {
        Some(var) => anyhow::anyhow!(
            "{e}\n\n  Hint: set {var} in the environment or a .env file, \
             or run `hue` without arguments to enter a key."
        ),
        None => anyhow::anyhow!(
            "{e}\n\n  Hint: supported providers are {}.",
            ProviderFactory::PROVIDERS.join(", ")
        ),
    }
}
