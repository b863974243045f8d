//! Image analysis from the command line: list prompts, one image, or a batch.

mod batch;
pub mod setup;
mod single;
pub mod types;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Args;
use hue_core::{Config, OutputWriter};

pub use types::{OutputFormat, ProviderArg, TimingModeArg};

/// Analysis flags, accepted at the top level of the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// List the configured prompts and exit
    #[arg(long)]
    pub list_prompts: bool,

    /// Analyze a single image (a path, or a name inside the image directory)
    #[arg(short, long, conflicts_with = "all")]
    pub image: Option<PathBuf>,

    /// Prompt to use (defaults to the configured default prompt)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Run every configured prompt instead of one
    #[arg(long, conflicts_with = "prompt")]
    pub multi_prompt: bool,

    /// Analyze every image in the image directory
    #[arg(short, long)]
    pub all: bool,

    /// Output file (bare names are written into the results directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format for saved results
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Timing capture mode (overrides the config)
    #[arg(long, value_enum)]
    pub timing_mode: Option<TimingModeArg>,

    /// Image directory (overrides the config)
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// Vision provider (overrides the config)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model name (overrides the provider's configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum requests in flight during a batch (overrides the config)
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Also save every result to its own JSON file
    #[arg(long)]
    pub save: bool,

    /// Session-only API key entered in interactive mode
    #[arg(skip)]
    pub api_key: Option<String>,
}

impl AnalyzeArgs {
    /// True when the flags ask for something to be done.
    pub fn has_action(&self) -> bool {
        self.list_prompts || self.image.is_some() || self.all
    }
}

/// Execute an analysis request.
pub async fn execute(args: AnalyzeArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args)?;

    if args.list_prompts {
        print_prompts(&config);
        return Ok(());
    }

    if let Some(name) = &args.prompt {
        ensure_prompt(&config, name)?;
    }

    let analyzer = setup::create_analyzer(&args, &config)?;

    match &args.image {
        Some(image) => single::analyze_single(&analyzer, &args, &config, image).await,
        None => batch::analyze_batch(analyzer, &args, &config).await,
    }
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(config: &mut Config, args: &AnalyzeArgs) -> anyhow::Result<()> {
    if let Some(dir) = &args.image_dir {
        config.images.directory = dir.clone();
    }
    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.api.parallel = parallel;
    }
    if let Some(mode) = args.timing_mode {
        config.performance.timing_mode = hue_core::TimingMode::from(mode).to_string();
    }
    // Single-image runs always keep their result for a later export.
    if args.save || args.image.is_some() {
        config.performance.save_individual_results = true;
    }
    Ok(())
}

fn ensure_prompt(config: &Config, name: &str) -> anyhow::Result<()> {
    if config.available_prompts().contains_key(name) {
        return Ok(());
    }
    anyhow::bail!(
        "Unknown prompt '{name}'\n\n  Available prompts: {}\n  Hint: run `hue --list-prompts` for details.",
        config.prompt_names().join(", ")
    )
}

/// Print every configured prompt with its description and text.
pub fn print_prompts(config: &Config) {
    println!("Available prompts:");
    for (name, prompt) in config.available_prompts() {
        let marker = if *name == config.prompts.default {
            " (default)"
        } else {
            ""
        };
        println!();
        println!("  {name}{marker}");
        if !prompt.description.is_empty() {
            println!("    {}", prompt.description);
        }
        println!("    \"{}\"", prompt.text);
    }
}

/// Open a results file for streaming, creating parent directories.
fn open_writer(
    path: &Path,
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<OutputWriter<BufWriter<File>>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(OutputWriter::new(BufWriter::new(file), format.into(), pretty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_action() {
        assert!(!AnalyzeArgs::default().has_action());
        let args = AnalyzeArgs {
            all: true,
            ..Default::default()
        };
        assert!(args.has_action());
        let args = AnalyzeArgs {
            image: Some(PathBuf::from("red.jpg")),
            ..Default::default()
        };
        assert!(args.has_action());
        // Modifiers alone do not start anything.
        let args = AnalyzeArgs {
            prompt: Some("scene_description".into()),
            save: true,
            ..Default::default()
        };
        assert!(!args.has_action());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let args = AnalyzeArgs {
            image_dir: Some(PathBuf::from("/tmp/pics")),
            parallel: Some(4),
            timing_mode: Some(TimingModeArg::Precise),
            save: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.images.directory, PathBuf::from("/tmp/pics"));
        assert_eq!(config.api.parallel, 4);
        assert_eq!(config.performance.timing_mode, "precise");
        assert!(config.performance.save_individual_results);
    }

    #[test]
    fn test_single_image_always_saves_individual_results() {
        let mut config = Config::default();
        assert!(!config.performance.save_individual_results);
        let args = AnalyzeArgs {
            image: Some(PathBuf::from("red.jpg")),
            ..Default::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert!(config.performance.save_individual_results);

        let mut config = Config::default();
        let batch = AnalyzeArgs {
            all: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &batch).unwrap();
        assert!(!config.performance.save_individual_results);
    }

    #[tokio::test]
    async fn test_single_image_run_leaves_result_in_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("red.jpg");
        // Unreachable endpoint: the run fails fast, and failures are saved too.
        std::fs::write(&image, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().join("results");
        config.api.provider = "openai".to_string();
        config.api.max_retries = 0;
        config.api.timeout_ms = 2000;
        config.provider.openai.api_key = "sk-test".to_string();
        config.provider.openai.endpoint = "http://127.0.0.1:1/v1/chat/completions".to_string();
        let args = AnalyzeArgs {
            image: Some(image),
            ..Default::default()
        };

        assert!(execute(args, config).await.is_err());

        let saved: Vec<String> = std::fs::read_dir(dir.path().join("results"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("individual_red_jpg_"));
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let mut config = Config::default();
        let args = AnalyzeArgs {
            parallel: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[test]
    fn test_ensure_prompt() {
        let config = Config::default();
        assert!(ensure_prompt(&config, "color_description").is_ok());
        let err = ensure_prompt(&config, "nope").unwrap_err().to_string();
        assert!(err.contains("Unknown prompt 'nope'"));
        assert!(err.contains("scene_description"));
    }

    #[test]
    fn test_open_writer_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.jsonl");
        let mut writer = open_writer(&path, OutputFormat::Jsonl, false).unwrap();
        writer.write(&serde_json::json!({"a": 1})).unwrap();
        writer.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}\n");
    }
}
