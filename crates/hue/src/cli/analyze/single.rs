//! Single-image analysis, with one prompt or every configured prompt.

use std::collections::BTreeMap;
use std::path::Path;

use hue_core::output::{resolve_output_path, save_json};
use hue_core::{AnalysisResult, Analyzer, Config, FileDiscovery};

use super::types::OutputFormat;
use super::{open_writer, AnalyzeArgs};

/// Analyze one image and print the answer with its timing breakdown.
pub async fn analyze_single(
    analyzer: &Analyzer,
    args: &AnalyzeArgs,
    config: &Config,
    image: &Path,
) -> anyhow::Result<()> {
    let path = FileDiscovery::resolve_single(image, &config.image_dir())?;
    let output = args
        .output
        .as_deref()
        .map(|o| resolve_output_path(&config.results_dir(), o));

    if args.multi_prompt {
        let prompts = config.prompt_names();
        tracing::info!("Running {} prompt(s) on {}", prompts.len(), path.display());

        let mut results = BTreeMap::new();
        for prompt in prompts {
            let result = analyzer.analyze_image(&path, Some(&prompt)).await;
            print_result(&result);
            results.insert(prompt, result);
        }

        let failed = results.values().filter(|r| !r.success).count();
        eprintln!();
        eprintln!(
            "  {} prompt(s) run, {} succeeded, {} failed",
            results.len(),
            results.len() - failed,
            failed
        );

        if let Some(output) = output {
            match args.format {
                OutputFormat::Json => save_json(&results, &output, config.output.pretty)?,
                OutputFormat::Jsonl => {
                    let mut writer = open_writer(&output, args.format, false)?;
                    for result in results.values() {
                        writer.write(result)?;
                    }
                    writer.flush()?;
                }
            }
            eprintln!("  Results saved to {}", output.display());
        }
        if config.performance.save_individual_results {
            eprintln!("  Individual results saved in {}", config.results_dir().display());
        }
        return Ok(());
    }

    let result = analyzer.analyze_image(&path, args.prompt.as_deref()).await;
    print_result(&result);

    if let Some(output) = output {
        match args.format {
            OutputFormat::Json => save_json(&result, &output, config.output.pretty)?,
            OutputFormat::Jsonl => {
                let mut writer = open_writer(&output, args.format, false)?;
                writer.write(&result)?;
                writer.flush()?;
            }
        }
        eprintln!("  Result saved to {}", output.display());
    }

    if config.performance.save_individual_results {
        eprintln!("  Saved in {}", config.results_dir().display());
    }

    if !result.success {
        anyhow::bail!("Analysis of {} failed", result.image_file);
    }
    Ok(())
}

/// Answer line on stdout, timing breakdown on stderr.
fn print_result(result: &AnalysisResult) {
    println!("{}", result.summary_line());
    if let Some(timings) = &result.timings {
        eprintln!("{}", timings.render());
    }
    if result.attempts > 1 {
        eprintln!("  ({} attempts)", result.attempts);
    }
}
