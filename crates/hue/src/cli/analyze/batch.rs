//! Batch analysis of the image directory, with progress and saved reports.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use hue_core::config::timestamp;
use hue_core::output::{prompt_results_filename, resolve_output_path, save_json, summary_path};
use hue_core::{AnalysisResult, Analyzer, BatchOptions, BatchReport, BatchRunner, Config, FileDiscovery};
use indicatif::ProgressBar;

use super::types::OutputFormat;
use super::{open_writer, AnalyzeArgs};

/// Analyze every configured image in the image directory.
pub async fn analyze_batch(analyzer: Analyzer, args: &AnalyzeArgs, config: &Config) -> anyhow::Result<()> {
    let image_dir = config.image_dir();
    if !image_dir.is_dir() {
        anyhow::bail!(
            "Image directory does not exist: {}\n\n  Hint: create it, set images.directory, or pass --image-dir.",
            image_dir.display()
        );
    }

    let discovery = FileDiscovery::new(config.images.clone());
    let files = discovery.resolve(&config.images.files, &image_dir);
    if files.is_empty() {
        tracing::warn!("No supported image files found in {}", image_dir.display());
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) ({:.1} MB)",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );

    let runner = BatchRunner::new(analyzer, BatchOptions::from_config(config));
    let results_dir = config.results_dir();
    let ts = timestamp();
    let pretty = config.output.pretty;
    let start = Instant::now();

    if args.multi_prompt {
        let prompts = config.prompt_names();
        let progress = create_progress_bar((files.len() * prompts.len()) as u64);
        let pb = progress.clone();
        let reports = runner
            .run_multi_prompt(&files, &prompts, move |r| record_progress(&pb, r))
            .await;
        progress.finish_and_clear();

        for report in &reports {
            println!("{}", report.render());
            println!();
        }
        let summary = args
            .output
            .as_ref()
            .map(|output| summary_path(&resolve_output_path(&results_dir, output)));
        let combined = save_prompt_reports(reports, &results_dir, summary.as_deref(), &ts, pretty)?;

        print_prompt_comparison(&combined);
        return Ok(());
    }

    let output_path = batch_output_path(args, config, &ts);
    let writer = match args.format {
        OutputFormat::Jsonl => Some(Arc::new(Mutex::new(open_writer(
            &output_path,
            args.format,
            false,
        )?))),
        OutputFormat::Json => None,
    };

    let progress = create_progress_bar(files.len() as u64);
    let pb = progress.clone();
    let stream = writer.clone();
    let report = runner
        .run(&files, args.prompt.as_deref(), move |r| {
            record_progress(&pb, r);
            if let Some(writer) = &stream {
                if let Ok(mut w) = writer.lock() {
                    if let Err(e) = w.write(r) {
                        tracing::warn!("Failed to write result for {}: {e}", r.image_file);
                    }
                }
            }
        })
        .await;
    progress.finish_and_clear();

    match &writer {
        Some(writer) => {
            if let Ok(mut w) = writer.lock() {
                w.flush()?;
                tracing::info!("Streamed {} result(s) to {:?}", w.items_written(), output_path);
                if w.items_written() < report.results.len() {
                    tracing::warn!(
                        "{} result(s) missing from {:?}",
                        report.results.len() - w.items_written(),
                        output_path
                    );
                }
            }
        }
        None => save_json(&report, &output_path, pretty)?,
    }

    println!("{}", report.render());
    println!();
    println!("{}", report.statistics().render());
    print_summary(&report, start.elapsed());
    eprintln!("  Results saved to {}", output_path.display());

    Ok(())
}

/// Save one report per prompt into `results_dir`, plus the combined map when
/// a summary path is given. Returns the reports keyed by prompt.
fn save_prompt_reports(
    reports: Vec<BatchReport>,
    results_dir: &Path,
    summary: Option<&Path>,
    timestamp: &str,
    pretty: bool,
) -> anyhow::Result<BTreeMap<String, BatchReport>> {
    let mut combined = BTreeMap::new();
    for report in reports {
        let path = results_dir.join(prompt_results_filename(&report.metadata.prompt_used, timestamp));
        save_json(&report, &path, pretty)?;
        eprintln!("  Saved {}", path.display());
        combined.insert(report.metadata.prompt_used.clone(), report);
    }

    if let Some(path) = summary {
        save_json(&combined, path, pretty)?;
        eprintln!("  Combined results saved to {}", path.display());
    }
    Ok(combined)
}

/// `--output` resolved against the results directory, else the configured name.
fn batch_output_path(args: &AnalyzeArgs, config: &Config, timestamp: &str) -> PathBuf {
    let results_dir = config.results_dir();
    match &args.output {
        Some(output) => resolve_output_path(&results_dir, output),
        None => {
            let name = config.results_filename(timestamp);
            let name = match args.format {
                OutputFormat::Jsonl => Path::new(&name).with_extension("jsonl"),
                OutputFormat::Json => PathBuf::from(name),
            };
            results_dir.join(name)
        }
    }
}

fn record_progress(pb: &ProgressBar, result: &AnalysisResult) {
    if !result.success {
        pb.println(format!(
            "  ✗ {}: {}",
            result.image_file,
            result.error.as_deref().unwrap_or("unknown error")
        ));
    }
    pb.inc(1);
    pb.set_message(result.image_file.clone());
}

fn create_progress_bar(total: u64) -> ProgressBar {
    use indicatif::ProgressStyle;

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after a batch.
fn print_summary(report: &BatchReport, elapsed: std::time::Duration) {
    let s = &report.summary;
    let rate = if elapsed.as_secs_f64() > 0.0 {
        s.total_images as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", s.successful);
    if s.failed > 0 {
        eprintln!("    Failed:       {:>8}", s.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", s.total_images);
    eprintln!("    Wall clock:   {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.2} img/sec", rate);
    eprintln!("  ====================================");

    let failures: Vec<&AnalysisResult> = report.failures().collect();
    if !failures.is_empty() {
        eprintln!();
        eprintln!("  Failed images:");
        for result in failures.iter().take(10) {
            eprintln!(
                "    {}: {}",
                result.image_file,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        if failures.len() > 10 {
            eprintln!("    ... and {} more", failures.len() - 10);
        }
    }
}

/// One line per prompt so multi-prompt runs can be compared at a glance.
fn print_prompt_comparison(reports: &BTreeMap<String, BatchReport>) {
    eprintln!();
    eprintln!("  {:<28} {:>6} {:>6} {:>10}", "Prompt", "OK", "Failed", "Avg (ms)");
    for (prompt, report) in reports {
        let s = &report.summary;
        eprintln!(
            "  {:<28} {:>6} {:>6} {:>10.0}",
            prompt, s.successful, s.failed, s.average_processing_time_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hue_core::types::BatchMetadata;
    use hue_core::TimingMode;

    fn prompt_report(prompt: &str, images: &[&str]) -> BatchReport {
        let results = images
            .iter()
            .map(|image| {
                let mut result =
                    AnalysisResult::failure(image, PathBuf::from(image), prompt, "HTTP 500".into());
                result.success = true;
                result.error = None;
                result.response_text = Some("Red".into());
                (image.to_string(), result)
            })
            .collect();
        let metadata = BatchMetadata {
            start_time: "start".into(),
            end_time: "end".into(),
            total_images: 0,
            prompt_used: prompt.into(),
            config_file: None,
            timing_mode: TimingMode::Standard,
            successful: 0,
            failed: 0,
        };
        BatchReport::new(metadata, results)
    }

    #[test]
    fn test_multi_prompt_reports_and_summary_saved() {
        let dir = tempfile::tempdir().unwrap();
        let results_dir = dir.path().join("results");
        let summary = results_dir.join("summary_run.json");
        let reports = vec![
            prompt_report("color_description", &["a.jpg", "b.jpg"]),
            prompt_report("scene_description", &["a.jpg", "b.jpg"]),
        ];

        let combined =
            save_prompt_reports(reports, &results_dir, Some(&summary), "20260101_120000", false).unwrap();

        assert_eq!(
            combined.keys().collect::<Vec<_>>(),
            vec!["color_description", "scene_description"]
        );
        for prompt in ["color_description", "scene_description"] {
            let path = results_dir.join(format!("results_prompt_{prompt}_20260101_120000.json"));
            let saved: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(saved["metadata"]["prompt_used"], prompt);
            assert_eq!(saved["metadata"]["successful"], 2);
        }

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        let by_prompt = saved.as_object().unwrap();
        assert_eq!(by_prompt.len(), 2);
        assert_eq!(
            by_prompt["scene_description"]["results"]["b.jpg"]["prompt_used"],
            "scene_description"
        );
    }

    #[test]
    fn test_multi_prompt_without_output_skips_summary() {
        let dir = tempfile::tempdir().unwrap();
        let reports = vec![prompt_report("color_description", &["a.jpg"])];

        save_prompt_reports(reports, dir.path(), None, "t", true).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["results_prompt_color_description_t.json"]);
    }

    #[test]
    fn test_batch_output_path_default_name() {
        let mut config = Config::default();
        config.output.directory = PathBuf::from("/tmp/hue-results");
        let path = batch_output_path(&AnalyzeArgs::default(), &config, "20260101_120000");
        assert_eq!(
            path,
            PathBuf::from("/tmp/hue-results/batch_results_20260101_120000.json")
        );

        let args = AnalyzeArgs {
            format: OutputFormat::Jsonl,
            ..Default::default()
        };
        let path = batch_output_path(&args, &config, "20260101_120000");
        assert_eq!(
            path,
            PathBuf::from("/tmp/hue-results/batch_results_20260101_120000.jsonl")
        );
    }

    #[test]
    fn test_batch_output_path_explicit() {
        let mut config = Config::default();
        config.output.directory = PathBuf::from("/tmp/hue-results");
        let args = AnalyzeArgs {
            output: Some(PathBuf::from("run1.json")),
            ..Default::default()
        };
        assert_eq!(
            batch_output_path(&args, &config, "ts"),
            PathBuf::from("/tmp/hue-results/run1.json")
        );

        let args = AnalyzeArgs {
            output: Some(PathBuf::from("out/run1.json")),
            ..Default::default()
        };
        assert_eq!(
            batch_output_path(&args, &config, "ts"),
            PathBuf::from("out/run1.json")
        );
    }

    #[test]
    fn test_progress_counts_results() {
        let pb = ProgressBar::hidden();
        pb.set_length(2);
        let failed = AnalysisResult::failure("a.jpg", PathBuf::from("a.jpg"), "p", "boom".into());
        record_progress(&pb, &failed);
        assert_eq!(pb.position(), 1);
        assert_eq!(pb.message(), "a.jpg");
    }
}
