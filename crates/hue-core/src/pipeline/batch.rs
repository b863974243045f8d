//! Batch runner: one prompt over many images with bounded concurrency.
//!
//! Each image runs in its own tokio task behind a semaphore. A task keeps
//! its permit through the pacing delay, so `parallel = 1` gives strictly
//! sequential, evenly spaced requests. Results are delivered to a callback
//! as they complete and collected into a report keyed by image name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::types::{now_rfc3339, AnalysisResult, BatchMetadata, BatchReport};

use super::analyzer::Analyzer;
use super::discovery::DiscoveredFile;

/// Scheduling settings for a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum provider calls in flight
    pub parallel: usize,
    /// Pause after each request, holding the concurrency permit
    pub request_delay_ms: u64,
    /// Base directory image names are shown relative to
    pub image_dir: PathBuf,
    /// Recorded in report metadata
    pub config_file: Option<PathBuf>,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallel: config.api.parallel,
            request_delay_ms: config.performance.request_delay_ms,
            image_dir: config.image_dir(),
            config_file: config.source.clone(),
        }
    }
}

/// Runs the analyzer over a set of images.
pub struct BatchRunner {
    analyzer: Arc<Analyzer>,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(analyzer: Analyzer, options: BatchOptions) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            options,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyze every image with one prompt (`None` = the default prompt).
    ///
    /// Calls `on_result` for each completed image. A failing image is
    /// recorded and the batch carries on.
    pub async fn run<F>(&self, images: &[DiscoveredFile], prompt: Option<&str>, on_result: F) -> BatchReport
    where
        F: Fn(&AnalysisResult) + Send + Sync + 'static,
    {
        let start_time = now_rfc3339();
        let prompt_name = prompt
            .unwrap_or(self.analyzer.default_prompt())
            .to_string();
        tracing::info!(
            "Analyzing {} image(s) with prompt '{}' ({} in parallel)",
            images.len(),
            prompt_name,
            self.options.parallel
        );

        let semaphore = Arc::new(Semaphore::new(self.options.parallel.max(1)));
        let on_result = Arc::new(on_result);
        let delay = Duration::from_millis(self.options.request_delay_ms);
        let mut handles = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                tracing::warn!("Batch semaphore closed unexpectedly, stopping batch");
                break;
            };

            let name = image.display_name(&self.options.image_dir);
            let path = image.path.clone();
            let analyzer = self.analyzer.clone();
            let on_result = on_result.clone();
            let prompt = prompt_name.clone();
            let pace = index + 1 < images.len();

            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                let result = analyzer
                    .analyze_named(&path, &task_name, Some(&prompt))
                    .await;
                on_result(&result);
                if pace && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                drop(permit);
                result
            });
            handles.push((name, image.path.clone(), handle));
        }

        let mut results = BTreeMap::new();
        for (name, path, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Analysis task for {} panicked: {e}", name);
                    let failed = AnalysisResult::failure(
                        &name,
                        path,
                        &prompt_name,
                        format!("analysis task failed: {e}"),
                    );
                    on_result(&failed);
                    failed
                }
            };
            results.insert(name, result);
        }

        let metadata = BatchMetadata {
            start_time,
            end_time: now_rfc3339(),
            total_images: images.len(),
            prompt_used: prompt_name,
            config_file: self
                .options
                .config_file
                .as_deref()
                .map(|p: &Path| p.display().to_string()),
            timing_mode: self.analyzer.options().timing_mode,
            successful: 0,
            failed: 0,
        };
        let report = BatchReport::new(metadata, results);
        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            report.summary.successful,
            report.summary.failed
        );
        report
    }

    /// Run the batch once per prompt, in the given order.
    pub async fn run_multi_prompt<F>(
        &self,
        images: &[DiscoveredFile],
        prompts: &[String],
        on_result: F,
    ) -> Vec<BatchReport>
    where
        F: Fn(&AnalysisResult) + Send + Sync + 'static,
    {
        let on_result = Arc::new(on_result);
        let mut reports = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let callback = on_result.clone();
            let report = self
                .run(images, Some(prompt), move |r| callback(r))
                .await;
            reports.push(report);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyzer::AnalyzeOptions;
    use crate::testing::{ok_response, provider_error, write_image, MockProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn options(dir: &Path, parallel: usize) -> BatchOptions {
        BatchOptions {
            parallel,
            request_delay_ms: 0,
            image_dir: dir.to_path_buf(),
            config_file: None,
        }
    }

    fn runner(provider: MockProvider, dir: &Path, parallel: usize) -> BatchRunner {
        let analyzer = Analyzer::new(
            Box::new(provider),
            &Config::default(),
            AnalyzeOptions {
                max_retries: 0,
                timeout_ms: 5000,
                ..Default::default()
            },
        );
        BatchRunner::new(analyzer, options(dir, parallel))
    }

    fn files(dir: &Path, names: &[&str]) -> Vec<DiscoveredFile> {
        names
            .iter()
            .map(|n| DiscoveredFile {
                path: write_image(dir, n),
                size: 10,
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_results_ordered_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let images = files(dir.path(), &["c.jpg", "a.jpg", "sub/b.jpg"]);
        let provider = MockProvider::success("Red").with_delay(Duration::from_millis(10));
        let runner = runner(provider, dir.path(), 3);

        let report = runner.run(&images, None, |_| {}).await;

        let names: Vec<_> = report.results.keys().cloned().collect();
        assert_eq!(names, vec!["a.jpg", "c.jpg", "sub/b.jpg"]);
        assert_eq!(report.summary.successful, 3);
        assert_eq!(report.metadata.prompt_used, "color_detection_speed");
        assert_eq!(report.metadata.total_images, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_partial_failure_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = files(dir.path(), &["a.jpg", "c.jpg"]);
        images.insert(
            1,
            DiscoveredFile {
                path: dir.path().join("missing.jpg"),
                size: 0,
            },
        );
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let runner = runner(MockProvider::success("Blue"), dir.path(), 1);

        let report = runner
            .run(&images, Some("color_description"), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(report.summary.total_images, 3);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.results["missing.jpg"].success);
        assert_eq!(report.results["a.jpg"].prompt_used, "color_description");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_provider_failures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let images = files(dir.path(), &["1.jpg", "2.jpg", "3.jpg", "4.jpg"]);
        let provider = MockProvider::new(|idx, _| {
            if idx % 2 == 0 {
                Ok(ok_response("Green"))
            } else {
                Err(provider_error(Some(400), "HTTP 400 bad request"))
            }
        });
        let runner = runner(provider, dir.path(), 1);

        let report = runner.run(&images, None, |_| {}).await;

        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.success_rate, 50.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_semaphore_bounds_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..8).map(|i| format!("img{i}.jpg")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let images = files(dir.path(), &refs);
        let provider = MockProvider::success("Red").with_delay(Duration::from_millis(100));
        let max_in_flight = provider.max_in_flight.clone();
        let runner = runner(provider, dir.path(), 2);

        let report = runner.run(&images, None, |_| {}).await;

        assert_eq!(report.summary.successful, 8);
        let max = max_in_flight.load(std::sync::atomic::Ordering::SeqCst);
        assert!(max <= 2, "max in flight was {max}");
        assert!(max >= 1);
    }

    #[tokio::test]
    async fn test_sequential_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let images = files(dir.path(), &["a.jpg", "b.jpg", "c.jpg"]);
        let provider = MockProvider::success("Red").with_delay(Duration::from_millis(20));
        let max_in_flight = provider.max_in_flight.clone();
        let runner = runner(provider, dir.path(), 1);

        runner.run(&images, None, |_| {}).await;

        assert_eq!(max_in_flight.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(MockProvider::success("unused"), dir.path(), 1);

        let report = runner.run(&[], None, |_| {}).await;

        assert!(report.results.is_empty());
        assert_eq!(report.summary.total_images, 0);
        assert_eq!(report.summary.success_rate, 0.0);
        assert_eq!(report.summary.average_processing_time_ms, 0.0);
    }

    #[tokio::test]
    async fn test_multi_prompt_runs_in_prompt_order() {
        let dir = tempfile::tempdir().unwrap();
        let images = files(dir.path(), &["a.jpg", "b.jpg"]);
        let provider = MockProvider::success("ok");
        let calls = provider.call_count.clone();
        let runner = runner(provider, dir.path(), 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let prompts = vec![
            "scene_description".to_string(),
            "color_detection_accurate".to_string(),
        ];
        let reports = runner
            .run_multi_prompt(&images, &prompts, move |r| {
                sink.lock().unwrap().push(r.prompt_used.clone());
            })
            .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].metadata.prompt_used, "scene_description");
        assert_eq!(reports[1].metadata.prompt_used, "color_detection_accurate");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 4);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], "scene_description");
        assert_eq!(seen[3], "color_detection_accurate");
    }
}
