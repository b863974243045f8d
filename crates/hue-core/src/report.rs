//! Batch summaries, text reports and timing statistics.

use std::collections::BTreeMap;

use crate::types::{AnalysisResult, BatchMetadata, BatchReport, BatchSummary, ProcessingStatistics, TimingStat};

impl BatchSummary {
    /// Counts and times over a set of results.
    ///
    /// Averages are taken over every result, failures included; an empty
    /// set yields all zeros.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a AnalysisResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.total_images += 1;
            if result.success {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
            summary.total_processing_time_ms += result.processing_time_ms;
        }
        if summary.total_images > 0 {
            let total = summary.total_images as f64;
            summary.success_rate = summary.successful as f64 / total * 100.0;
            summary.average_processing_time_ms = summary.total_processing_time_ms / total;
        }
        summary
    }
}

impl BatchReport {
    /// Assemble a report, filling the metadata counts from the results.
    pub fn new(mut metadata: BatchMetadata, results: BTreeMap<String, AnalysisResult>) -> Self {
        let summary = BatchSummary::from_results(results.values());
        metadata.total_images = summary.total_images;
        metadata.successful = summary.successful;
        metadata.failed = summary.failed;
        Self {
            metadata,
            results,
            summary,
        }
    }

    /// Failed results in image order.
    pub fn failures(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.values().filter(|r| !r.success)
    }

    /// Human-readable report: totals, then one line per image.
    pub fn render(&self) -> String {
        let s = &self.summary;
        let rule = "=".repeat(60);
        let mut lines = vec![
            rule.clone(),
            format!("Batch report: prompt '{}'", self.metadata.prompt_used),
            rule,
            format!("Total images:        {}", s.total_images),
            format!("Successful:          {}", s.successful),
            format!("Failed:              {}", s.failed),
            format!("Success rate:        {:.1}%", s.success_rate),
            format!(
                "Average time:        {:.2} s",
                s.average_processing_time_ms / 1000.0
            ),
            format!(
                "Total time:          {:.2} s",
                s.total_processing_time_ms / 1000.0
            ),
            format!("Timing mode:         {}", self.metadata.timing_mode),
        ];

        if !self.results.is_empty() {
            lines.push(String::new());
            lines.push("Results:".to_string());
            for (name, result) in &self.results {
                let line = if result.success {
                    format!(
                        "  ✓ {name}: {}",
                        result.response_text.as_deref().unwrap_or("N/A")
                    )
                } else {
                    format!(
                        "  ✗ {name}: {}",
                        result.error.as_deref().unwrap_or("unknown error")
                    )
                };
                lines.push(line);
            }
        }

        lines.join("\n")
    }

    /// Min/max/avg per timing phase over successful results that carry timings.
    pub fn statistics(&self) -> ProcessingStatistics {
        let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for timings in self
            .results
            .values()
            .filter(|r| r.success)
            .filter_map(|r| r.timings.as_ref())
        {
            for (name, value) in timings.fields() {
                if name == "time_to_first_byte_ms" && timings.time_to_first_byte_ms.is_none() {
                    continue;
                }
                samples.entry(name.to_string()).or_default().push(value);
            }
        }

        let timing_statistics = samples
            .into_iter()
            .map(|(name, values)| (name, timing_stat(&values)))
            .collect();

        ProcessingStatistics {
            summary: self.summary.clone(),
            timing_statistics,
            total_images_processed: self.results.len(),
        }
    }
}

fn timing_stat(values: &[f64]) -> TimingStat {
    if values.is_empty() {
        return TimingStat::default();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    TimingStat { min, max, avg }
}

impl ProcessingStatistics {
    pub fn render(&self) -> String {
        let mut lines = vec![format!(
            "Processed {} image(s), success rate {:.1}%",
            self.total_images_processed, self.summary.success_rate
        )];
        for (name, stat) in &self.timing_statistics {
            lines.push(format!(
                "  {:<24} min {:>9.1}  max {:>9.1}  avg {:>9.1} ms",
                name, stat.min, stat.max, stat.avg
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{RequestTimings, TimingMode};
    use std::path::PathBuf;

    fn result(name: &str, success: bool, ms: f64, total_ms: Option<f64>) -> AnalysisResult {
        let mut r = AnalysisResult::failure(
            name,
            PathBuf::from(name),
            "color_detection_speed",
            "HTTP 500".to_string(),
        );
        r.success = success;
        if success {
            r.error = None;
            r.response_text = Some("Red".to_string());
        }
        r.processing_time_ms = ms;
        r.timings = total_ms.map(|t| RequestTimings {
            total_ms: t,
            request_ms: t / 2.0,
            ..Default::default()
        });
        r
    }

    fn metadata() -> BatchMetadata {
        BatchMetadata {
            start_time: "start".into(),
            end_time: "end".into(),
            total_images: 0,
            prompt_used: "color_detection_speed".into(),
            config_file: None,
            timing_mode: TimingMode::Standard,
            successful: 0,
            failed: 0,
        }
    }

    fn report(results: Vec<AnalysisResult>) -> BatchReport {
        let map = results
            .into_iter()
            .map(|r| (r.image_file.clone(), r))
            .collect();
        BatchReport::new(metadata(), map)
    }

    #[test]
    fn test_summary_counts_and_rates() {
        let report = report(vec![
            result("a.jpg", true, 1000.0, Some(900.0)),
            result("b.jpg", false, 200.0, None),
            result("c.jpg", true, 800.0, Some(700.0)),
            result("d.jpg", true, 0.0, None),
        ]);
        let s = &report.summary;
        assert_eq!(s.total_images, 4);
        assert_eq!(s.successful, 3);
        assert_eq!(s.failed, 1);
        assert_eq!(s.success_rate, 75.0);
        assert_eq!(s.total_processing_time_ms, 2000.0);
        assert_eq!(s.average_processing_time_ms, 500.0);
        assert_eq!(report.metadata.successful, 3);
        assert_eq!(report.metadata.failed, 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_empty_batch_has_zero_rates() {
        let report = report(vec![]);
        assert_eq!(report.summary, BatchSummary::default());
        assert!(report.render().contains("Success rate:        0.0%"));
        assert!(report.statistics().timing_statistics.is_empty());
    }

    #[test]
    fn test_statistics_only_successful_with_timings() {
        let report = report(vec![
            result("a.jpg", true, 1000.0, Some(900.0)),
            result("b.jpg", false, 200.0, Some(5000.0)),
            result("c.jpg", true, 800.0, Some(700.0)),
        ]);
        let stats = report.statistics();
        assert_eq!(stats.total_images_processed, 3);
        let total = stats.timing_statistics["total_ms"];
        assert_eq!(total.min, 700.0);
        assert_eq!(total.max, 900.0);
        assert_eq!(total.avg, 800.0);
        assert!(!stats.timing_statistics.contains_key("time_to_first_byte_ms"));
        assert!(stats.render().contains("total_ms"));
    }

    #[test]
    fn test_render_lists_each_image() {
        let report = report(vec![
            result("a.jpg", true, 10.0, None),
            result("b.jpg", false, 10.0, None),
        ]);
        let text = report.render();
        assert!(text.contains("✓ a.jpg: Red"));
        assert!(text.contains("✗ b.jpg: HTTP 500"));
        assert!(text.contains("Timing mode:         standard"));
    }
}
