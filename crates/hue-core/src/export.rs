//! Export saved analysis results to CSV.
//!
//! Scans a folder of result JSON files (individual results, batch reports
//! and multi-prompt summaries), keeps the successful results and writes one
//! CSV row per image x prompt with timing columns in microseconds.

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::llm::RequestTimings;

/// Primary row ordering by image name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMethod {
    /// Digit runs compare as numbers: img2 < img10
    #[default]
    Natural,
    /// First number in the name; names without digits last
    Numeric,
    /// Case-insensitive text order
    Alphabetical,
}

impl std::fmt::Display for SortMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMethod::Natural => write!(f, "natural"),
            SortMethod::Numeric => write!(f, "numeric"),
            SortMethod::Alphabetical => write!(f, "alphabetical"),
        }
    }
}

/// Tie-break for rows of the same image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecondarySort {
    #[default]
    Prompt,
    None,
}

impl std::fmt::Display for SecondarySort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecondarySort::Prompt => write!(f, "prompt"),
            SecondarySort::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub sort: SortMethod,
    pub secondary: SecondarySort,
}

/// One CSV row. Timing columns are microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub image_file: String,
    pub prompt_used: String,
    pub response_text: String,
    pub encode_us: f64,
    pub request_us: f64,
    pub time_to_first_byte_us: f64,
    pub response_transfer_us: f64,
    pub total_us: f64,
}

impl ExportRow {
    fn new(image_file: &str, prompt_used: &str, response_text: &str, timings: Option<&RequestTimings>) -> Self {
        let us = |ms: f64| ms * 1000.0;
        let t = timings.cloned().unwrap_or_default();
        Self {
            image_file: image_file.to_string(),
            prompt_used: prompt_used.to_string(),
            response_text: response_text.to_string(),
            encode_us: us(t.encode_ms),
            request_us: us(t.request_ms),
            time_to_first_byte_us: us(t.time_to_first_byte_ms.unwrap_or(0.0)),
            response_transfer_us: us(t.response_transfer_ms),
            total_us: us(t.total_ms),
        }
    }
}

/// Counters gathered while scanning result files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub total_files: usize,
    pub rows: usize,
    pub skipped_failed: usize,
    pub parse_errors: usize,
    /// Files that could not be read as UTF-8 text
    pub other_errors: usize,
    pub missing_fields: usize,
    pub missing_timings: usize,
    /// Results already exported from another file
    pub duplicates: usize,
}

/// Outcome of an export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub output: PathBuf,
    pub options: ExportOptions,
    pub stats: ExportStats,
    pub rows: Vec<ExportRow>,
}

/// Scan `dir`, sort, and write the CSV to `output`.
///
/// The CSV is only written when at least one row was collected.
pub fn export_results(dir: &Path, output: &Path, options: ExportOptions) -> Result<ExportReport> {
    let (mut rows, stats) = collect_rows(dir)?;
    sort_rows(&mut rows, options);
    if !rows.is_empty() {
        write_csv(&rows, output)?;
        tracing::info!("Exported {} row(s) to {:?}", rows.len(), output);
    } else {
        tracing::warn!("No successful results found in {:?}", dir);
    }
    Ok(ExportReport {
        output: output.to_path_buf(),
        options,
        stats,
        rows,
    })
}

/// Read every `*.json` file directly inside `dir` into rows.
pub fn collect_rows(dir: &Path) -> Result<(Vec<ExportRow>, ExportStats)> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();

    let mut stats = ExportStats::default();
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for file in &files {
        stats.total_files += 1;
        let content = match std::fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {e}", file);
                stats.other_errors += 1;
                continue;
            }
        };
        let value: Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Skipping {:?}: invalid JSON ({e})", file);
                stats.parse_errors += 1;
                continue;
            }
        };

        let mut records = Vec::new();
        gather_records(&value, &mut records);
        for record in records {
            let Some(row) = record_to_row(record, file, &mut stats) else {
                continue;
            };
            // The same run can be saved as individual files, a batch report
            // and a multi-prompt summary at once.
            if seen.insert(record_key(record, &row)) {
                rows.push(row);
            } else {
                tracing::debug!("{} [{}] already exported", row.image_file, row.prompt_used);
                stats.duplicates += 1;
            }
        }
    }

    stats.rows = rows.len();
    Ok((rows, stats))
}

/// Find result objects in a file: a single result, a batch report's
/// `results`, or results and reports keyed by prompt (multi-prompt output).
fn gather_records<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    let Some(obj) = value.as_object() else {
        return;
    };
    if obj.contains_key("success") {
        out.push(value);
    } else if let Some(results) = obj.get("results").and_then(Value::as_object) {
        out.extend(results.values());
    } else {
        for nested in obj.values() {
            if nested.get("success").is_some() {
                out.push(nested);
            } else if let Some(results) = nested.get("results").and_then(Value::as_object) {
                out.extend(results.values());
            }
        }
    }
}

/// Identity of one analysis: image, prompt, and when it ran (or what the
/// image contained and answered when the time is missing).
fn record_key(record: &Value, row: &ExportRow) -> (String, String, String) {
    let marker = match record.get("analyzed_at").and_then(Value::as_str) {
        Some(at) => at.to_string(),
        None => format!(
            "{}:{}",
            record.get("content_hash").and_then(Value::as_str).unwrap_or(""),
            row.response_text
        ),
    };
    (row.image_file.clone(), row.prompt_used.clone(), marker)
}

fn record_to_row(record: &Value, file: &Path, stats: &mut ExportStats) -> Option<ExportRow> {
    if record.get("success").and_then(Value::as_bool) != Some(true) {
        stats.skipped_failed += 1;
        return None;
    }

    let field = |name: &str| record.get(name).and_then(Value::as_str);
    let (Some(image), Some(prompt), Some(text)) =
        (field("image_file"), field("prompt_used"), field("response_text"))
    else {
        tracing::warn!("Result in {:?} is missing required fields", file);
        stats.missing_fields += 1;
        return None;
    };

    let timings = record
        .get("timings")
        .and_then(|t| serde_json::from_value::<RequestTimings>(t.clone()).ok());
    if timings.is_none() {
        stats.missing_timings += 1;
    }

    Some(ExportRow::new(image, prompt, text, timings.as_ref()))
}

/// Sort rows by image name, then optionally by prompt.
pub fn sort_rows(rows: &mut [ExportRow], options: ExportOptions) {
    rows.sort_by(|a, b| {
        let primary = match options.sort {
            SortMethod::Natural => natural_cmp(&a.image_file, &b.image_file),
            SortMethod::Numeric => numeric_cmp(&a.image_file, &b.image_file),
            SortMethod::Alphabetical => a
                .image_file
                .to_lowercase()
                .cmp(&b.image_file.to_lowercase()),
        };
        match options.secondary {
            SecondarySort::Prompt => primary.then_with(|| {
                a.prompt_used
                    .to_lowercase()
                    .cmp(&b.prompt_used.to_lowercase())
            }),
            SecondarySort::None => primary,
        }
    });
}

/// Compare two strings treating digit runs as numbers and text case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ka, kb) = (natural_key(a), natural_key(b));
    for (x, y) in ka.iter().zip(kb.iter()) {
        let ord = match (x, y) {
            (Chunk::Num(x), Chunk::Num(y)) => cmp_digit_runs(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            (Chunk::Num(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Num(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ka.len().cmp(&kb.len())
}

/// Compare by the first number in each name; names without one sort last.
pub fn numeric_cmp(a: &str, b: &str) -> Ordering {
    let first = |s: &str| {
        natural_key(s).into_iter().find_map(|c| match c {
            Chunk::Num(n) => Some(n),
            Chunk::Text(_) => None,
        })
    };
    match (first(a), first(b)) {
        (Some(x), Some(y)) => cmp_digit_runs(&x, &y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

enum Chunk {
    Text(String),
    Num(String),
}

/// Split into alternating text and digit runs, text lowercased.
fn natural_key(s: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;
    for ch in s.chars() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            chunks.push(if in_digits {
                Chunk::Num(std::mem::take(&mut current))
            } else {
                Chunk::Text(std::mem::take(&mut current).to_lowercase())
            });
            in_digits = is_digit;
        }
        current.push(ch);
    }
    chunks.push(if in_digits {
        Chunk::Num(current)
    } else {
        Chunk::Text(current.to_lowercase())
    });
    chunks
}

/// Numeric comparison of two digit strings of any length.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Write rows with a header line, creating the parent directory.
pub fn write_csv(rows: &[ExportRow], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl ExportReport {
    /// Statistics and a preview of the first rows, grouped by image.
    pub fn render(&self) -> String {
        let s = &self.stats;
        let rule = "=".repeat(60);
        let mut lines = vec![
            rule.clone(),
            "Export statistics".to_string(),
            rule,
            format!("Files scanned:             {}", s.total_files),
            format!("Rows written:              {}", s.rows),
            format!("Skipped (success=false):   {}", s.skipped_failed),
            format!("JSON parse errors:         {}", s.parse_errors),
            format!("Other errors:              {}", s.other_errors),
            format!("Missing required fields:   {}", s.missing_fields),
            format!("Missing timings:           {}", s.missing_timings),
            format!("Duplicates skipped:        {}", s.duplicates),
            format!("Sort:                      {} / {}", self.options.sort, self.options.secondary),
        ];
        if self.rows.is_empty() {
            lines.push("No exportable results found.".to_string());
            return lines.join("\n");
        }
        lines.push(format!("CSV file:                  {}", self.output.display()));

        lines.push(String::new());
        lines.push("First rows:".to_string());
        let mut current: Option<&str> = None;
        for (i, row) in self.rows.iter().take(15).enumerate() {
            if current.is_some_and(|c| c != row.image_file) {
                lines.push(format!("  {}", "-".repeat(40)));
            }
            current = Some(&row.image_file);
            lines.push(format!(
                "  {:2}. {} | {} | {}",
                i + 1,
                row.image_file,
                row.prompt_used,
                row.response_text
            ));
        }
        if self.rows.len() > 15 {
            lines.push(format!("  ... {} rows in total", self.rows.len()));
        }

        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry(&row.image_file)
                .or_default()
                .push(&row.prompt_used);
        }
        lines.push(String::new());
        lines.push(format!("{} distinct image(s)", groups.len()));
        for (image, prompts) in groups.iter().take(5) {
            lines.push(format!(
                "  {image}: {} prompt(s) ({})",
                prompts.len(),
                prompts.join(", ")
            ));
        }
        lines.join("\n")
    }
}
