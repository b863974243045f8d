//! Result persistence: JSON report files and streamed JSON Lines.
//!
//! Batch reports are written as a single JSON document. With the JSONL
//! format each `AnalysisResult` is written as its own line as soon as it
//! completes, so a long run leaves usable output even if interrupted.

use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON document (a batch report)
    #[default]
    Json,
    /// One result object per line
    JsonLines,
}

/// Serializes items to JSON or JSONL.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format; JSONL is always one line per item.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one item, followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        let pretty = self.pretty && self.format == OutputFormat::Json;
        if pretty {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Write `value` as JSON to `path`, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    std::fs::write(path, content)?;
    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

/// Where an `--output` name is written.
///
/// Bare file names land in the results directory; anything with a
/// directory component (or absolute) is used as given.
pub fn resolve_output_path(results_dir: &Path, output: &Path) -> PathBuf {
    let has_dir = output
        .parent()
        .map(|p| !p.as_os_str().is_empty())
        .unwrap_or(false);
    if output.is_absolute() || has_dir {
        output.to_path_buf()
    } else {
        results_dir.join(output)
    }
}

/// `individual_{image}[_{prompt}]_{timestamp}.json`
///
/// `image_file` is the display name relative to the image directory; path
/// separators and dots become `_` so `a/red.jpg` and `b/red.png` never share
/// a file.
pub fn individual_filename(image_file: &str, prompt: Option<&str>, timestamp: &str) -> String {
    let mut name: String = image_file
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ':' => '_',
            c => c,
        })
        .collect();
    if name.is_empty() {
        name.push_str("image");
    }
    match prompt {
        Some(p) => format!("individual_{name}_{p}_{timestamp}.json"),
        None => format!("individual_{name}_{timestamp}.json"),
    }
}

/// `results_prompt_{prompt}_{timestamp}.json`
pub fn prompt_results_filename(prompt: &str, timestamp: &str) -> String {
    format!("results_prompt_{prompt}_{timestamp}.json")
}

/// `summary_{name}` next to the given output path.
pub fn summary_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results.json".to_string());
    output.with_file_name(format!("summary_{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        image: &'static str,
        color: &'static str,
    }

    #[test]
    fn test_write_jsonl_one_line_per_item() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer
            .write(&Row {
                image: "a.jpg",
                color: "red",
            })
            .unwrap();
        writer
            .write(&Row {
                image: "b.jpg",
                color: "blue",
            })
            .unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"color\":\"blue\""));
    }

    #[test]
    fn test_write_pretty_json() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, true);
        writer
            .write(&Row {
                image: "a.jpg",
                color: "red",
            })
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_save_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.json");
        save_json(&serde_json::json!({"ok": true}), &path, true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"ok\": true"));
    }

    #[test]
    fn test_resolve_output_path() {
        let results = Path::new("/data/results");
        assert_eq!(
            resolve_output_path(results, Path::new("run.json")),
            PathBuf::from("/data/results/run.json")
        );
        assert_eq!(
            resolve_output_path(results, Path::new("out/run.json")),
            PathBuf::from("out/run.json")
        );
        assert_eq!(
            resolve_output_path(results, Path::new("/tmp/run.json")),
            PathBuf::from("/tmp/run.json")
        );
    }

    #[test]
    fn test_individual_names_keep_extension_and_directory() {
        let names = [
            individual_filename("red.jpg", Some("p"), "t"),
            individual_filename("red.png", Some("p"), "t"),
            individual_filename("a/red.jpg", Some("p"), "t"),
            individual_filename("b/red.jpg", Some("p"), "t"),
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names[2], "individual_a_red_jpg_p_t.json");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            individual_filename("red.jpg", None, "20240101_120000"),
            "individual_red_jpg_20240101_120000.json"
        );
        assert_eq!(
            individual_filename("red.jpg", Some("scene_description"), "t"),
            "individual_red_jpg_scene_description_t.json"
        );
        assert_eq!(
            prompt_results_filename("color_description", "t"),
            "results_prompt_color_description_t.json"
        );
        assert_eq!(
            summary_path(Path::new("/r/run.json")),
            PathBuf::from("/r/summary_run.json")
        );
    }
}
