//! The `hue export` command: saved result files to one CSV.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use hue_core::config::timestamp;
use hue_core::{export_results, Config, ExportOptions, SecondarySort, SortMethod};

/// Arguments for the `export` command.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Folder of result JSON files (defaults to the results directory)
    pub folder: Option<PathBuf>,

    /// CSV file to write (defaults to csv/results_export_<timestamp>.csv in the folder)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Row ordering by image name
    #[arg(long, value_enum, default_value = "natural")]
    pub sort: SortArg,

    /// Ordering of rows for the same image
    #[arg(long, value_enum, default_value = "prompt")]
    pub secondary_sort: SecondaryArg,
}

/// Image name ordering.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum SortArg {
    /// Digit runs compare as numbers (img2 before img10)
    Natural,
    /// By the first number in the name; names without digits last
    Numeric,
    /// Case-insensitive text order
    Alphabetical,
}

impl From<SortArg> for SortMethod {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Natural => SortMethod::Natural,
            SortArg::Numeric => SortMethod::Numeric,
            SortArg::Alphabetical => SortMethod::Alphabetical,
        }
    }
}

/// Tie-break within one image.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum SecondaryArg {
    /// Sort by prompt name
    Prompt,
    /// Keep file order
    None,
}

impl From<SecondaryArg> for SecondarySort {
    fn from(arg: SecondaryArg) -> Self {
        match arg {
            SecondaryArg::Prompt => SecondarySort::Prompt,
            SecondaryArg::None => SecondarySort::None,
        }
    }
}

/// Execute the export command.
pub fn execute(args: ExportArgs, config: &Config) -> anyhow::Result<()> {
    let folder = args.folder.unwrap_or_else(|| config.results_dir());
    let options = ExportOptions {
        sort: args.sort.into(),
        secondary: args.secondary_sort.into(),
    };
    run_export(&folder, args.output, options)
}

/// Export `folder` and print the statistics report.
pub fn run_export(folder: &Path, output: Option<PathBuf>, options: ExportOptions) -> anyhow::Result<()> {
    if !folder.is_dir() {
        anyhow::bail!("Results folder does not exist: {}", folder.display());
    }
    let output = output.unwrap_or_else(|| default_export_path(folder, &timestamp()));

    let report = export_results(folder, &output, options)?;
    println!("{}", report.render());
    Ok(())
}

/// `{folder}/csv/results_export_{timestamp}.csv`
pub fn default_export_path(folder: &Path, timestamp: &str) -> PathBuf {
    folder
        .join("csv")
        .join(format!("results_export_{timestamp}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_export_path() {
        assert_eq!(
            default_export_path(Path::new("results"), "20260101_000000"),
            PathBuf::from("results/csv/results_export_20260101_000000.csv")
        );
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = run_export(&missing, None, ExportOptions::default()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_export_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let result = serde_json::json!({
            "image_file": "img2.jpg",
            "file_path": "images/img2.jpg",
            "prompt_used": "color_detection_speed",
            "success": true,
            "response_text": "Red",
            "processing_time_ms": 120.0,
            "analyzed_at": "2026-01-01T00:00:00Z"
        });
        std::fs::write(dir.path().join("one.json"), result.to_string()).unwrap();
        let output = dir.path().join("out.csv");

        run_export(dir.path(), Some(output.clone()), ExportOptions::default()).unwrap();

        let csv = std::fs::read_to_string(&output).unwrap();
        assert!(csv.starts_with("image_file,prompt_used,response_text"));
        assert!(csv.contains("img2.jpg,color_detection_speed,Red"));
    }
}
