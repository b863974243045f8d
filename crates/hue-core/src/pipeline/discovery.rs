//! Resolving configured file names and wildcard patterns to image paths.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ImagesConfig;
use crate::error::AnalysisError;

/// Finds the images a run should analyze.
pub struct FileDiscovery {
    config: ImagesConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl DiscoveredFile {
    /// Name used to key results: the path relative to `base`, or the file name.
    pub fn display_name(&self, base: &Path) -> String {
        relative_name(&self.path, base)
    }
}

impl FileDiscovery {
    pub fn new(config: ImagesConfig) -> Self {
        Self { config }
    }

    /// Resolve the configured `images.files` entries against `dir`.
    pub fn discover(&self, dir: &Path) -> Vec<DiscoveredFile> {
        self.resolve(&self.config.files, dir)
    }

    /// Resolve file names and wildcard patterns against `dir`.
    ///
    /// Patterns containing `*` or `?` are matched against paths relative to
    /// `dir` (`*` and `?` stay within one path segment, `**` spans segments).
    /// Plain names are kept when `dir/name` exists. The result is
    /// de-duplicated, filtered to supported extensions and sorted by path.
    pub fn resolve(&self, patterns: &[String], dir: &Path) -> Vec<DiscoveredFile> {
        let mut found: BTreeSet<PathBuf> = BTreeSet::new();

        for pattern in patterns {
            if is_wildcard(pattern) {
                let Some(matcher) = pattern_regex(pattern) else {
                    tracing::warn!("Ignoring invalid image pattern '{pattern}'");
                    continue;
                };
                let recursive = pattern.contains('/') || pattern.contains("**");
                let walker = WalkDir::new(dir)
                    .min_depth(1)
                    .max_depth(if recursive { usize::MAX } else { 1 })
                    .follow_links(true);
                for entry in walker.into_iter().filter_map(|e| e.ok()) {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let rel = relative_name(entry.path(), dir);
                    if matcher.is_match(&rel) {
                        found.insert(entry.path().to_path_buf());
                    }
                }
            } else {
                let path = dir.join(pattern);
                if path.is_file() {
                    found.insert(path);
                } else {
                    tracing::debug!("Configured image not found: {:?}", path);
                }
            }
        }

        found
            .into_iter()
            .filter(|p| self.is_supported(p))
            .filter_map(|path| {
                let size = std::fs::metadata(&path).ok()?.len();
                Some(DiscoveredFile { path, size })
            })
            .collect()
    }

    /// Resolve a single image given on the command line.
    ///
    /// The name is used as-is when it points at a file, otherwise it is
    /// looked up inside `dir`.
    pub fn resolve_single(name: &Path, dir: &Path) -> Result<PathBuf, AnalysisError> {
        if name.is_file() {
            return Ok(name.to_path_buf());
        }
        let joined = dir.join(name);
        if joined.is_file() {
            return Ok(joined);
        }
        Err(AnalysisError::FileNotFound(joined))
    }

    /// Check if a file has a supported extension.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Path relative to `base` with `/` separators; falls back to the full path.
fn relative_name(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Translate a shell-style wildcard into an anchored regex.
fn pattern_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}
