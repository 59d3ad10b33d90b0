// Test file discovery

use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// `--pattern` / `--exclude-pattern` filters applied to discovered paths
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    pattern: Option<Regex>,
    exclude: Option<Regex>,
}

impl TestFilter {
    pub fn new(pattern: Option<&str>, exclude: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: compile("--pattern", pattern)?,
            exclude: compile("--exclude-pattern", exclude)?,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.pattern.as_ref().is_none_or(|re| re.is_match(&text))
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(&text))
    }
}

fn compile(flag: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                flag,
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()
}

/// File utilities for test discovery
pub struct FileUtils;

impl FileUtils {
    /// Collect test files below `path`.
    ///
    /// An explicit file argument is always kept; inside directories only files
    /// ending in `suffix` are collected and hidden entries are skipped.
    pub fn collect_test_files(path: &Path, suffix: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            // Use walkdir for cross-platform traversal
            let walker = walkdir::WalkDir::new(path).into_iter().filter_entry(|e| {
                // Always include the root directory itself, even if it starts with '.'
                if e.depth() == 0 {
                    return true;
                }
                !e.file_name().to_string_lossy().starts_with('.')
            });

            for entry in walker.flatten() {
                if entry.file_type().is_file()
                    && entry.file_name().to_string_lossy().ends_with(suffix)
                {
                    files.push(entry.path().to_path_buf());
                }
            }
        }

        files
    }

    /// Discover, filter, sort and de-duplicate test files for every path
    pub fn discover(
        paths: &[PathBuf],
        suffix: &str,
        filter: &TestFilter,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files: Vec<PathBuf> = paths
            .iter()
            .flat_map(|path| Self::collect_test_files(path, suffix))
            .filter(|file| filter.matches(file))
            .collect();
        files.sort();
        files.dedup();

        debug!("Discovered {} test file(s)", files.len());
        if files.is_empty() {
            return Err(ConfigError::NoTestFiles(paths.to_vec()));
        }
        Ok(files)
    }
}
