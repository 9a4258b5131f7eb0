//! Dataset scanner for discovering input files.
//!
//! This module expands the paths given on the command line into a list of
//! dataset files, respecting configuration for extensions, excludes and
//! file limits.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for dataset scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["csv", "tsv"])
    pub extensions: Vec<String>,
    /// Names to skip while walking (e.g., ["DRAFTS", "node_modules"])
    pub excludes: Vec<String>,
    /// Maximum number of datasets to return
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            excludes: config.excludes.clone(),
            max_files: Some(config.max_files),
        }
    }
}

/// Scanned dataset file information.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Scanner that turns input paths into dataset files.
pub struct DatasetScanner {
    config: ScanConfig,
}

impl DatasetScanner {
    /// Create a new dataset scanner.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Expand inputs into dataset files.
    ///
    /// Files are taken as given. Directories are walked recursively and
    /// contribute matching files in path order.
    pub fn scan(&self, inputs: &[PathBuf]) -> Result<Vec<ScannedFile>> {
        let mut files: Vec<ScannedFile> = Vec::new();

        for input in inputs {
            if input.is_file() {
                files.push(scanned(input)?);
            } else if input.is_dir() {
                self.walk_dir(input, &mut files);
            } else {
                return Err(anyhow!("Input not found: {}", input.display()));
            }
        }

        // The same file may be reachable from two inputs
        let mut seen = std::collections::HashSet::new();
        files.retain(|f| seen.insert(f.path.clone()));

        if let Some(max) = self.config.max_files {
            if files.len() > max {
                warn!("Found {} datasets, keeping the first {}", files.len(), max);
                files.truncate(max);
            }
        }

        Ok(files)
    }

    /// Check if a file looks like a dataset.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        self.config.extensions.contains(&ext)
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        // Explicit excludes
        self.config.excludes.iter().any(|pattern| name == pattern)
    }

    /// Walk directory recursively.
    fn walk_dir(&self, dir: &Path, files: &mut Vec<ScannedFile>) {
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(&entry_name(entry)));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Cannot read entry under {}: {}", dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => files.push(ScannedFile {
                    path: entry.path().to_path_buf(),
                    size: metadata.len(),
                }),
                Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
            }
        }
    }
}

fn entry_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().to_string()
}

fn scanned(path: &Path) -> Result<ScannedFile> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;

    Ok(ScannedFile {
        path: path.to_path_buf(),
        size: metadata.len(),
    })
}
