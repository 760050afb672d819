//! Batch Processing Module
//!
//! Directory listing, batch layout (where sources live, where outputs go)
//! and the per-file outcome / tally types that flow between the worker pool
//! and the aggregator.

use crate::img_errors::SetupError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One directory entry handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// Result of examining one entry. Exactly one is produced per dispatched entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted {
        source_name: String,
        dest_path: PathBuf,
    },
    /// Extension did not match; only used to account for the entry.
    Skipped { source_name: String },
    Failed {
        source_name: String,
        error: String,
    },
}

impl ConversionOutcome {
    pub fn source_name(&self) -> &str {
        match self {
            ConversionOutcome::Converted { source_name, .. }
            | ConversionOutcome::Skipped { source_name }
            | ConversionOutcome::Failed { source_name, .. } => source_name,
        }
    }
}

/// Where a batch reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLayout {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Source extension without the dot, matched case-insensitively.
    pub source_ext: String,
    /// Extension given to converted files.
    pub target_ext: String,
    /// Format names used in the report summary.
    pub source_label: String,
    pub target_label: String,
}

impl BatchLayout {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        source_ext: &str,
        target_ext: &str,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            source_ext: source_ext.trim_start_matches('.').to_string(),
            target_ext: target_ext.trim_start_matches('.').to_string(),
            source_label: source_ext.trim_start_matches('.').to_uppercase(),
            target_label: target_ext.trim_start_matches('.').to_uppercase(),
        }
    }

    /// Override the summary labels (default: upper-cased extensions).
    pub fn with_labels(mut self, source_label: &str, target_label: &str) -> Self {
        self.source_label = source_label.to_string();
        self.target_label = target_label.to_string();
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.source_ext))
    }

    pub fn source_for(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    /// `output_dir/<stem>.<target_ext>`
    pub fn destination_for(&self, name: &str) -> PathBuf {
        self.output_dir.join(self.destination_name(name))
    }

    pub fn destination_name(&self, name: &str) -> String {
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        format!("{}.{}", stem, self.target_ext)
    }

    /// Output path as shown in the report, relative to the input directory.
    pub fn display_destination(&self, name: &str) -> String {
        let dest = self.destination_for(name);
        dest.strip_prefix(&self.input_dir)
            .unwrap_or(&dest)
            .display()
            .to_string()
    }

}

/// Regular files directly inside `dir`, sorted by name. No extension filter;
/// the worker pool decides what to convert.
pub fn list_directory(dir: &Path) -> Result<Vec<SourceFile>, SetupError> {
    // surface an unreadable root as a setup error instead of an empty batch
    std::fs::read_dir(dir).map_err(|e| SetupError::ReadInputDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<SourceFile> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| SourceFile::new(e.into_path()))
        .collect();
    files.retain(|f| !f.name.is_empty());
    Ok(files)
}

/// Running tally of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<(String, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn fail(&mut self, name: String, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((name, error));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    /// Entries that went through a conversion attempt.
    pub fn dispatched(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn record(&mut self, outcome: &ConversionOutcome) {
        match outcome {
            ConversionOutcome::Converted { .. } => self.success(),
            ConversionOutcome::Skipped { .. } => self.skip(),
            ConversionOutcome::Failed { source_name, error } => {
                self.fail(source_name.clone(), error.clone())
            }
        }
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}
