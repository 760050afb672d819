//! Shared Error Types
//!
//! Per-file conversion errors are captured as strings in the batch report;
//! setup errors abort the run before any conversion starts.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a decoder or encoder implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure converting a single file. Never aborts the batch.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("cannot open source {path}: {source}")]
    SourceOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("metadata extraction failed: {0}")]
    Metadata(CodecError),

    #[error("decode failed: {0}")]
    Decode(CodecError),

    #[error("cannot create destination {path}: {source}")]
    DestinationCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another source in the batch already maps to the same output file.
    #[error("destination {destination} already claimed by {claimed_by}")]
    DestinationClaimed {
        destination: String,
        claimed_by: String,
    },

    #[error("cannot embed metadata: {0}")]
    Splice(std::io::Error),

    #[error("encode failed: {0}")]
    Encode(CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal setup failure; the run stops without a report.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to read input directory {path}: {source}")]
    ReadInputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create report file {path}: {source}")]
    CreateReport {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write report file {path}: {source}")]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to spawn worker thread: {0}")]
    SpawnWorker(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
