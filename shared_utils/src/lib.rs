//! Shared Utilities for the img-jpeg converter
//!
//! - Worker pool: fans a directory listing out over a fixed set of threads
//! - Conversion task: decode → EXIF splice → encode for one file
//! - JPEG splicing writer: reinserts the source EXIF block after SOI
//! - Aggregation and the plain-text / JSON batch report
//! - Logging, progress bar, timestamp preservation

pub mod batch;
pub mod codec;
pub mod conversion;
pub mod file_times;
pub mod img_errors;
pub mod jpeg_splice;
pub mod logging;
pub mod progress;
pub mod report;
pub mod size_format;
pub mod thread_manager;
pub mod worker_pool;

#[cfg(test)]
mod mock_codec;

pub use batch::{list_directory, BatchLayout, BatchResult, ConversionOutcome, SourceFile};
pub use codec::{ImageDecoder, ImageEncoder, ReadSeek};
pub use conversion::{Convert, ConversionTask};
pub use img_errors::{CodecError, ConvertError, SetupError};
pub use jpeg_splice::{MetadataSplicer, MAX_SEGMENT_PAYLOAD};
pub use progress::create_progress_bar;
pub use report::{
    aggregate, print_summary_report, AggregateReport, BatchSummary, ReportSection, ReportWriter,
};
pub use size_format::human_readable_size;
pub use thread_manager::resolve_worker_count;
pub use worker_pool::{PendingBatch, WorkerPool};
