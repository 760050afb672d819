//! Conversion Task Module
//!
//! Converts one source file into one destination file through the codec
//! boundary, splicing the source metadata into the encoded output.

use crate::codec::{ImageDecoder, ImageEncoder};
use crate::img_errors::{ConvertError, Result};
use crate::jpeg_splice::MetadataSplicer;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Seam used by the worker pool; tests substitute their own converters.
pub trait Convert: Send + Sync {
    fn convert(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// Decoder + encoder pair that performs a single file conversion.
#[derive(Debug, Clone)]
pub struct ConversionTask<D, E> {
    decoder: D,
    encoder: E,
}

impl<D, E> ConversionTask<D, E>
where
    D: ImageDecoder,
    E: ImageEncoder<D::Image>,
{
    pub fn new(decoder: D, encoder: E) -> Self {
        Self { decoder, encoder }
    }

    /// Every step short-circuits on failure. A partially written destination
    /// is left in place.
    pub fn convert(&self, source: &Path, destination: &Path) -> Result<()> {
        let file = File::open(source).map_err(|e| ConvertError::SourceOpen {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);

        let metadata = self
            .decoder
            .extract_metadata(&mut reader)
            .map_err(ConvertError::Metadata)?;
        debug!(
            file = %source.display(),
            metadata_bytes = metadata.as_ref().map(Vec::len),
            "metadata extracted"
        );

        // metadata extraction may have consumed part of the stream
        reader.seek(SeekFrom::Start(0))?;

        let image = self
            .decoder
            .decode(&mut reader)
            .map_err(ConvertError::Decode)?;
        drop(reader);

        let output = File::create(destination).map_err(|e| ConvertError::DestinationCreate {
            path: destination.to_path_buf(),
            source: e,
        })?;

        let mut sink =
            MetadataSplicer::new(BufWriter::new(output), metadata).map_err(ConvertError::Splice)?;

        self.encoder
            .encode(&mut sink, &image)
            .map_err(ConvertError::Encode)?;

        sink.flush()?;
        Ok(())
    }
}

impl<D, E> Convert for ConversionTask<D, E>
where
    D: ImageDecoder,
    E: ImageEncoder<D::Image>,
{
    fn convert(&self, source: &Path, destination: &Path) -> Result<()> {
        ConversionTask::convert(self, source, destination)
    }
}
