//! Codec boundary between the batch pipeline and the actual image formats.

use crate::img_errors::CodecError;
use std::io::{Read, Seek, Write};

/// Readable, seekable source stream.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Source format reader.
pub trait ImageDecoder: Send + Sync {
    type Image;

    /// Raw metadata block (APP1 payload), `Ok(None)` when the file has none.
    fn extract_metadata(&self, source: &mut dyn ReadSeek) -> Result<Option<Vec<u8>>, CodecError>;

    fn decode(&self, source: &mut dyn ReadSeek) -> Result<Self::Image, CodecError>;
}

/// Target format writer.
///
/// Implementations must emit a complete stream that starts with the
/// format's two-byte start marker.
pub trait ImageEncoder<I>: Send + Sync {
    fn encode(&self, sink: &mut dyn Write, image: &I) -> Result<(), CodecError>;
}
