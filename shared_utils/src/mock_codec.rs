//! In-memory codec used by the pipeline tests.
//!
//! File layout: `MOCK`, one length byte, metadata, pixel bytes.
//! Encoded layout: `FF D8 BODY <pixels>`.

use crate::codec::{ImageDecoder, ImageEncoder, ReadSeek};
use crate::img_errors::CodecError;
use crate::jpeg_splice::SOI;
use std::io::Write;

const MAGIC: &[u8; 4] = b"MOCK";

pub fn mock_file_bytes(metadata: &[u8], pixels: &[u8]) -> Vec<u8> {
    assert!(metadata.len() <= u8::MAX as usize);
    let mut out = MAGIC.to_vec();
    out.push(metadata.len() as u8);
    out.extend_from_slice(metadata);
    out.extend_from_slice(pixels);
    out
}

fn parse(source: &mut dyn ReadSeek) -> Result<(Vec<u8>, Vec<u8>), CodecError> {
    let mut raw = Vec::new();
    source
        .read_to_end(&mut raw)
        .map_err(|e| CodecError::new(e.to_string()))?;
    if raw.len() < 5 || &raw[..4] != MAGIC {
        return Err(CodecError::new("not a mock image"));
    }
    let meta_len = raw[4] as usize;
    if raw.len() < 5 + meta_len {
        return Err(CodecError::new("truncated metadata"));
    }
    Ok((raw[5..5 + meta_len].to_vec(), raw[5 + meta_len..].to_vec()))
}

#[derive(Debug, Clone, Copy)]
pub struct MockDecoder;

impl ImageDecoder for MockDecoder {
    type Image = Vec<u8>;

    fn extract_metadata(&self, source: &mut dyn ReadSeek) -> Result<Option<Vec<u8>>, CodecError> {
        let (metadata, _) = parse(source)?;
        Ok((!metadata.is_empty()).then_some(metadata))
    }

    fn decode(&self, source: &mut dyn ReadSeek) -> Result<Vec<u8>, CodecError> {
        parse(source).map(|(_, pixels)| pixels)
    }
}

/// Writes its output in `chunk`-sized pieces; pixels equal to `FAIL` make it
/// fail halfway through.
#[derive(Debug, Clone, Copy)]
pub struct MockEncoder {
    chunk: usize,
}

impl MockEncoder {
    pub fn with_chunk(chunk: usize) -> Self {
        Self { chunk: chunk.max(1) }
    }
}

impl ImageEncoder<Vec<u8>> for MockEncoder {
    fn encode(&self, sink: &mut dyn Write, image: &Vec<u8>) -> Result<(), CodecError> {
        let mut out = SOI.to_vec();
        out.extend_from_slice(b"BODY");
        if image.as_slice() == b"FAIL" {
            sink.write_all(&out)
                .map_err(|e| CodecError::new(e.to_string()))?;
            return Err(CodecError::new("encoder gave up"));
        }
        out.extend_from_slice(image);
        for part in out.chunks(self.chunk) {
            sink.write_all(part)
                .map_err(|e| CodecError::new(e.to_string()))?;
        }
        Ok(())
    }
}
