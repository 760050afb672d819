//! JPEG EXIF Splicing Module
//!
//! Wraps the destination of a JPEG encoder so an EXIF block taken from the
//! source image lands in an APP1 segment right after the start-of-image
//! marker. The encoder still produces its own complete stream; its leading
//! SOI is dropped because the splicer has already written one.

use std::io::{self, Write};

/// Start-of-image marker.
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// APP1 marker, the conventional home of EXIF data.
pub const APP1: [u8; 2] = [0xFF, 0xE1];

/// Number of leading encoder bytes discarded (the encoder's own SOI).
pub const ENCODER_SOI_LEN: usize = 2;

/// Largest payload whose segment length (payload + 2) fits in 16 bits.
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// Sink decorator that writes `SOI [APP1 len payload]` on construction and
/// then forwards everything after the first [`ENCODER_SOI_LEN`] bytes.
#[derive(Debug)]
pub struct MetadataSplicer<W: Write> {
    inner: W,
    bytes_to_skip: usize,
}

impl<W: Write> MetadataSplicer<W> {
    /// Write the header (and APP1 segment if `metadata` is present) to `inner`.
    ///
    /// Fails with `InvalidInput` before touching `inner` when the metadata
    /// would overflow the 16-bit segment length.
    pub fn new(mut inner: W, metadata: Option<Vec<u8>>) -> io::Result<Self> {
        if let Some(payload) = metadata.as_deref() {
            if payload.len() > MAX_SEGMENT_PAYLOAD {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "EXIF block is {} bytes, APP1 payload limit is {} bytes",
                        payload.len(),
                        MAX_SEGMENT_PAYLOAD
                    ),
                ));
            }
        }

        inner.write_all(&SOI)?;

        if let Some(payload) = metadata {
            inner.write_all(&app1_header(payload.len()))?;
            inner.write_all(&payload)?;
        }

        Ok(Self {
            inner,
            bytes_to_skip: ENCODER_SOI_LEN,
        })
    }

    /// Encoder bytes that will still be swallowed before forwarding starts.
    pub fn discard_pending(&self) -> usize {
        self.bytes_to_skip
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// `FF E1` followed by the big-endian segment length (payload + 2).
fn app1_header(payload_len: usize) -> [u8; 4] {
    let [hi, lo] = ((payload_len + 2) as u16).to_be_bytes();
    [APP1[0], APP1[1], hi, lo]
}

impl<W: Write> Write for MetadataSplicer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.bytes_to_skip == 0 {
            return self.inner.write(buf);
        }

        if buf.len() <= self.bytes_to_skip {
            self.bytes_to_skip -= buf.len();
            return Ok(buf.len());
        }

        let skipped = self.bytes_to_skip;
        let written = self.inner.write(&buf[skipped..])?;
        self.bytes_to_skip = 0;
        Ok(skipped + written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
