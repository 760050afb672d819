//! HEIC/HEIF decoding via libheif-rs
//!
//! Reads the whole stream into memory, opens the primary image and either
//! pulls out its Exif block or decodes it to 8-bit RGB.

use image::{DynamicImage, RgbImage};
use libheif_rs::{ColorSpace, HeifContext, ItemId, LibHeif, RgbChroma};
use shared_utils::{CodecError, ImageDecoder, ReadSeek};

/// APP1 payloads start with this identifier, followed by the TIFF header.
pub const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

#[derive(Debug, Clone, Copy, Default)]
pub struct HeicDecoder;

fn read_all(source: &mut dyn ReadSeek) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    source
        .read_to_end(&mut bytes)
        .map_err(|e| CodecError::new(format!("Failed to read HEIC: {}", e)))?;
    Ok(bytes)
}

fn open(bytes: &[u8]) -> Result<HeifContext<'_>, CodecError> {
    HeifContext::read_from_bytes(bytes).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("SecurityLimitExceeded") || msg.contains("ipco") {
            CodecError::new(format!(
                "HEIC security limit exceeded (ipco box limit): {}",
                msg
            ))
        } else {
            CodecError::new(format!("Failed to read HEIC: {}", msg))
        }
    })
}

/// Turn a HEIF Exif item into an APP1 payload.
///
/// HEIF prefixes the block with a 4-byte big-endian offset to the TIFF
/// header. Whatever sits before the TIFF header is replaced by
/// [`EXIF_HEADER`].
pub fn exif_app1_payload(raw: &[u8]) -> Option<Vec<u8>> {
    if raw.starts_with(EXIF_HEADER) {
        return Some(raw.to_vec());
    }
    if raw.len() < 4 {
        return None;
    }

    let offset = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    let tiff = raw[4..].get(offset..)?;
    if tiff.is_empty() {
        return None;
    }
    if tiff.starts_with(EXIF_HEADER) {
        return Some(tiff.to_vec());
    }

    let mut payload = Vec::with_capacity(EXIF_HEADER.len() + tiff.len());
    payload.extend_from_slice(EXIF_HEADER);
    payload.extend_from_slice(tiff);
    Some(payload)
}

impl ImageDecoder for HeicDecoder {
    type Image = DynamicImage;

    fn extract_metadata(&self, source: &mut dyn ReadSeek) -> Result<Option<Vec<u8>>, CodecError> {
        let bytes = read_all(source)?;
        let ctx = open(&bytes)?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| CodecError::new(format!("Failed to get primary image: {}", e)))?;

        let count = handle.number_of_metadata_blocks(b"Exif");
        if count <= 0 {
            return Ok(None);
        }

        let mut ids: Vec<ItemId> = vec![0; count as usize];
        let found = handle.metadata_block_ids(&mut ids, b"Exif");
        let Some(&id) = ids.iter().take(found).next() else {
            return Ok(None);
        };

        let raw = handle
            .metadata(id)
            .map_err(|e| CodecError::new(format!("Failed to read Exif block: {}", e)))?;
        Ok(exif_app1_payload(&raw))
    }

    fn decode(&self, source: &mut dyn ReadSeek) -> Result<DynamicImage, CodecError> {
        let bytes = read_all(source)?;
        let ctx = open(&bytes)?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| CodecError::new(format!("Failed to get primary image: {}", e)))?;

        let lib_heif = LibHeif::new();
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|e| CodecError::new(format!("Failed to decode HEIC: {}", e)))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| CodecError::new("No RGB plane found"))?;

        let (width, height) = (plane.width, plane.height);
        let row = width as usize * 3;
        let mut pixels = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            let start = y * plane.stride;
            let line = plane
                .data
                .get(start..start + row)
                .ok_or_else(|| CodecError::new("RGB plane shorter than expected"))?;
            pixels.extend_from_slice(line);
        }

        RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| CodecError::new("Failed to create RGB image"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_payload_with_offset_prefix() {
        // offset 6 skips an Exif\0\0 header inside the item
        let mut raw = vec![0, 0, 0, 6];
        raw.extend_from_slice(b"Exif\0\0");
        raw.extend_from_slice(b"MM\0*\0\0\0\x08");

        let payload = exif_app1_payload(&raw).unwrap();
        assert_eq!(payload, b"Exif\0\0MM\0*\0\0\0\x08");
    }

    #[test]
    fn test_payload_with_zero_offset() {
        let mut raw = vec![0, 0, 0, 0];
        raw.extend_from_slice(b"II*\0");
        assert_eq!(exif_app1_payload(&raw).unwrap(), b"Exif\0\0II*\0");
    }

    #[test]
    fn test_payload_zero_offset_with_header() {
        let mut raw = vec![0, 0, 0, 0];
        raw.extend_from_slice(b"Exif\0\0II*\0");
        assert_eq!(exif_app1_payload(&raw).unwrap(), b"Exif\0\0II*\0");
    }

    #[test]
    fn test_payload_already_app1() {
        assert_eq!(exif_app1_payload(b"Exif\0\0MM").unwrap(), b"Exif\0\0MM");
    }

    #[test]
    fn test_payload_rejects_bad_offsets() {
        assert_eq!(exif_app1_payload(&[0, 0]), None);
        assert_eq!(exif_app1_payload(&[0, 0, 0, 9, b'M', b'M']), None);
        assert_eq!(exif_app1_payload(&[0, 0, 0, 2, b'M', b'M']), None);
    }

    #[test]
    fn test_garbage_is_codec_error() {
        let mut src = Cursor::new(b"definitely not a heif file".to_vec());
        assert!(HeicDecoder.extract_metadata(&mut src).is_err());
        let mut src = Cursor::new(Vec::new());
        assert!(HeicDecoder.decode(&mut src).is_err());
    }
}
