//! Baseline JPEG encoding via the image crate.

use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::{DynamicImage, ExtendedColorType};
use shared_utils::{CodecError, ImageEncoder};
use std::io::Write;

/// Matches the quality libjpeg-style tools use when none is given.
pub const DEFAULT_QUALITY: u8 = 75;

#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl ImageEncoder<DynamicImage> for JpegEncoder {
    fn encode(&self, sink: &mut dyn Write, image: &DynamicImage) -> Result<(), CodecError> {
        // JPEG has no alpha; flatten everything to 8-bit RGB
        let rgb = image.to_rgb8();
        let mut encoder = ImageJpegEncoder::new_with_quality(sink, self.quality);
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| CodecError::new(format!("JPEG encode failed: {}", e)))
    }
}
