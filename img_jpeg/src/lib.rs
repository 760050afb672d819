//! HEIC → JPEG conversion backed by libheif and the image crate.

pub mod heic_decoder;
pub mod jpeg_encoder;

pub use heic_decoder::{exif_app1_payload, HeicDecoder};
pub use jpeg_encoder::{JpegEncoder, DEFAULT_QUALITY};

use shared_utils::ConversionTask;

/// Source extension picked up from the input directory.
pub const SOURCE_EXTENSION: &str = "heic";
/// Extension of converted files.
pub const TARGET_EXTENSION: &str = "jpg";
/// Format names printed in the report summary.
pub const SOURCE_LABEL: &str = "HEIC";
pub const TARGET_LABEL: &str = "JPEG";
/// Output directory created next to the inputs.
pub const DEFAULT_OUTPUT_DIR: &str = "jpegs";
/// Report written into the output directory.
pub const DEFAULT_REPORT_NAME: &str = "logs.txt";

pub type HeicToJpeg = ConversionTask<HeicDecoder, JpegEncoder>;

pub fn heic_to_jpeg(quality: u8) -> HeicToJpeg {
    ConversionTask::new(HeicDecoder, JpegEncoder::new(quality))
}
