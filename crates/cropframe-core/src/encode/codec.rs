//! Output encoding for rasterized crops.
//!
//! Encodes RGBA pixel data with the `image` crate's JPEG, PNG and WebP
//! encoders. JPEG has no alpha channel, so transparent pixels are composited
//! over black (what a browser canvas does when exporting JPEG).

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The pixel buffer size does not fit in memory addressing
    #[error("Image too large to encode: {width}x{height}")]
    TooLarge { width: u32, height: u32 },

    /// The requested MIME type has no encoder
    #[error("Unsupported output MIME type: {0}")]
    UnsupportedFormat(String),

    /// The encoder itself failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// Output image format, identified by MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    /// Lossless WebP.
    #[serde(rename = "image/webp")]
    WebP,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for OutputFormat {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(OutputFormat::Jpeg),
            "image/png" => Ok(OutputFormat::Png),
            "image/webp" => Ok(OutputFormat::WebP),
            _ => Err(EncodeError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Map a `[0, 1]` quality to the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    if quality.is_nan() {
        return 100;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode RGBA pixel data.
///
/// # Arguments
///
/// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `format` - Output format
/// * `quality` - Quality in `[0, 1]`; only JPEG uses it
///
/// # Errors
///
/// Returns `InvalidDimensions` for a zero dimension, `TooLarge` if the buffer
/// size overflows `usize`, `InvalidPixelData` for a buffer of the wrong
/// length, and `EncodingFailed` if the encoder fails.
pub fn encode_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(EncodeError::TooLarge { width, height })?;
    if pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: pixels.len(),
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    let failed = |e: image::ImageError| EncodeError::EncodingFailed {
        format,
        message: e.to_string(),
    };

    match format {
        OutputFormat::Jpeg => {
            let rgb = composite_over_black(pixels);
            JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(failed)?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
        OutputFormat::WebP => {
            WebPEncoder::new_lossless(&mut buffer)
                .write_image(pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
    }

    Ok(buffer.into_inner())
}

/// Drop alpha by compositing each pixel over black.
fn composite_over_black(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = px[3] as u32;
        for &channel in &px[..3] {
            rgb.push(((channel as u32 * alpha + 127) / 255) as u8);
        }
    }
    rgb
}

/// An encoded output raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `data:<mime>;base64,<payload>` form of the encoded bytes.
    pub fn to_data_uri(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type(), payload)
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
