//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Size;

/// Error types for image decoding operations.
///
/// Decoding happens before any crop session exists, so every variant is
/// non-fatal to the host: the user can simply pick another file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No bytes were provided.
    #[error("Image file is empty")]
    Empty,

    /// The declared MIME type is not an image type.
    #[error("Unsupported MIME type: {0}")]
    UnsupportedMimeType(String),

    /// The file format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl Orientation {
    /// Returns true if this orientation swaps width and height dimensions.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90CW
                | Orientation::Transverse
                | Orientation::Rotate270CW
        )
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded source bitmap, oriented for display.
///
/// Pixels are RGBA8 so transparent sources survive the rasterize pipeline
/// when the output format supports alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pixels: image::RgbaImage,
}

impl SourceImage {
    /// Wrap an RGBA buffer.
    pub fn from_rgba(pixels: image::RgbaImage) -> Self {
        Self { pixels }
    }

    /// Create from raw RGBA bytes (4 bytes per pixel, row-major).
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        image::RgbaImage::from_raw(width, height, pixels).map(Self::from_rgba)
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn natural_size(&self) -> Size {
        Size::from_pixels(self.natural_width(), self.natural_height())
    }

    pub fn pixels(&self) -> &image::RgbaImage {
        &self.pixels
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.natural_width() == 0 || self.natural_height() == 0
    }
}
