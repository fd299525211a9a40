//! Rasterization of a finalized crop.
//!
//! [`rasterize`] is written once against the [`RasterBackend`] capability
//! trait and runs these steps:
//!
//! 1. Size a square "safe" surface that holds the source under any rotation
//!    ([`safe_canvas_size`])
//! 2. Draw the source centered on that surface, rotated about its center
//! 3. Convert the display-space crop region to natural pixels and offset it
//!    into the surface frame
//! 4. Extract that block, resampled to the target size
//! 5. Encode to the output format
//!
//! The centering offset is the integer `floor((safe - n) / 2)` in both
//! steps 2 and 3, so an unrotated full-image crop at natural size is
//! pixel-identical to the source.

mod cpu;

pub use cpu::CpuBackend;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::OutputSpec;
use crate::decode::SourceImage;
use crate::encode::{EncodeError, EncodedImage, OutputFormat};
use crate::geometry::{
    display_to_natural, safe_canvas_size, Affine2, GeometryError, Rect, Size,
};
use crate::model::TransformSnapshot;

/// Errors from rasterizing a crop.
#[derive(Debug, Error)]
pub enum RasterError {
    /// A drawing surface could not be created. Fatal to the session.
    #[error("Drawing surface of {width}x{height} pixels is unavailable")]
    SurfaceUnavailable { width: u64, height: u64 },

    /// The crop region degenerated to zero width or height after conversion.
    #[error("Crop region ({x}, {y}, {width}x{height}) is empty after conversion")]
    InvalidCropRegion {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    /// The draw transform cannot be inverted.
    #[error("Draw transform is singular")]
    SingularTransform,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl RasterError {
    /// Whether the session may be adjusted and the rasterize call retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RasterError::InvalidCropRegion { .. } | RasterError::Geometry(_)
        )
    }
}

/// Resampling filter used when the extracted block is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// An integer pixel rectangle on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Minimal drawing-surface capability needed by [`rasterize`].
pub trait RasterBackend {
    type Surface;

    /// Create a fully transparent surface.
    ///
    /// # Errors
    ///
    /// [`RasterError::SurfaceUnavailable`] if the surface cannot be allocated.
    fn create_surface(&self, width: u32, height: u32) -> Result<Self::Surface, RasterError>;

    /// Draw `source` onto `surface`. `transform` maps source pixel coordinates
    /// to surface pixel coordinates.
    fn draw_image(
        &self,
        surface: &mut Self::Surface,
        source: &SourceImage,
        transform: &Affine2,
    ) -> Result<(), RasterError>;

    /// Copy `region` of `surface` into a new `width x height` surface,
    /// resampling if the sizes differ.
    fn extract_region(
        &self,
        surface: &Self::Surface,
        region: PixelRect,
        width: u32,
        height: u32,
    ) -> Result<Self::Surface, RasterError>;

    fn encode(
        &self,
        surface: &Self::Surface,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, RasterError>;
}

/// Render the crop described by `snapshot` to an encoded output raster of
/// exactly `spec.target_width() x spec.target_height()` pixels.
///
/// # Arguments
///
/// * `source` - Decoded source bitmap
/// * `snapshot` - Frozen transform state; the region is in display space
/// * `spec` - Output size, format and quality
/// * `backend` - Drawing-surface implementation
///
/// # Errors
///
/// - [`RasterError::SurfaceUnavailable`] if the safe or output surface cannot
///   be created
/// - [`RasterError::InvalidCropRegion`] if the crop is empty in surface pixels
/// - [`RasterError::Geometry`] if the snapshot's viewport is empty
pub fn rasterize<B: RasterBackend>(
    source: &SourceImage,
    snapshot: &TransformSnapshot,
    spec: &OutputSpec,
    backend: &B,
) -> Result<EncodedImage, RasterError> {
    let (width, height) = (source.natural_width(), source.natural_height());

    // 1. Safe surface
    let safe_side = safe_canvas_size(width, height);
    let safe = u32::try_from(safe_side).map_err(|_| RasterError::SurfaceUnavailable {
        width: safe_side,
        height: safe_side,
    })?;
    let (offset_x, offset_y) = centering_offsets(safe, width, height);
    debug!(
        "rasterize {}x{} source on {}x{} safe surface, rotation {}",
        width, height, safe, safe, snapshot.transform.rotation_degrees
    );

    // 2. Draw rotated about the image center
    let mut surface = backend.create_surface(safe, safe)?;
    let transform = draw_transform(
        width,
        height,
        offset_x,
        offset_y,
        snapshot.transform.rotation_degrees,
    );
    backend.draw_image(&mut surface, source, &transform)?;

    // 3. Crop region into the surface frame
    let natural = display_to_natural(snapshot.region, snapshot.viewport, source.natural_size())?;
    let rect = natural.rect.translate(offset_x as f64, offset_y as f64);
    let block = snap_to_pixels(rect, safe)?;
    debug!("extract {:?} -> {}x{}", block, spec.target_width(), spec.target_height());

    // 4. Extract and resize
    let output = backend.extract_region(
        &surface,
        block,
        spec.target_width(),
        spec.target_height(),
    )?;
    drop(surface);

    // 5. Encode
    let bytes = backend.encode(&output, spec.format(), spec.quality())?;
    debug!("encoded {} bytes as {}", bytes.len(), spec.format());

    Ok(EncodedImage {
        bytes,
        format: spec.format(),
        width: spec.target_width(),
        height: spec.target_height(),
    })
}

/// Integer offsets that center an `width x height` image on a `safe` square.
pub fn centering_offsets(safe: u32, width: u32, height: u32) -> (u32, u32) {
    (safe.saturating_sub(width) / 2, safe.saturating_sub(height) / 2)
}

/// Source-to-surface transform: translate to the image center on the
/// surface, rotate, translate back by half the image size.
pub fn draw_transform(
    width: u32,
    height: u32,
    offset_x: u32,
    offset_y: u32,
    rotation_degrees: f64,
) -> Affine2 {
    let half_w = width as f64 / 2.0;
    let half_h = height as f64 / 2.0;
    Affine2::IDENTITY
        .translate(offset_x as f64 + half_w, offset_y as f64 + half_h)
        .rotate_degrees(rotation_degrees)
        .translate(-half_w, -half_h)
}

/// Round a surface-frame rectangle to whole pixels, clipped to the surface.
fn snap_to_pixels(rect: Rect, side: u32) -> Result<PixelRect, RasterError> {
    let invalid = || RasterError::InvalidCropRegion {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    };

    let edges = [rect.x, rect.y, rect.right(), rect.bottom()];
    if edges.iter().any(|v| !v.is_finite()) {
        return Err(invalid());
    }

    let bounds = Size::from_pixels(side, side);
    let snap = |v: f64, max: f64| v.round().clamp(0.0, max) as u32;
    let x0 = snap(rect.x, bounds.width);
    let y0 = snap(rect.y, bounds.height);
    let x1 = snap(rect.right(), bounds.width);
    let y1 = snap(rect.bottom(), bounds.height);

    if x1 <= x0 || y1 <= y0 {
        return Err(invalid());
    }

    Ok(PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================
