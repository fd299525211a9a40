//! Crop geometry: pure, stateless functions.
//!
//! Everything here is deterministic and free of I/O. Out-of-range inputs are
//! clamped rather than rejected; the only fallible operations are the
//! coordinate-space conversions, which need a non-empty viewport.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, y grows downward
//! - Display space: on-screen pixels of the rendered image (the viewport)
//! - Natural space: pixels of the decoded image at full resolution
//! - Positive rotation angles turn clockwise on screen

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when checking containment of floating-point rectangles.
pub const EPSILON: f64 = 1e-9;

/// Errors from coordinate-space conversions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The viewport has a zero (or non-positive) dimension.
    #[error("Viewport has zero size: {width}x{height}")]
    ZeroViewport { width: f64, height: f64 },

    /// The natural image size has a zero (or non-positive) dimension.
    #[error("Image has zero size: {width}x{height}")]
    ZeroImage { width: f64, height: f64 },

    /// The region is expressed in a different coordinate space than expected.
    #[error("Expected a region in {expected:?} space, got {actual:?}")]
    WrongSpace {
        expected: CoordinateSpace,
        actual: CoordinateSpace,
    },
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of an integer pixel grid.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// True unless both dimensions are strictly positive (NaN counts as empty).
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Width divided by height, or `None` for an empty size.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.width / self.height)
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// A point in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle of `size` whose center is `center`.
    pub fn centered_at(center: Point, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment test: the right and bottom edges are exclusive.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Whether this rectangle lies fully inside `bounds` (with [`EPSILON`] slack).
    pub fn fits_within(&self, bounds: Size) -> bool {
        self.x >= -EPSILON
            && self.y >= -EPSILON
            && self.width >= 0.0
            && self.height >= 0.0
            && self.right() <= bounds.width + EPSILON
            && self.bottom() <= bounds.height + EPSILON
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Scale position and size independently per axis.
    pub fn scale_xy(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }
}

/// The coordinate space a [`CropRegion`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordinateSpace {
    /// On-screen pixels of the rendered image.
    Display,
    /// Pixels of the decoded image at full resolution.
    Natural,
}

/// A crop rectangle tagged with the coordinate space it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub rect: Rect,
    pub space: CoordinateSpace,
}

impl CropRegion {
    pub fn display(rect: Rect) -> Self {
        Self {
            rect,
            space: CoordinateSpace::Display,
        }
    }

    pub fn natural(rect: Rect) -> Self {
        Self {
            rect,
            space: CoordinateSpace::Natural,
        }
    }
}

/// How rotation angles are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationMode {
    /// Any angle, wrapped into `[-180, 180)`. Used by the slider front-end.
    #[default]
    Continuous,
    /// Multiples of 90 in `[0, 360)`. Used by the touch front-end.
    QuarterTurns,
}

/// Side length of the square surface that holds a `width x height` image
/// under any rotation about its center without clipping a corner.
///
/// Returns `2 * ceil(max(width, height) / 2 * sqrt(2))`, which is always
/// even and never smaller than the image diagonal.
///
/// The result is `u64` because the square of a large `u32` image can exceed
/// `u32::MAX`; callers decide whether such a surface can be allocated.
pub fn safe_canvas_size(width: u32, height: u32) -> u64 {
    let longest = width.max(height) as f64;
    let half_side = (longest / 2.0 * std::f64::consts::SQRT_2).ceil();
    2 * half_side as u64
}

/// Convert a display-space region into natural-space pixels.
///
/// Each axis is scaled independently (`natural / viewport`), so a viewport
/// whose aspect differs slightly from the image's (rounding in layout) does
/// not distort the crop.
///
/// # Errors
///
/// - [`GeometryError::WrongSpace`] if the region is not in display space
/// - [`GeometryError::ZeroViewport`] if a viewport dimension is zero
pub fn display_to_natural(
    region: CropRegion,
    viewport: Size,
    natural: Size,
) -> Result<CropRegion, GeometryError> {
    if region.space != CoordinateSpace::Display {
        return Err(GeometryError::WrongSpace {
            expected: CoordinateSpace::Display,
            actual: region.space,
        });
    }
    if viewport.is_empty() {
        return Err(GeometryError::ZeroViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let sx = natural.width / viewport.width;
    let sy = natural.height / viewport.height;
    Ok(CropRegion::natural(region.rect.scale_xy(sx, sy)))
}

/// Convert a natural-space region into display-space pixels.
///
/// Inverse of [`display_to_natural`].
pub fn natural_to_display(
    region: CropRegion,
    viewport: Size,
    natural: Size,
) -> Result<CropRegion, GeometryError> {
    if region.space != CoordinateSpace::Natural {
        return Err(GeometryError::WrongSpace {
            expected: CoordinateSpace::Natural,
            actual: region.space,
        });
    }
    if natural.is_empty() {
        return Err(GeometryError::ZeroImage {
            width: natural.width,
            height: natural.height,
        });
    }

    let sx = viewport.width / natural.width;
    let sy = viewport.height / natural.height;
    Ok(CropRegion::display(region.rect.scale_xy(sx, sy)))
}

/// Clamp a region so it lies fully inside `bounds`.
///
/// The size is clamped down to the bounds first, then the position is
/// clamped to `[0, bounds - size]`. Non-finite values clamp to zero.
/// Idempotent: clamping an already clamped region returns it unchanged.
pub fn clamp_region(region: CropRegion, bounds: Size) -> CropRegion {
    let bound_w = finite_or_zero(bounds.width).max(0.0);
    let bound_h = finite_or_zero(bounds.height).max(0.0);

    let width = finite_or_zero(region.rect.width).clamp(0.0, bound_w);
    let height = finite_or_zero(region.rect.height).clamp(0.0, bound_h);
    let x = finite_or_zero(region.rect.x).clamp(0.0, bound_w - width);
    let y = finite_or_zero(region.rect.y).clamp(0.0, bound_h - height);

    CropRegion {
        rect: Rect::new(x, y, width, height),
        space: region.space,
    }
}

/// Clamp a zoom factor into `[min, max]`. NaN clamps to `min`.
pub fn clamp_zoom(zoom: f64, min: f64, max: f64) -> f64 {
    if zoom.is_nan() {
        return min;
    }
    min.max(max.min(zoom))
}

/// Normalize a rotation angle for the given representation.
///
/// - [`RotationMode::Continuous`]: wraps into `[-180, 180)`
/// - [`RotationMode::QuarterTurns`]: wraps into `[0, 360)` and rounds to the
///   nearest multiple of 90
///
/// Non-finite angles normalize to 0.
pub fn normalize_rotation(degrees: f64, mode: RotationMode) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }

    match mode {
        RotationMode::Continuous => {
            if (-180.0..180.0).contains(&degrees) {
                return degrees;
            }
            let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
            // rem_euclid can round up to the modulus for tiny negative inputs
            if wrapped >= 180.0 {
                wrapped - 360.0
            } else {
                wrapped
            }
        }
        RotationMode::QuarterTurns => {
            let wrapped = ((degrees % 360.0) + 360.0) % 360.0;
            let snapped = (wrapped / 90.0).round() * 90.0;
            if snapped >= 360.0 {
                0.0
            } else {
                snapped
            }
        }
    }
}

/// Largest size with the given aspect ratio (width / height) inside `bounds`.
///
/// An invalid aspect ratio (zero, negative or non-finite) returns `bounds`.
pub fn fit_aspect(bounds: Size, aspect: f64) -> Size {
    if !(aspect.is_finite() && aspect > 0.0) || bounds.is_empty() {
        return bounds;
    }

    if bounds.width / bounds.height > aspect {
        // Bounds are wider than the target: constrain by height
        Size::new(bounds.height * aspect, bounds.height)
    } else {
        // Bounds are taller than (or equal to) the target: constrain by width
        Size::new(bounds.width, bounds.width / aspect)
    }
}

/// Display size of an image laid out with contain-fit inside `container`.
pub fn contain_fit(natural: Size, container: Size) -> Size {
    if natural.is_empty() || container.is_empty() {
        return Size::default();
    }

    let scale = (container.width / natural.width).min(container.height / natural.height);
    natural.scale(scale)
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// A 2D affine transform in the canvas convention:
///
/// ```text
/// x' = a*x + c*y + e
/// y' = b*x + d*y + f
/// ```
///
/// The builder methods ([`translate`](Self::translate),
/// [`rotate_degrees`](Self::rotate_degrees), [`scale`](Self::scale)) append
/// to the current transform the way a 2D drawing context does: the last call
/// applies to the drawn content first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Clockwise rotation by `degrees` (y axis pointing down).
    ///
    /// Exact multiples of 90 produce exact 0/±1 entries so quarter turns map
    /// pixel centers onto pixel centers without rounding drift.
    pub fn rotation_degrees(degrees: f64) -> Self {
        let (sin, cos) = sin_cos_degrees(degrees);
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Matrix product `self * other`: `other` is applied to a point first.
    pub fn multiply(&self, other: &Affine2) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn translate(self, tx: f64, ty: f64) -> Self {
        self.multiply(&Self::translation(tx, ty))
    }

    pub fn rotate_degrees(self, degrees: f64) -> Self {
        self.multiply(&Self::rotation_degrees(degrees))
    }

    pub fn scale(self, sx: f64, sy: f64) -> Self {
        self.multiply(&Self::scaling(sx, sy))
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return None;
        }

        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }

    /// True when the linear part is a pure quarter turn or flip with unit
    /// scale, i.e. pixels map one-to-one without resampling.
    pub fn is_pixel_aligned(&self) -> bool {
        let unit = |v: f64| v == 1.0 || v == -1.0;
        (self.b == 0.0 && self.c == 0.0 && unit(self.a) && unit(self.d))
            || (self.a == 0.0 && self.d == 0.0 && unit(self.b) && unit(self.c))
    }
}

/// `(sin, cos)` of an angle in degrees, exact at multiples of 90.
fn sin_cos_degrees(degrees: f64) -> (f64, f64) {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped % 90.0 == 0.0 {
        match (wrapped / 90.0) as u32 {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            3 => (-1.0, 0.0),
            // rem_euclid rounding up to 360
            _ => (0.0, 1.0),
        }
    } else {
        degrees.to_radians().sin_cos()
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
