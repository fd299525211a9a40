//! The mutable transform state of one crop session.
//!
//! A [`TransformModel`] holds the display-space crop region, the zoom factor
//! and the rotation angle. Its fields are private and every mutation
//! re-clamps through [`crate::geometry`], so the model can never be observed
//! in an invariant-violating state:
//!
//! - the region lies inside the viewport
//! - `min_zoom <= zoom <= max_zoom`
//! - rotation is normalized for the configured [`RotationMode`]
//!
//! # Zoom
//!
//! Zoom magnifies the image under a fixed crop frame. In display space this
//! is the same as shrinking the crop region: the region size is
//! `base_size / zoom`, where `base_size` is the region size at zoom 1. Zoom
//! changes rescale the region about its center.

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::ZoomBounds;
use crate::geometry::{
    clamp_region, fit_aspect, normalize_rotation, CropRegion, Point, Rect, RotationMode, Size,
};

/// Zoom and rotation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub zoom: f64,
    pub rotation_degrees: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            rotation_degrees: 0.0,
        }
    }
}

/// An immutable copy of the model, read by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSnapshot {
    /// Display-space crop region.
    pub region: CropRegion,
    pub transform: Transform,
    /// Viewport the region was measured against.
    pub viewport: Size,
}

/// Crop region, zoom and rotation for one editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformModel {
    viewport: Size,
    aspect: f64,
    region: Rect,
    base_size: Size,
    zoom: f64,
    rotation: f64,
    zoom_bounds: ZoomBounds,
    rotation_mode: RotationMode,
}

impl TransformModel {
    /// Maximal centered region with the output aspect ratio, at zoom 1 and
    /// rotation 0.
    ///
    /// If `1.0` lies outside `zoom_bounds`, the zoom starts at the nearest
    /// bound instead.
    pub fn init_centered(
        viewport: Size,
        output_aspect: f64,
        zoom_bounds: ZoomBounds,
        rotation_mode: RotationMode,
    ) -> Self {
        let viewport = sanitize_viewport(viewport);
        let mut model = Self {
            viewport,
            aspect: output_aspect,
            region: Rect::default(),
            base_size: Size::default(),
            zoom: zoom_bounds.clamp(1.0),
            rotation: 0.0,
            zoom_bounds,
            rotation_mode,
        };
        model.recenter();
        model
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Current crop region in display space.
    pub fn region(&self) -> CropRegion {
        CropRegion::display(self.region)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn transform(&self) -> Transform {
        Transform {
            zoom: self.zoom,
            rotation_degrees: self.rotation,
        }
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        self.zoom_bounds
    }

    pub fn rotation_mode(&self) -> RotationMode {
        self.rotation_mode
    }

    /// Set the zoom factor, clamped to the zoom bounds.
    ///
    /// The region is resized to `base_size / zoom` about its current center,
    /// shrunk uniformly if it no longer fits, and clamped back into the
    /// viewport. The aspect ratio survives zooming out past the viewport.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            warn!("non-finite zoom {} clamped to bounds", zoom);
        }
        self.zoom = self.zoom_bounds.clamp(zoom);

        let size = fit_within(self.base_size.scale(1.0 / self.zoom), self.viewport);
        self.region = self.clamped(Rect::centered_at(self.region.center(), size));
        trace!("zoom -> {} region {:?}", self.zoom, self.region);
    }

    /// Set the absolute rotation angle, normalized for the rotation mode.
    pub fn set_rotation(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            warn!("non-finite rotation {} reset to 0", degrees);
        }
        self.rotation = normalize_rotation(degrees, self.rotation_mode);
        trace!("rotation -> {}", self.rotation);
    }

    /// Rotate relative to the current angle.
    pub fn rotate_by(&mut self, delta_degrees: f64) {
        if !delta_degrees.is_finite() {
            warn!("non-finite rotation delta {} ignored", delta_degrees);
            return;
        }
        self.set_rotation(self.rotation + delta_degrees);
    }

    /// Move the region by a delta, clamped to the viewport.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        let dx = finite_delta(dx);
        let dy = finite_delta(dy);
        self.region = self.clamped(self.region.translate(dx, dy));
        trace!("move_by ({}, {}) -> {:?}", dx, dy, self.region);
    }

    /// Place the region's top-left corner, clamped to the viewport.
    pub fn move_to(&mut self, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            warn!("non-finite position ({}, {}) clamped", x, y);
        }
        let target = Rect::new(x, y, self.region.width, self.region.height);
        self.region = self.clamped(target);
        trace!("move_to -> {:?}", self.region);
    }

    /// Replace the region, e.g. with a crop area reported by a cropping
    /// widget or a previously stored crop.
    ///
    /// The zoom-1 base size is recomputed as `size * zoom` so later zoom
    /// changes scale from this region.
    pub fn set_region(&mut self, rect: Rect) {
        self.region = self.clamped(rect);
        self.base_size = self.region.size().scale(self.zoom);
        trace!("set_region -> {:?}", self.region);
    }

    /// Adapt to a new on-screen viewport size.
    ///
    /// Region and base size scale proportionally with the viewport. If the
    /// previous viewport was empty there is nothing to scale from, so the
    /// region is recentered at the current zoom.
    pub fn resize_viewport(&mut self, viewport: Size) {
        let viewport = sanitize_viewport(viewport);
        let old = self.viewport;
        self.viewport = viewport;

        if old.is_empty() || viewport.is_empty() {
            self.recenter();
        } else {
            let sx = viewport.width / old.width;
            let sy = viewport.height / old.height;
            self.base_size = Size::new(self.base_size.width * sx, self.base_size.height * sy);
            self.region = self.clamped(self.region.scale_xy(sx, sy));
        }
        trace!("viewport -> {:?} region {:?}", self.viewport, self.region);
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> TransformSnapshot {
        TransformSnapshot {
            region: self.region(),
            transform: self.transform(),
            viewport: self.viewport,
        }
    }

    /// Whether a display-space point falls inside the region.
    pub fn region_contains(&self, point: Point) -> bool {
        self.region.contains_point(point)
    }

    fn recenter(&mut self) {
        self.base_size = fit_aspect(self.viewport, self.aspect);
        let size = fit_within(self.base_size.scale(1.0 / self.zoom), self.viewport);
        let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        self.region = self.clamped(Rect::centered_at(center, size));
    }

    fn clamped(&self, rect: Rect) -> Rect {
        clamp_region(CropRegion::display(rect), self.viewport).rect
    }
}

fn sanitize_viewport(viewport: Size) -> Size {
    let dim = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    let sanitized = Size::new(dim(viewport.width), dim(viewport.height));
    if sanitized != viewport {
        warn!("invalid viewport {:?} treated as {:?}", viewport, sanitized);
    }
    sanitized
}

/// Scale `size` down uniformly until it fits inside `viewport`.
fn fit_within(size: Size, viewport: Size) -> Size {
    let factor = (viewport.width / size.width)
        .min(viewport.height / size.height)
        .min(1.0);
    size.scale(factor)
}

fn finite_delta(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        warn!("non-finite delta {} ignored", v);
        0.0
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
