//! Slider and crop-widget front-end.
//!
//! Stateless: every callback maps directly onto one model mutation.

use crate::geometry::Rect;
use crate::model::TransformModel;

/// Applies slider changes and crop-widget reports to a [`TransformModel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SliderController;

impl SliderController {
    pub fn new() -> Self {
        Self
    }

    /// Zoom slider moved.
    pub fn on_zoom_change(&self, model: &mut TransformModel, zoom: f64) {
        model.set_zoom(zoom);
    }

    /// Rotation slider moved.
    pub fn on_rotation_change(&self, model: &mut TransformModel, degrees: f64) {
        model.set_rotation(degrees);
    }

    /// The crop widget reports a relative move of the crop frame.
    pub fn on_crop_moved(&self, model: &mut TransformModel, dx: f64, dy: f64) {
        model.move_by(dx, dy);
    }

    /// The crop widget reports an absolute crop area in display space.
    pub fn on_crop_area_change(&self, model: &mut TransformModel, area: Rect) {
        model.set_region(area);
    }
}
