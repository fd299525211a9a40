//! Geometry helpers for JavaScript previews.
//!
//! A host that renders its own live preview (CSS transforms on an `<img>`)
//! uses these so the preview clamps exactly like the engine does.

use cropframe_core::geometry::{self, RotationMode};
use wasm_bindgen::prelude::*;

/// Side of the square surface that holds the image under any rotation.
///
/// Returned as `f64` so JavaScript gets a number rather than a BigInt.
#[wasm_bindgen]
pub fn safe_canvas_size(width: u32, height: u32) -> f64 {
    geometry::safe_canvas_size(width, height) as f64
}

#[wasm_bindgen]
pub fn clamp_zoom(zoom: f64, min: f64, max: f64) -> f64 {
    geometry::clamp_zoom(zoom, min, max)
}

/// Normalize an angle: `[-180, 180)` by default, or a multiple of 90 in
/// `[0, 360)` when `quarter_turns` is set.
#[wasm_bindgen]
pub fn normalize_rotation(degrees: f64, quarter_turns: bool) -> f64 {
    let mode = if quarter_turns {
        RotationMode::QuarterTurns
    } else {
        RotationMode::Continuous
    };
    geometry::normalize_rotation(degrees, mode)
}
