//! Interaction front-ends that turn user input into model mutations.
//!
//! Two front-ends share one mutation contract, the methods of
//! [`TransformModel`](crate::model::TransformModel):
//!
//! - [`DragController`]: touch/pointer drag of the crop region (mobile)
//! - [`SliderController`]: zoom and rotation sliders plus crop-widget
//!   callbacks (desktop)
//!
//! Zoom and rotation are not drag states; they can change at any time,
//! including mid-drag.

mod drag;
mod slider;

pub use drag::{DragController, DragState, PointerEvent};
pub use slider::SliderController;
