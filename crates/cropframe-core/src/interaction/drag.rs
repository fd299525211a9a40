//! Pointer-drag front-end.
//!
//! # State Machine
//!
//! ```text
//! Idle --(down inside region)--> Dragging
//! Dragging --(move, same pointer)--> Dragging
//! Dragging --(up | cancel, same pointer)--> Idle
//! ```
//!
//! While dragging, the region is placed at the captured start position plus
//! the total pointer delta. Placement is absolute rather than cumulative, so
//! a clamped move does not accumulate error.
//!
//! Zoom and viewport changes may resize the region mid-drag. When a move
//! finds the region size differs from the captured one, the drag re-anchors
//! at the region's current position and the last pointer position, so the
//! region follows the pointer from where it is now.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};
use crate::model::TransformModel;

/// A pointer event in display-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub pointer_id: i32,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(pointer_id: i32, x: f64, y: f64) -> Self {
        Self { pointer_id, x, y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Drag state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        pointer_id: i32,
        /// Pointer position at capture.
        origin: Point,
        /// Region top-left at capture.
        start: Point,
        /// Region size at capture.
        size: Size,
        /// Most recent pointer position.
        last: Point,
    },
}

/// Drives [`TransformModel::move_to`] from pointer events.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start a drag if idle and the pointer lands inside the region.
    ///
    /// Returns `true` if the pointer was captured.
    pub fn pointer_down(&mut self, model: &TransformModel, event: PointerEvent) -> bool {
        if self.is_dragging() {
            trace!("pointer {} down ignored: drag in progress", event.pointer_id);
            return false;
        }

        let origin = event.position();
        if !model.region_contains(origin) {
            return false;
        }

        let region = model.region().rect;
        self.state = DragState::Dragging {
            pointer_id: event.pointer_id,
            origin,
            start: region.origin(),
            size: region.size(),
            last: origin,
        };
        trace!("drag start pointer {} at {:?}", event.pointer_id, origin);
        true
    }

    /// Move the region with the captured pointer.
    ///
    /// Returns `true` if the event belonged to the active drag.
    pub fn pointer_move(&mut self, model: &mut TransformModel, event: PointerEvent) -> bool {
        let DragState::Dragging {
            pointer_id,
            mut origin,
            mut start,
            mut size,
            last,
        } = self.state
        else {
            return false;
        };
        if pointer_id != event.pointer_id {
            return false;
        }

        let region = model.region().rect;
        if region.size() != size {
            trace!("region resized mid-drag, re-anchoring at {:?}", last);
            origin = last;
            start = region.origin();
            size = region.size();
        }

        let dx = event.x - origin.x;
        let dy = event.y - origin.y;
        model.move_to(start.x + dx, start.y + dy);

        self.state = DragState::Dragging {
            pointer_id,
            origin,
            start,
            size,
            last: event.position(),
        };
        true
    }

    /// End the drag if the event belongs to the captured pointer.
    pub fn pointer_up(&mut self, event: PointerEvent) -> bool {
        self.release(event.pointer_id)
    }

    /// Abort the drag; the region keeps its last position.
    pub fn pointer_cancel(&mut self, event: PointerEvent) -> bool {
        self.release(event.pointer_id)
    }

    fn release(&mut self, id: i32) -> bool {
        match self.state {
            DragState::Dragging { pointer_id, .. } if pointer_id == id => {
                self.state = DragState::Idle;
                trace!("drag end pointer {}", id);
                true
            }
            _ => false,
        }
    }
}
