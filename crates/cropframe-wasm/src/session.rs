//! Crop session bindings.
//!
//! # Example
//!
//! ```typescript
//! import { JsCropSession } from '@cropframe/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const session = new JsCropSession(bytes, file.type, {
//!   output: { targetWidth: 400, targetHeight: 300, aspectRatio: 4 / 3 },
//!   rotationMode: 'quarterTurns',
//! }, box.width, box.height);
//!
//! canvas.onpointerdown = (e) => session.pointer_down(e.pointerId, e.offsetX, e.offsetY);
//! canvas.onpointermove = (e) => session.pointer_move(e.pointerId, e.offsetX, e.offsetY);
//! canvas.onpointerup = (e) => session.pointer_up(e.pointerId, e.offsetX, e.offsetY);
//!
//! const jpeg = session.apply();
//! ```

use cropframe_core::{
    CropConfig, CropError, CropSession, EncodedImage, PointerEvent, Rect, Size,
};
use wasm_bindgen::prelude::*;

/// A crop session for JavaScript.
///
/// Wraps the core session in an `Option` because applying consumes it: after
/// a successful or fatal `apply()` the session is closed and every further
/// call fails. A retryable failure (empty crop) keeps it open.
#[wasm_bindgen]
pub struct JsCropSession {
    inner: Option<CropSession>,
}

#[wasm_bindgen]
impl JsCropSession {
    /// Decode an image and open a session.
    ///
    /// # Arguments
    /// * `bytes` - Encoded image file
    /// * `mime_type` - Declared MIME type, e.g. `file.type`
    /// * `config` - Partial `CropConfig` object; `undefined` uses defaults
    /// * `container_width`, `container_height` - Layout box for the image
    #[wasm_bindgen(constructor)]
    pub fn new(
        bytes: &[u8],
        mime_type: &str,
        config: JsValue,
        container_width: f64,
        container_height: f64,
    ) -> Result<JsCropSession, JsValue> {
        let config = parse_config(config)?;
        Self::open(bytes, mime_type, config, container_width, container_height)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Whether the session can still be edited and applied.
    #[wasm_bindgen(getter)]
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    #[wasm_bindgen(getter)]
    pub fn natural_width(&self) -> u32 {
        self.inner
            .as_ref()
            .map_or(0, |s| s.source().natural_width())
    }

    #[wasm_bindgen(getter)]
    pub fn natural_height(&self) -> u32 {
        self.inner
            .as_ref()
            .map_or(0, |s| s.source().natural_height())
    }

    #[wasm_bindgen(getter)]
    pub fn viewport_width(&self) -> f64 {
        self.inner.as_ref().map_or(0.0, |s| s.viewport().width)
    }

    #[wasm_bindgen(getter)]
    pub fn viewport_height(&self) -> f64 {
        self.inner.as_ref().map_or(0.0, |s| s.viewport().height)
    }

    #[wasm_bindgen(getter)]
    pub fn zoom(&self) -> f64 {
        self.inner.as_ref().map_or(1.0, |s| s.model().zoom())
    }

    #[wasm_bindgen(getter)]
    pub fn rotation(&self) -> f64 {
        self.inner.as_ref().map_or(0.0, |s| s.model().rotation())
    }

    /// Current display-space crop region as `{ x, y, width, height }`.
    pub fn region(&self) -> Result<JsValue, JsValue> {
        let rect = self.session()?.model().region().rect;
        serde_wasm_bindgen::to_value(&rect).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Frozen copy of the transform state (region, zoom, rotation, viewport).
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.session()?.snapshot();
        serde_wasm_bindgen::to_value(&snapshot).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns `true` if the pointer started a drag.
    pub fn pointer_down(&mut self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.with_session(|s| s.pointer_down(PointerEvent::new(pointer_id, x, y)))
            .unwrap_or(false)
    }

    pub fn pointer_move(&mut self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.with_session(|s| s.pointer_move(PointerEvent::new(pointer_id, x, y)))
            .unwrap_or(false)
    }

    pub fn pointer_up(&mut self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.with_session(|s| s.pointer_up(PointerEvent::new(pointer_id, x, y)))
            .unwrap_or(false)
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32, x: f64, y: f64) -> bool {
        self.with_session(|s| s.pointer_cancel(PointerEvent::new(pointer_id, x, y)))
            .unwrap_or(false)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.with_session(|s| s.set_zoom(zoom));
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.with_session(|s| s.set_rotation(degrees));
    }

    pub fn rotate_by(&mut self, delta_degrees: f64) {
        self.with_session(|s| s.rotate_by(delta_degrees));
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.with_session(|s| s.move_by(dx, dy));
    }

    /// Crop area reported by a cropping widget, in display pixels.
    pub fn set_crop_area(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.with_session(|s| s.set_crop_area(Rect::new(x, y, width, height)));
    }

    pub fn resize_container(&mut self, width: f64, height: f64) {
        self.with_session(|s| s.resize_container(Size::new(width, height)));
    }

    /// Rasterize and encode the crop, returning the output file bytes.
    ///
    /// Closes the session unless the error is retryable.
    pub fn apply(&mut self) -> Result<Vec<u8>, JsValue> {
        self.apply_encoded()
            .map(|encoded| encoded.bytes)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Like [`apply`](Self::apply), returning a `data:` URI.
    pub fn apply_data_uri(&mut self) -> Result<String, JsValue> {
        self.apply_encoded()
            .map(|encoded| encoded.to_data_uri())
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Close the session without output.
    pub fn cancel(&mut self) {
        if let Some(session) = self.inner.take() {
            session.cancel();
        }
    }
}

impl JsCropSession {
    pub(crate) fn open(
        bytes: &[u8],
        mime_type: &str,
        config: CropConfig,
        container_width: f64,
        container_height: f64,
    ) -> Result<Self, CropError> {
        let session = CropSession::open(
            bytes,
            mime_type,
            config,
            Size::new(container_width, container_height),
        )?;
        Ok(Self {
            inner: Some(session),
        })
    }

    fn session(&self) -> Result<&CropSession, JsValue> {
        self.inner
            .as_ref()
            .ok_or_else(|| JsValue::from_str(SESSION_CLOSED))
    }

    fn with_session<T>(&mut self, f: impl FnOnce(&mut CropSession) -> T) -> Option<T> {
        self.inner.as_mut().map(f)
    }

    pub(crate) fn apply_encoded(&mut self) -> Result<EncodedImage, String> {
        let session = self.inner.take().ok_or_else(|| SESSION_CLOSED.to_string())?;
        match session.apply_cpu() {
            Ok(encoded) => Ok(encoded),
            Err(err) => {
                let (error, session) = err.into_parts();
                self.inner = session;
                Err(error.to_string())
            }
        }
    }
}

const SESSION_CLOSED: &str = "Crop session is closed";

/// `undefined`/`null` means all defaults.
fn parse_config(value: JsValue) -> Result<CropConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(CropConfig::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid crop config: {}", e)))
}
