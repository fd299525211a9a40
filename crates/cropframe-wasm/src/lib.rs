//! Cropframe WASM - WebAssembly bindings for Cropframe
//!
//! This crate exposes the cropframe-core crop engine to JavaScript/TypeScript
//! applications.
//!
//! # Module Structure
//!
//! - `session` - Crop session: decode, interact, apply
//! - `geometry` - Clamping helpers for host-rendered previews
//! - `logger` - Forwards `log` records to the browser console
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsCropSession } from '@cropframe/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const session = new JsCropSession(bytes, file.type, undefined, 600, 600);
//! session.set_zoom(1.5);
//! const jpeg = session.apply();
//! ```

use wasm_bindgen::prelude::*;

mod geometry;
mod logger;
mod session;

// Re-export public types
pub use geometry::{clamp_zoom, normalize_rotation, safe_canvas_size};
pub use logger::set_log_level;
pub use session::JsCropSession;

/// Initialize the WASM module (called automatically on load).
///
/// Installs the console logger at `warn`; use `set_log_level` to see more.
#[wasm_bindgen(start)]
pub fn init() {
    logger::install(log::LevelFilter::Warn);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
