//! Cropframe Core - Crop, rotate and rasterize engine
//!
//! This crate provides the engine behind an interactive image cropper:
//! crop geometry, the per-session transform model, pointer and slider
//! interaction, decoding, rasterization of the final crop, and encoding.
//!
//! # Flow
//!
//! ```text
//! bytes -> decode -> CropSession (TransformModel) -> interaction -> apply
//!       -> rasterize (safe surface, rotate, crop, resize) -> encode -> upload
//! ```

pub mod config;
pub mod decode;
pub mod encode;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod raster;
pub mod session;
pub mod upload;

pub use config::{ConfigError, CropConfig, OutputSpec, RasterOptions, ZoomBounds};
pub use decode::{decode_image, DecodeError, SourceImage};
pub use encode::{EncodeError, EncodedImage, OutputFormat};
pub use geometry::{
    clamp_region, clamp_zoom, display_to_natural, normalize_rotation, safe_canvas_size,
    CoordinateSpace, CropRegion, GeometryError, Point, Rect, RotationMode, Size,
};
pub use interaction::{DragController, DragState, PointerEvent, SliderController};
pub use model::{Transform, TransformModel, TransformSnapshot};
pub use raster::{rasterize, CpuBackend, FilterType, RasterBackend, RasterError};
pub use session::{ApplyError, CropError, CropSession};
pub use upload::{UploadError, UploadPipeline};
