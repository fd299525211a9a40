//! Output encoding for cropped rasters.
//!
//! This module provides functionality for:
//! - Encoding RGBA pixels to JPEG (with quality), PNG or lossless WebP
//! - Mapping MIME types to output formats
//! - Producing data URIs from encoded output
//!
//! All operations are synchronous; hosts that need an asynchronous encode
//! step run them off the UI thread.

mod codec;

pub use codec::{encode_rgba, jpeg_quality, EncodeError, EncodedImage, OutputFormat};
