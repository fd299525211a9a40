//! Image decoding for crop sessions.
//!
//! This module provides functionality for:
//! - Decoding a user-picked image file (JPEG, PNG, WebP) into RGBA pixels
//! - Applying EXIF orientation so natural dimensions match what the user sees
//!
//! A [`SourceImage`] only exists once decoding has succeeded, which is what
//! gates the creation of a crop session.

mod reader;
mod types;

pub use reader::{decode_image, get_orientation};
pub use types::{DecodeError, Orientation, SourceImage};
