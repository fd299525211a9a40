//! Image decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use log::debug;

use super::{DecodeError, Orientation, SourceImage};

/// Decode an image file, applying EXIF orientation correction.
///
/// The format is sniffed from the content; `declared_mime` (the MIME type
/// reported by the file picker) is only used as a fallback when sniffing
/// fails. An empty declared type is accepted.
///
/// # Errors
///
/// - `DecodeError::Empty` if `bytes` is empty
/// - `DecodeError::UnsupportedMimeType` if `declared_mime` is not `image/*`
/// - `DecodeError::InvalidFormat` if the format is unknown or unsupported
/// - `DecodeError::CorruptedFile` if the data is truncated or corrupt
pub fn decode_image(bytes: &[u8], declared_mime: &str) -> Result<SourceImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if !declared_mime.is_empty() && !declared_mime.starts_with("image/") {
        return Err(DecodeError::UnsupportedMimeType(declared_mime.to_string()));
    }

    // Extract EXIF orientation before decoding
    let orientation = get_orientation(bytes);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        match ImageFormat::from_mime_type(declared_mime) {
            Some(format) => reader.set_format(format),
            None => return Err(DecodeError::InvalidFormat),
        }
    }

    let format = reader.format();
    let img = reader.decode().map_err(|e| match e {
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        other => DecodeError::CorruptedFile(other.to_string()),
    })?;

    let (stored_width, stored_height) = (img.width(), img.height());
    let oriented = apply_orientation(img, orientation);
    let rgba = oriented.into_rgba8();

    debug!(
        "decoded {:?} image {}x{} (stored {}x{}, orientation {:?}, swapped {})",
        format,
        rgba.width(),
        rgba.height(),
        stored_width,
        stored_height,
        orientation,
        orientation.swaps_dimensions()
    );

    Ok(SourceImage::from_rgba(rgba))
}

/// Extract EXIF orientation from image bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    let exif_reader = Reader::new();
    let mut cursor = Cursor::new(bytes);

    match exif_reader.read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    // Minimal valid JPEG bytes (1x1 gray pixel, no EXIF)
    const MINIMAL_JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06,
        0x05, 0x08, 0x07, 0x07, 0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B,
        0x0C, 0x19, 0x12, 0x13, 0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20,
        0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C, 0x30, 0x31,
        0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D, 0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF,
        0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00,
        0x1F, 0x00, 0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
        0xFF, 0xC4, 0x00, 0xB5, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05,
        0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21,
        0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
        0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A,
        0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37,
        0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56,
        0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75,
        0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93,
        0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9,
        0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6,
        0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
        0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0xFB, 0xD5,
        0xDB, 0x20, 0xA8, 0xF1, 0x7E, 0xFF, 0xD9,
    ];

    /// Encode an RGBA buffer as PNG for decode tests.
    fn png_bytes(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(pixels, width, height, ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    /// Encode an RGB buffer as JPEG and splice in an EXIF APP1 segment
    /// carrying `orientation` right after SOI.
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
        let pixels = vec![128u8; (width * height * 3) as usize];
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 90)
            .write_image(&pixels, width, height, ExtendedColorType::Rgb8)
            .unwrap();

        // Big-endian TIFF header, IFD0 with a single SHORT Orientation entry
        let mut tiff = vec![b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0x00, 0x00]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&tiff);
        let length = (payload.len() + 2) as u16;

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_decode_applies_exif_rotation() {
        let bytes = jpeg_with_orientation(4, 2, 6);
        assert_eq!(get_orientation(&bytes), Orientation::Rotate90CW);

        let img = decode_image(&bytes, "image/jpeg").unwrap();
        assert_eq!(img.natural_width(), 2);
        assert_eq!(img.natural_height(), 4);
    }

    #[test]
    fn test_decode_exif_rotate180_keeps_dimensions() {
        let bytes = jpeg_with_orientation(4, 2, 3);
        assert_eq!(get_orientation(&bytes), Orientation::Rotate180);

        let img = decode_image(&bytes, "image/jpeg").unwrap();
        assert_eq!(img.natural_width(), 4);
        assert_eq!(img.natural_height(), 2);
    }

    #[test]
    fn test_decode_valid_jpeg() {
        let result = decode_image(MINIMAL_JPEG, "image/jpeg");
        assert!(result.is_ok(), "Failed to decode valid JPEG: {:?}", result);

        let img = result.unwrap();
        assert_eq!(img.natural_width(), 1);
        assert_eq!(img.natural_height(), 1);
        assert_eq!(img.pixels().as_raw().len(), 4); // 1x1 RGBA
    }

    #[test]
    fn test_decode_png_preserves_pixels() {
        let pixels: Vec<u8> = (0..3 * 2 * 4).map(|i| (i * 9) as u8).collect();
        let bytes = png_bytes(3, 2, &pixels);

        let img = decode_image(&bytes, "image/png").unwrap();
        assert_eq!(img.natural_width(), 3);
        assert_eq!(img.natural_height(), 2);
        assert_eq!(img.pixels().as_raw(), &pixels);
    }

    #[test]
    fn test_decode_sniffs_despite_wrong_declared_type() {
        let bytes = png_bytes(2, 2, &[255u8; 16]);
        let img = decode_image(&bytes, "image/jpeg").unwrap();
        assert_eq!(img.natural_width(), 2);
    }

    #[test]
    fn test_decode_accepts_empty_declared_type() {
        assert!(decode_image(MINIMAL_JPEG, "").is_ok());
    }

    #[test]
    fn test_decode_rejects_non_image_mime() {
        let result = decode_image(MINIMAL_JPEG, "application/pdf");
        assert!(matches!(result, Err(DecodeError::UnsupportedMimeType(m)) if m == "application/pdf"));
    }

    #[test]
    fn test_decode_empty_bytes() {
        assert!(matches!(decode_image(&[], "image/png"), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_unknown_bytes_without_hint() {
        let result = decode_image(&[0x00, 0x01, 0x02, 0x03], "");
        assert!(matches!(result, Err(DecodeError::InvalidFormat)));
    }

    #[test]
    fn test_decode_garbage_with_declared_type() {
        let result = decode_image(&[0x00, 0x01, 0x02, 0x03], "image/png");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_truncated_jpeg() {
        let truncated = &MINIMAL_JPEG[0..20];
        assert!(decode_image(truncated, "image/jpeg").is_err());
    }

    #[test]
    fn test_orientation_extraction_no_exif() {
        assert_eq!(get_orientation(MINIMAL_JPEG), Orientation::Normal);
    }

    #[test]
    fn test_orientation_extraction_invalid_data() {
        assert_eq!(get_orientation(&[0x00, 0x01, 0x02]), Orientation::Normal);
    }

    #[test]
    fn test_apply_orientation_rotate90_swaps_dimensions() {
        let rgb_img = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let result = apply_orientation(DynamicImage::ImageRgb8(rgb_img), Orientation::Rotate90CW);
        assert_eq!(result.into_rgb8().dimensions(), (1, 2));
    }

    #[test]
    fn test_apply_orientation_rotate180() {
        let rgb_img = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let result = apply_orientation(DynamicImage::ImageRgb8(rgb_img), Orientation::Rotate180);
        let rgb = result.into_rgb8();

        assert_eq!(rgb.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_apply_orientation_flip_horizontal() {
        let rgb_img = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let result =
            apply_orientation(DynamicImage::ImageRgb8(rgb_img), Orientation::FlipHorizontal);
        let rgb = result.into_rgb8();

        assert_eq!(rgb.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 0]);
    }
}
