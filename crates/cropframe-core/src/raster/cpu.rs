//! RGBA8 pixel-buffer backend built on the `image` crate.
//!
//! # Drawing
//!
//! Drawing uses inverse mapping: for each surface pixel inside the drawn
//! footprint, the inverse transform gives the source coordinate to sample.
//!
//! - Pixel-aligned transforms (quarter turns, flips, integer translation)
//!   copy the nearest source pixel, so 0/90/180/270 rotations are lossless
//! - Any other transform samples bilinearly on premultiplied alpha; surface
//!   pixels that map outside the source stay transparent

use image::{Rgba, RgbaImage};

use super::{FilterType, PixelRect, RasterBackend, RasterError};
use crate::config::RasterOptions;
use crate::decode::SourceImage;
use crate::encode::{encode_rgba, OutputFormat};
use crate::geometry::{Affine2, Point};

/// CPU implementation of [`RasterBackend`].
#[derive(Debug, Clone, Copy)]
pub struct CpuBackend {
    filter: FilterType,
    max_surface_side: u32,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::from_options(&RasterOptions::default())
    }
}

impl CpuBackend {
    pub fn new(filter: FilterType, max_surface_side: u32) -> Self {
        Self {
            filter,
            max_surface_side,
        }
    }

    pub fn from_options(options: &RasterOptions) -> Self {
        Self::new(options.filter(), options.max_surface_side())
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    pub fn max_surface_side(&self) -> u32 {
        self.max_surface_side
    }
}

impl RasterBackend for CpuBackend {
    type Surface = RgbaImage;

    fn create_surface(&self, width: u32, height: u32) -> Result<RgbaImage, RasterError> {
        let unavailable = || RasterError::SurfaceUnavailable {
            width: width as u64,
            height: height as u64,
        };

        if width == 0 || height == 0 || width > self.max_surface_side || height > self.max_surface_side
        {
            return Err(unavailable());
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(unavailable)?;

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).map_err(|_| unavailable())?;
        buffer.resize(len, 0);

        RgbaImage::from_raw(width, height, buffer).ok_or_else(unavailable)
    }

    fn draw_image(
        &self,
        surface: &mut RgbaImage,
        source: &SourceImage,
        transform: &Affine2,
    ) -> Result<(), RasterError> {
        if source.is_empty() {
            return Ok(());
        }
        let inverse = transform
            .inverse()
            .ok_or(RasterError::SingularTransform)?;

        let Some((x0, y0, x1, y1)) = footprint(surface, source, transform) else {
            return Ok(());
        };

        let aligned = transform.is_pixel_aligned();
        let src = source.pixels();

        for dst_y in y0..y1 {
            for dst_x in x0..x1 {
                // Sample at the pixel center
                let p = inverse.apply(Point::new(dst_x as f64 + 0.5, dst_y as f64 + 0.5));

                let pixel = if aligned {
                    sample_nearest(src, p.x, p.y)
                } else {
                    sample_bilinear(src, p.x - 0.5, p.y - 0.5)
                };

                if let Some(pixel) = pixel {
                    surface.put_pixel(dst_x, dst_y, pixel);
                }
            }
        }

        Ok(())
    }

    fn extract_region(
        &self,
        surface: &RgbaImage,
        region: PixelRect,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, RasterError> {
        if width == 0 || height == 0 || width > self.max_surface_side || height > self.max_surface_side
        {
            return Err(RasterError::SurfaceUnavailable {
                width: width as u64,
                height: height as u64,
            });
        }

        let inside = region.width > 0
            && region.height > 0
            && region.x as u64 + region.width as u64 <= surface.width() as u64
            && region.y as u64 + region.height as u64 <= surface.height() as u64;
        if !inside {
            return Err(RasterError::InvalidCropRegion {
                x: region.x as f64,
                y: region.y as f64,
                width: region.width as f64,
                height: region.height as f64,
            });
        }

        let block =
            image::imageops::crop_imm(surface, region.x, region.y, region.width, region.height)
                .to_image();

        // Fast path: no resampling needed
        if block.width() == width && block.height() == height {
            return Ok(block);
        }

        Ok(image::imageops::resize(
            &block,
            width,
            height,
            self.filter.to_image_filter(),
        ))
    }

    fn encode(
        &self,
        surface: &RgbaImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, RasterError> {
        Ok(encode_rgba(
            surface.as_raw(),
            surface.width(),
            surface.height(),
            format,
            quality,
        )?)
    }
}

/// Surface pixel range `[x0, x1) x [y0, y1)` covered by the transformed
/// source, or `None` if it misses the surface entirely.
fn footprint(
    surface: &RgbaImage,
    source: &SourceImage,
    transform: &Affine2,
) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (
        source.natural_width() as f64,
        source.natural_height() as f64,
    );
    let corners = [
        transform.apply(Point::new(0.0, 0.0)),
        transform.apply(Point::new(w, 0.0)),
        transform.apply(Point::new(0.0, h)),
        transform.apply(Point::new(w, h)),
    ];

    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return None;
    }

    let sw = surface.width() as f64;
    let sh = surface.height() as f64;
    let x0 = min_x.floor().clamp(0.0, sw) as u32;
    let x1 = max_x.ceil().clamp(0.0, sw) as u32;
    let y0 = min_y.floor().clamp(0.0, sh) as u32;
    let y1 = max_y.ceil().clamp(0.0, sh) as u32;

    if x0 >= x1 || y0 >= y1 {
        None
    } else {
        Some((x0, y0, x1, y1))
    }
}

/// The source pixel containing `(x, y)`, or `None` outside the source.
#[inline]
fn sample_nearest(image: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let (px, py) = (x.floor(), y.floor());
    if px < 0.0 || py < 0.0 || px >= image.width() as f64 || py >= image.height() as f64 {
        return None;
    }
    Some(*image.get_pixel(px as u32, py as u32))
}

/// Get a pixel as premultiplied `[f64; 4]`, transparent outside the image.
#[inline]
fn get_premultiplied(image: &RgbaImage, px: i64, py: i64) -> [f64; 4] {
    if px < 0 || py < 0 || px >= image.width() as i64 || py >= image.height() as i64 {
        return [0.0; 4];
    }
    let Rgba([r, g, b, a]) = *image.get_pixel(px as u32, py as u32);
    let alpha = a as f64 / 255.0;
    [r as f64 * alpha, g as f64 * alpha, b as f64 * alpha, a as f64]
}

/// Sample a pixel using bilinear interpolation.
///
/// `(x, y)` is in pixel-center coordinates: `(0, 0)` is the center of the
/// top-left pixel. Neighbors outside the image count as transparent, so
/// edges fade out over one pixel instead of clamping.
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let (w, h) = (image.width() as f64, image.height() as f64);

    // Farther than one pixel from the image: nothing to blend
    if x <= -1.0 || y <= -1.0 || x >= w || y >= h {
        return None;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    // Fractional distances
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_premultiplied(image, x0, y0);
    let p10 = get_premultiplied(image, x1, y0);
    let p01 = get_premultiplied(image, x0, y1);
    let p11 = get_premultiplied(image, x1, y1);

    let mut blended = [0.0f64; 4];
    for i in 0..4 {
        blended[i] = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
    }

    let alpha = blended[3];
    if alpha <= 0.0 {
        return None;
    }

    // Un-premultiply
    let scale = 255.0 / alpha;
    let channel = |v: f64| (v * scale).clamp(0.0, 255.0).round() as u8;
    Some(Rgba([
        channel(blended[0]),
        channel(blended[1]),
        channel(blended[2]),
        alpha.clamp(0.0, 255.0).round() as u8,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{centering_offsets, draw_transform};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn red_blue() -> SourceImage {
        let mut pixels = RgbaImage::new(2, 1);
        pixels.put_pixel(0, 0, RED);
        pixels.put_pixel(1, 0, BLUE);
        SourceImage::from_rgba(pixels)
    }

    #[test]
    fn test_create_surface_is_transparent() {
        let surface = CpuBackend::default().create_surface(3, 2).unwrap();
        assert_eq!(surface.dimensions(), (3, 2));
        assert!(surface.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn test_create_surface_rejects_zero_and_oversized() {
        let backend = CpuBackend::new(FilterType::Nearest, 100);
        assert!(matches!(
            backend.create_surface(0, 10),
            Err(RasterError::SurfaceUnavailable { width: 0, height: 10 })
        ));
        assert!(matches!(
            backend.create_surface(101, 10),
            Err(RasterError::SurfaceUnavailable { .. })
        ));
        assert!(backend.create_surface(100, 100).is_ok());
    }

    #[test]
    fn test_draw_quarter_turn_clockwise() {
        let backend = CpuBackend::default();
        let source = red_blue();
        let mut surface = backend.create_surface(4, 4).unwrap();

        let (ox, oy) = centering_offsets(4, 2, 1);
        let transform = draw_transform(2, 1, ox, oy, 90.0);
        backend.draw_image(&mut surface, &source, &transform).unwrap();

        // The row turns into a column, left end on top
        assert_eq!(*surface.get_pixel(2, 0), RED);
        assert_eq!(*surface.get_pixel(2, 1), BLUE);
        let drawn = surface.pixels().filter(|p| **p != CLEAR).count();
        assert_eq!(drawn, 2);
    }

    #[test]
    fn test_draw_translation_is_exact_copy() {
        let backend = CpuBackend::default();
        let source = red_blue();
        let mut surface = backend.create_surface(5, 3).unwrap();

        backend
            .draw_image(&mut surface, &source, &Affine2::translation(2.0, 1.0))
            .unwrap();

        assert_eq!(*surface.get_pixel(2, 1), RED);
        assert_eq!(*surface.get_pixel(3, 1), BLUE);
        assert_eq!(*surface.get_pixel(1, 1), CLEAR);
    }

    #[test]
    fn test_draw_arbitrary_angle_leaves_corners_transparent() {
        let backend = CpuBackend::default();
        let source = SourceImage::from_rgba(RgbaImage::from_pixel(10, 10, RED));
        let mut surface = backend.create_surface(16, 16).unwrap();

        let (ox, oy) = centering_offsets(16, 10, 10);
        let transform = draw_transform(10, 10, ox, oy, 45.0);
        backend.draw_image(&mut surface, &source, &transform).unwrap();

        assert_eq!(*surface.get_pixel(0, 0), CLEAR);
        assert_eq!(*surface.get_pixel(15, 15), CLEAR);
        assert_eq!(*surface.get_pixel(8, 8), RED);
    }

    #[test]
    fn test_draw_singular_transform() {
        let backend = CpuBackend::default();
        let mut surface = backend.create_surface(4, 4).unwrap();
        let result = backend.draw_image(&mut surface, &red_blue(), &Affine2::scaling(0.0, 1.0));
        assert!(matches!(result, Err(RasterError::SingularTransform)));
    }

    #[test]
    fn test_extract_region_same_size_is_copy() {
        let backend = CpuBackend::default();
        let surface = RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let region = PixelRect {
            x: 2,
            y: 1,
            width: 3,
            height: 2,
        };
        let block = backend.extract_region(&surface, region, 3, 2).unwrap();
        assert_eq!(*block.get_pixel(0, 0), Rgba([2, 1, 0, 255]));
        assert_eq!(*block.get_pixel(2, 1), Rgba([4, 2, 0, 255]));
    }

    #[test]
    fn test_extract_region_resizes() {
        let backend = CpuBackend::new(FilterType::Lanczos3, 1024);
        let surface = RgbaImage::from_pixel(40, 40, BLUE);
        let region = PixelRect {
            x: 0,
            y: 0,
            width: 40,
            height: 30,
        };
        let block = backend.extract_region(&surface, region, 8, 6).unwrap();
        assert_eq!(block.dimensions(), (8, 6));
    }

    #[test]
    fn test_extract_region_outside_surface() {
        let backend = CpuBackend::default();
        let surface = RgbaImage::new(4, 4);
        let region = PixelRect {
            x: 3,
            y: 0,
            width: 2,
            height: 2,
        };
        assert!(matches!(
            backend.extract_region(&surface, region, 2, 2),
            Err(RasterError::InvalidCropRegion { .. })
        ));
    }

    #[test]
    fn test_sample_bilinear_center_and_edges() {
        let image = RgbaImage::from_pixel(2, 2, RED);
        assert_eq!(sample_bilinear(&image, 0.5, 0.5), Some(RED));
        assert_eq!(sample_bilinear(&image, 5.0, 0.0), None);

        // Half a pixel past the edge: half coverage, color preserved
        let edge = sample_bilinear(&image, -0.5, 0.0).unwrap();
        assert_eq!(edge.0[0], 255);
        assert_eq!(edge.0[3], 128);
    }

    #[test]
    fn test_sample_nearest_bounds() {
        let image = RgbaImage::from_pixel(2, 2, BLUE);
        assert_eq!(sample_nearest(&image, 1.999, 0.0), Some(BLUE));
        assert_eq!(sample_nearest(&image, 2.0, 0.0), None);
        assert_eq!(sample_nearest(&image, -0.001, 0.0), None);
    }
}
