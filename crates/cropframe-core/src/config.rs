//! Per-session configuration.
//!
//! Every type here is validated on construction, including when it is
//! deserialized (through `#[serde(try_from)]`), so a session can never be
//! opened with a zero-sized target or an unknown output format.
//!
//! Field names are camelCase on the wire to match what a JavaScript host
//! passes in.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::OutputFormat;
use crate::geometry::{clamp_zoom, RotationMode};
use crate::raster::FilterType;

/// Errors from validating configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Target dimensions must be non-zero, got {width}x{height}")]
    ZeroTarget { width: u32, height: u32 },

    #[error("Aspect ratio must be positive and finite, got {0}")]
    InvalidAspectRatio(f64),

    #[error("Unsupported output MIME type: {0}")]
    UnsupportedMimeType(String),

    #[error("Invalid zoom bounds: min {min}, max {max}")]
    InvalidZoomBounds { min: f64, max: f64 },

    #[error("Maximum surface side must be non-zero")]
    ZeroSurfaceLimit,
}

const DEFAULT_QUALITY: f32 = 0.85;

/// Fixed description of the output raster for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "OutputSpecFields")]
pub struct OutputSpec {
    target_width: u32,
    target_height: u32,
    aspect_ratio: f64,
    mime_type: OutputFormat,
    quality: f32,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            target_width: 400,
            target_height: 300,
            aspect_ratio: 4.0 / 3.0,
            mime_type: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl OutputSpec {
    /// Create an output spec from a MIME type string.
    ///
    /// `quality` is clamped to `[0, 1]`; NaN falls back to the default 0.85.
    pub fn new(
        target_width: u32,
        target_height: u32,
        aspect_ratio: f64,
        mime_type: &str,
        quality: f32,
    ) -> Result<Self, ConfigError> {
        let format = mime_type
            .parse::<OutputFormat>()
            .map_err(|_| ConfigError::UnsupportedMimeType(mime_type.to_string()))?;
        Self::with_format(target_width, target_height, aspect_ratio, format, quality)
    }

    pub fn with_format(
        target_width: u32,
        target_height: u32,
        aspect_ratio: f64,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Self, ConfigError> {
        if target_width == 0 || target_height == 0 {
            return Err(ConfigError::ZeroTarget {
                width: target_width,
                height: target_height,
            });
        }
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            return Err(ConfigError::InvalidAspectRatio(aspect_ratio));
        }

        let target_aspect = target_width as f64 / target_height as f64;
        if ((target_aspect - aspect_ratio) / aspect_ratio).abs() > 0.01 {
            warn!(
                "aspect ratio {:.4} differs from target {}x{}; output will be stretched",
                aspect_ratio, target_width, target_height
            );
        }

        let quality = if quality.is_nan() {
            DEFAULT_QUALITY
        } else {
            quality.clamp(0.0, 1.0)
        };

        Ok(Self {
            target_width,
            target_height,
            aspect_ratio,
            mime_type: format,
            quality,
        })
    }

    /// Output matching the given pixel size exactly, at full quality.
    pub fn exact(width: u32, height: u32, format: OutputFormat) -> Result<Self, ConfigError> {
        let aspect = if height == 0 {
            0.0
        } else {
            width as f64 / height as f64
        };
        Self::with_format(width, height, aspect, format, 1.0)
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn format(&self) -> OutputFormat {
        self.mime_type
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type.mime_type()
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OutputSpecFields {
    target_width: u32,
    target_height: u32,
    aspect_ratio: f64,
    mime_type: String,
    quality: f32,
}

impl Default for OutputSpecFields {
    fn default() -> Self {
        let spec = OutputSpec::default();
        Self {
            target_width: spec.target_width,
            target_height: spec.target_height,
            aspect_ratio: spec.aspect_ratio,
            mime_type: spec.mime_type().to_string(),
            quality: spec.quality,
        }
    }
}

impl TryFrom<OutputSpecFields> for OutputSpec {
    type Error = ConfigError;

    fn try_from(f: OutputSpecFields) -> Result<Self, Self::Error> {
        OutputSpec::new(
            f.target_width,
            f.target_height,
            f.aspect_ratio,
            &f.mime_type,
            f.quality,
        )
    }
}

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ZoomBoundsFields")]
pub struct ZoomBounds {
    min: f64,
    max: f64,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self { min: 1.0, max: 3.0 }
    }
}

impl ZoomBounds {
    /// Both bounds must be finite, `min` positive and `min <= max`.
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::InvalidZoomBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        clamp_zoom(zoom, self.min, self.max)
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct ZoomBoundsFields {
    min: f64,
    max: f64,
}

impl Default for ZoomBoundsFields {
    fn default() -> Self {
        let bounds = ZoomBounds::default();
        Self {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

impl TryFrom<ZoomBoundsFields> for ZoomBounds {
    type Error = ConfigError;

    fn try_from(f: ZoomBoundsFields) -> Result<Self, Self::Error> {
        ZoomBounds::new(f.min, f.max)
    }
}

/// Options for the CPU raster backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RasterOptionsFields")]
pub struct RasterOptions {
    filter: FilterType,
    max_surface_side: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            filter: FilterType::Bilinear,
            max_surface_side: 16_384,
        }
    }
}

impl RasterOptions {
    pub fn new(filter: FilterType, max_surface_side: u32) -> Result<Self, ConfigError> {
        if max_surface_side == 0 {
            return Err(ConfigError::ZeroSurfaceLimit);
        }
        Ok(Self {
            filter,
            max_surface_side,
        })
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    pub fn max_surface_side(&self) -> u32 {
        self.max_surface_side
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RasterOptionsFields {
    filter: FilterType,
    max_surface_side: u32,
}

impl Default for RasterOptionsFields {
    fn default() -> Self {
        let options = RasterOptions::default();
        Self {
            filter: options.filter,
            max_surface_side: options.max_surface_side,
        }
    }
}

impl TryFrom<RasterOptionsFields> for RasterOptions {
    type Error = ConfigError;

    fn try_from(f: RasterOptionsFields) -> Result<Self, Self::Error> {
        RasterOptions::new(f.filter, f.max_surface_side)
    }
}

/// Complete configuration for a crop session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CropConfig {
    pub output: OutputSpec,
    pub zoom: ZoomBounds,
    pub rotation_mode: RotationMode,
    pub raster: RasterOptions,
}

impl CropConfig {
    pub fn new(output: OutputSpec) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    pub fn with_rotation_mode(mut self, mode: RotationMode) -> Self {
        self.rotation_mode = mode;
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomBounds) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_raster(mut self, raster: RasterOptions) -> Self {
        self.raster = raster;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_spec_default() {
        let spec = OutputSpec::default();
        assert_eq!(spec.target_width(), 400);
        assert_eq!(spec.target_height(), 300);
        assert_eq!(spec.format(), OutputFormat::Jpeg);
        assert!((spec.quality() - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_output_spec_new_valid() {
        let spec = OutputSpec::new(400, 300, 4.0 / 3.0, "image/jpeg", 0.85).unwrap();
        assert_eq!(spec.mime_type(), "image/jpeg");
        assert_eq!(spec, OutputSpec::default());
    }

    #[test]
    fn test_output_spec_rejects_zero_target() {
        assert_eq!(
            OutputSpec::new(0, 300, 1.0, "image/png", 1.0),
            Err(ConfigError::ZeroTarget {
                width: 0,
                height: 300
            })
        );
    }

    #[test]
    fn test_output_spec_rejects_bad_aspect() {
        assert!(matches!(
            OutputSpec::new(10, 10, 0.0, "image/png", 1.0),
            Err(ConfigError::InvalidAspectRatio(_))
        ));
        assert!(matches!(
            OutputSpec::new(10, 10, f64::NAN, "image/png", 1.0),
            Err(ConfigError::InvalidAspectRatio(_))
        ));
    }

    #[test]
    fn test_output_spec_rejects_unknown_mime() {
        assert_eq!(
            OutputSpec::new(10, 10, 1.0, "image/gif", 1.0),
            Err(ConfigError::UnsupportedMimeType("image/gif".to_string()))
        );
    }

    #[test]
    fn test_output_spec_clamps_quality() {
        let spec = OutputSpec::new(10, 10, 1.0, "image/jpeg", 4.0).unwrap();
        assert_eq!(spec.quality(), 1.0);

        let spec = OutputSpec::new(10, 10, 1.0, "image/jpeg", -1.0).unwrap();
        assert_eq!(spec.quality(), 0.0);

        let spec = OutputSpec::new(10, 10, 1.0, "image/jpeg", f32::NAN).unwrap();
        assert!((spec.quality() - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_output_spec_exact() {
        let spec = OutputSpec::exact(7, 5, OutputFormat::Png).unwrap();
        assert!((spec.aspect_ratio() - 1.4).abs() < 1e-12);
        assert_eq!(spec.quality(), 1.0);
    }

    #[test]
    fn test_output_spec_deserialize_camel_case() {
        let json = r#"{
            "targetWidth": 200,
            "targetHeight": 200,
            "aspectRatio": 1.0,
            "mimeType": "image/png",
            "quality": 0.5
        }"#;
        let spec: OutputSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.target_width(), 200);
        assert_eq!(spec.format(), OutputFormat::Png);
    }

    #[test]
    fn test_output_spec_deserialize_validates() {
        let json = r#"{ "targetWidth": 0 }"#;
        let err = serde_json::from_str::<OutputSpec>(json).unwrap_err();
        assert!(err.to_string().contains("non-zero"), "{}", err);

        let json = r#"{ "mimeType": "text/html" }"#;
        assert!(serde_json::from_str::<OutputSpec>(json).is_err());
    }

    #[test]
    fn test_output_spec_serializes_mime_string() {
        let value = serde_json::to_value(OutputSpec::default()).unwrap();
        assert_eq!(value["mimeType"], "image/jpeg");
        assert_eq!(value["targetWidth"], 400);
    }

    #[test]
    fn test_zoom_bounds() {
        let bounds = ZoomBounds::default();
        assert_eq!(bounds.clamp(5.0), 3.0);
        assert_eq!(bounds.clamp(0.2), 1.0);

        assert!(ZoomBounds::new(2.0, 1.0).is_err());
        assert!(ZoomBounds::new(0.0, 1.0).is_err());
        assert!(ZoomBounds::new(1.0, f64::INFINITY).is_err());
        assert!(ZoomBounds::new(1.5, 1.5).is_ok());
    }

    #[test]
    fn test_raster_options_rejects_zero_limit() {
        assert_eq!(
            RasterOptions::new(FilterType::Nearest, 0),
            Err(ConfigError::ZeroSurfaceLimit)
        );
    }

    #[test]
    fn test_crop_config_defaults_from_empty_json() {
        let config: CropConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CropConfig::default());
        assert_eq!(config.rotation_mode, RotationMode::Continuous);
        assert_eq!(config.raster.max_surface_side(), 16_384);
    }

    #[test]
    fn test_crop_config_partial_json() {
        let json = r#"{
            "output": { "targetWidth": 256, "targetHeight": 256, "aspectRatio": 1.0 },
            "zoom": { "min": 1.0, "max": 5.0 },
            "rotationMode": "quarterTurns",
            "raster": { "filter": "lanczos3" }
        }"#;
        let config: CropConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.output.target_width(), 256);
        assert_eq!(config.output.format(), OutputFormat::Jpeg);
        assert_eq!(config.zoom.max(), 5.0);
        assert_eq!(config.rotation_mode, RotationMode::QuarterTurns);
        assert_eq!(config.raster.filter(), FilterType::Lanczos3);
    }

    #[test]
    fn test_crop_config_invalid_zoom_json() {
        let json = r#"{ "zoom": { "min": 3.0, "max": 1.0 } }"#;
        assert!(serde_json::from_str::<CropConfig>(json).is_err());
    }
}
