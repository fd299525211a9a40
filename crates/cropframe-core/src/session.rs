//! One crop session: a decoded image plus its editing state.
//!
//! A [`CropSession`] exists only for a successfully decoded image, so no
//! interaction can happen before decoding has finished. Applying consumes
//! the session; the transform state is snapshotted at that instant and can
//! no longer be mutated. If rasterizing fails in a way the user can fix
//! (an empty crop), the error hands the session back for another attempt.

use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::config::CropConfig;
use crate::decode::{decode_image, DecodeError, SourceImage};
use crate::encode::EncodedImage;
use crate::geometry::{contain_fit, display_to_natural, CropRegion, GeometryError, Rect, Size};
use crate::interaction::{DragController, DragState, PointerEvent, SliderController};
use crate::model::{TransformModel, TransformSnapshot};
use crate::raster::{rasterize, CpuBackend, RasterBackend, RasterError};
use crate::upload::{UploadError, UploadPipeline};

/// Errors surfaced by a crop session.
#[derive(Debug, Error)]
pub enum CropError {
    /// The file could not be decoded; no session was created.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    /// The upload collaborator failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl CropError {
    /// Whether the failed call may be retried after adjusting the crop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CropError::Raster(e) if e.is_retryable())
    }
}

/// A failed [`CropSession::apply`].
///
/// Carries the session back when the failure is retryable.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ApplyError {
    #[source]
    error: CropError,
    session: Option<Box<CropSession>>,
}

impl ApplyError {
    fn new(error: CropError, session: Option<CropSession>) -> Self {
        Self {
            error,
            session: session.map(Box::new),
        }
    }

    pub fn error(&self) -> &CropError {
        &self.error
    }

    /// True if the session came back with the error.
    pub fn is_retryable(&self) -> bool {
        self.session.is_some()
    }

    /// Take the session back for adjustment, if the failure allows it.
    pub fn into_session(self) -> Option<CropSession> {
        self.session.map(|s| *s)
    }

    pub fn into_parts(self) -> (CropError, Option<CropSession>) {
        (self.error, self.session.map(|s| *s))
    }
}

impl From<ApplyError> for CropError {
    fn from(err: ApplyError) -> Self {
        err.error
    }
}

/// Editing state for one image.
pub struct CropSession {
    source: SourceImage,
    model: TransformModel,
    drag: DragController,
    slider: SliderController,
    config: CropConfig,
}

impl fmt::Debug for CropSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Skip the pixel buffer
        f.debug_struct("CropSession")
            .field("natural_size", &self.source.natural_size())
            .field("model", &self.model)
            .field("drag", &self.drag)
            .field("config", &self.config)
            .finish()
    }
}

impl CropSession {
    /// Decode `bytes` and start a session.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Encoded image file
    /// * `mime_type` - Declared MIME type (a hint; the format is sniffed)
    /// * `config` - Output, zoom and rotation settings
    /// * `container` - Layout box the image is contain-fitted into
    ///
    /// # Errors
    ///
    /// Returns `CropError::Decode` if the image cannot be decoded.
    pub fn open(
        bytes: &[u8],
        mime_type: &str,
        config: CropConfig,
        container: Size,
    ) -> Result<Self, CropError> {
        let source = decode_image(bytes, mime_type)?;
        Ok(Self::from_source(source, config, container))
    }

    /// Start a session for an already decoded image.
    pub fn from_source(source: SourceImage, config: CropConfig, container: Size) -> Self {
        let viewport = contain_fit(source.natural_size(), container);
        let model = TransformModel::init_centered(
            viewport,
            config.output.aspect_ratio(),
            config.zoom,
            config.rotation_mode,
        );
        debug!(
            "session open: {}x{} image, viewport {}x{}, region {:?}",
            source.natural_width(),
            source.natural_height(),
            viewport.width,
            viewport.height,
            model.region().rect
        );

        Self {
            source,
            model,
            drag: DragController::new(),
            slider: SliderController::new(),
            config,
        }
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn model(&self) -> &TransformModel {
        &self.model
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    pub fn viewport(&self) -> Size {
        self.model.viewport()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    pub fn snapshot(&self) -> TransformSnapshot {
        self.model.snapshot()
    }

    /// The current crop region in natural image pixels.
    pub fn natural_region(&self) -> Result<CropRegion, GeometryError> {
        display_to_natural(
            self.model.region(),
            self.model.viewport(),
            self.source.natural_size(),
        )
    }

    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        self.drag.pointer_down(&self.model, event)
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> bool {
        self.drag.pointer_move(&mut self.model, event)
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> bool {
        self.drag.pointer_up(event)
    }

    pub fn pointer_cancel(&mut self, event: PointerEvent) -> bool {
        self.drag.pointer_cancel(event)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.slider.on_zoom_change(&mut self.model, zoom);
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.slider.on_rotation_change(&mut self.model, degrees);
    }

    /// Relative rotation, e.g. a "rotate 90°" button.
    pub fn rotate_by(&mut self, delta_degrees: f64) {
        self.model.rotate_by(delta_degrees);
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.slider.on_crop_moved(&mut self.model, dx, dy);
    }

    /// Absolute display-space crop area reported by a cropping widget.
    pub fn set_crop_area(&mut self, area: Rect) {
        self.slider.on_crop_area_change(&mut self.model, area);
    }

    /// The layout box changed; refit the viewport and rescale the region.
    pub fn resize_container(&mut self, container: Size) {
        let viewport = contain_fit(self.source.natural_size(), container);
        self.model.resize_viewport(viewport);
    }

    /// Rasterize the current crop with `backend`, consuming the session.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`]; if it [`is_retryable`](ApplyError::is_retryable)
    /// the session can be taken back with [`ApplyError::into_session`].
    pub fn apply<B: RasterBackend>(self, backend: &B) -> Result<EncodedImage, ApplyError> {
        let snapshot = self.model.snapshot();
        debug!(
            "session apply: region {:?}, zoom {}, rotation {}",
            snapshot.region.rect, snapshot.transform.zoom, snapshot.transform.rotation_degrees
        );

        match rasterize(&self.source, &snapshot, &self.config.output, backend) {
            Ok(encoded) => {
                debug!(
                    "session applied: {}x{} {}, {} bytes",
                    encoded.width,
                    encoded.height,
                    encoded.mime_type(),
                    encoded.bytes.len()
                );
                Ok(encoded)
            }
            Err(e) if e.is_retryable() => {
                warn!("apply failed, session kept for retry: {}", e);
                Err(ApplyError::new(e.into(), Some(self)))
            }
            Err(e) => {
                warn!("apply failed, session closed: {}", e);
                Err(ApplyError::new(e.into(), None))
            }
        }
    }

    /// [`apply`](Self::apply) with a [`CpuBackend`] built from the session's
    /// raster options.
    pub fn apply_cpu(self) -> Result<EncodedImage, ApplyError> {
        let backend = CpuBackend::from_options(&self.config.raster);
        self.apply(&backend)
    }

    /// Apply, then hand the result to `uploader` exactly once.
    ///
    /// Upload errors are returned unchanged and close the session.
    pub fn apply_and_upload<B, U>(self, backend: &B, uploader: &mut U) -> Result<String, ApplyError>
    where
        B: RasterBackend,
        U: UploadPipeline + ?Sized,
    {
        let encoded = self.apply(backend)?;
        uploader
            .upload(&encoded.bytes, encoded.mime_type())
            .map_err(|e| ApplyError::new(e.into(), None))
    }

    /// Drop the session without producing output.
    pub fn cancel(self) {
        debug!(
            "session cancelled: {}x{} image",
            self.source.natural_width(),
            self.source.natural_height()
        );
    }
}
