//! Seam for handing a finished raster to the host's upload service.

use std::error::Error as StdError;

use thiserror::Error;

/// An upload failure, passed through unchanged from the collaborator.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct UploadError {
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl UploadError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The collaborator's original error.
    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.source
    }
}

/// Persists an encoded image and returns where it can be fetched.
///
/// The crop engine calls this at most once per finalized session and never
/// retries.
pub trait UploadPipeline {
    fn upload(&mut self, bytes: &[u8], mime_type: &str) -> Result<String, UploadError>;
}

impl<F> UploadPipeline for F
where
    F: FnMut(&[u8], &str) -> Result<String, UploadError>,
{
    fn upload(&mut self, bytes: &[u8], mime_type: &str) -> Result<String, UploadError> {
        self(bytes, mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("quota exceeded")]
    struct QuotaError;

    #[test]
    fn test_upload_error_keeps_message() {
        let err = UploadError::new("network down");
        assert_eq!(err.to_string(), "network down");
    }

    #[test]
    fn test_upload_error_preserves_source_type() {
        let err = UploadError::new(QuotaError);
        assert_eq!(err.to_string(), "quota exceeded");
        assert!(err.into_inner().downcast_ref::<QuotaError>().is_some());
    }

    #[test]
    fn test_closure_is_pipeline() {
        let mut seen = Vec::new();
        let mut pipeline = |bytes: &[u8], mime: &str| {
            seen.push((bytes.len(), mime.to_string()));
            Ok::<_, UploadError>("https://cdn.example/1.jpg".to_string())
        };

        let url = pipeline.upload(&[1, 2, 3], "image/jpeg").unwrap();
        assert_eq!(url, "https://cdn.example/1.jpg");
        drop(pipeline);
        assert_eq!(seen, vec![(3, "image/jpeg".to_string())]);
    }
}
