//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: decode a source file (capturing its EXIF block before any pixel
//! is touched) and encode a transformed buffer per [`EncodeRequest`].
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use a recording
//! mock so pipeline logic can be exercised without real codecs.

use super::params::EncodeRequest;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unrecognised image content in {0}")]
    UnsupportedFormat(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded source image plus what was captured before any transform.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: DynamicImage,
    /// Container format reported by the decoder, if recognised.
    pub format: Option<ImageFormat>,
    /// Raw TIFF-structured EXIF block from the source file.
    pub exif: Option<Vec<u8>>,
}

impl SourceImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

/// Trait for image codec backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode a source file and capture its EXIF block.
    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError>;

    /// Encode `image` as described by `request` and write it to `request.output`.
    fn encode(&self, image: &DynamicImage, request: &EncodeRequest) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{OutputFormat, Quality};
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<SourceImage>>,
        pub failing_format: Option<OutputFormat>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Encode {
            output: String,
            format: OutputFormat,
            width: u32,
            height: u32,
            quality: u8,
            dpi: Option<u16>,
            exif: bool,
        },
    }

    /// Solid gray RGB image of the given size.
    pub fn blank_source(width: u32, height: u32) -> SourceImage {
        SourceImage {
            pixels: DynamicImage::new_rgb8(width, height),
            format: Some(ImageFormat::Jpeg),
            exif: None,
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_sources(sources: Vec<SourceImage>) -> Self {
            Self {
                decode_results: Mutex::new(sources),
                ..Self::default()
            }
        }

        pub fn failing_on(mut self, format: OutputFormat) -> Self {
            self.failing_format = Some(format);
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encodes(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<SourceImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));

            self.decode_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock source".to_string()))
        }

        fn encode(&self, image: &DynamicImage, request: &EncodeRequest) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                output: request.output.to_string_lossy().to_string(),
                format: request.format,
                width: image.width(),
                height: image.height(),
                quality: request.quality.value(),
                dpi: request.dpi,
                exif: request.exif.is_some(),
            });
            if self.failing_format == Some(request.format) {
                return Err(BackendError::Encode(format!(
                    "mock refuses {}",
                    request.format
                )));
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_sources(vec![blank_source(800, 600)]);

        let result = backend.decode(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(
            result.dimensions(),
            Dimensions {
                width: 800,
                height: 600
            }
        );

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_decode_without_sources_errors() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.decode(Path::new("/missing.jpg")),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let image = DynamicImage::new_rgb8(40, 30);

        backend
            .encode(
                &image,
                &EncodeRequest {
                    format: OutputFormat::Webp,
                    output: "/out/a.webp".into(),
                    quality: Quality::new(100),
                    dpi: Some(300),
                    exif: None,
                },
            )
            .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                output: "/out/a.webp".to_string(),
                format: OutputFormat::Webp,
                width: 40,
                height: 30,
                quality: 100,
                dpi: Some(300),
                exif: false,
            }]
        );
    }

    #[test]
    fn mock_failing_format_still_records() {
        let backend = MockBackend::new().failing_on(OutputFormat::Png);
        let image = DynamicImage::new_rgb8(4, 4);
        let result = backend.encode(
            &image,
            &EncodeRequest {
                format: OutputFormat::Png,
                output: "/out/a.png".into(),
                quality: Quality::default(),
                dpi: None,
                exif: None,
            },
        );
        assert!(result.is_err());
        assert_eq!(backend.encodes().len(), 1);
    }
}
