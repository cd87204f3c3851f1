//! Image processing: geometry, transforms and codecs.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode + EXIF capture** | `image::ImageReader` + `kamadak-exif` |
//! | **Aspect / edge crop** | `DynamicImage::crop_imm` on integer rectangles |
//! | **Resize / max-size** | `resize_exact` with Lanczos3 |
//! | **Encode** | JPEG, PNG, WebP (lossy + lossless), TIFF |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and resize geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Transform chain and per-format encode planning
//! - **EXIF**: Reading and re-attaching metadata blocks

pub mod backend;
mod calculations;
pub(crate) mod exif;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceImage};
pub use calculations::{
    CropRect, GeometryError, aspect_crop_rect, edge_crop_rect, max_size_dimensions,
};
pub use operations::{apply_transforms, plan_encodes, resolve_formats};
pub use params::{
    AspectRatio, CropPixels, CropPosition, EncodeRequest, Margins, OutputFormat, OutputTarget,
    Quality, Size,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
