//! High-level image operations.
//!
//! These functions combine calculations with pixel work. Every transform
//! takes the buffer by value and hands back a new one, so a pipeline is a
//! plain chain of calls and each stage can be tested on its own.
//!
//! The order in [`apply_transforms`] is fixed:
//!
//! ```text
//! aspect crop → resize to target → max-size downscale → edge crop
//! ```
//!
//! Aspect cropping runs on original-resolution coordinates, the max-size cap
//! only ever limits an already-resized result, and edge margins are relative
//! to the final pre-encode dimensions.

use super::calculations::{
    CropRect, GeometryError, aspect_crop_rect, edge_crop_rect, max_size_dimensions,
};
use super::params::{
    AspectRatio, CropPixels, CropPosition, EncodeRequest, OutputFormat, OutputTarget, Size,
};
use crate::config::TransformConfig;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Resampling filter for every resize.
const FILTER: FilterType = FilterType::Lanczos3;

fn crop(image: DynamicImage, rect: CropRect) -> DynamicImage {
    image.crop_imm(rect.left, rect.top, rect.width(), rect.height())
}

/// Crop to the largest rectangle with the given aspect ratio.
pub fn crop_to_aspect(
    image: DynamicImage,
    ratio: AspectRatio,
    position: CropPosition,
) -> Result<DynamicImage> {
    let rect = aspect_crop_rect((image.width(), image.height()), ratio, position)?;
    debug!(%ratio, %position, ?rect, "aspect crop");
    Ok(crop(image, rect))
}

/// Resize to exactly `size`, ignoring the current aspect ratio.
pub fn resize_to_target(image: DynamicImage, size: Size) -> DynamicImage {
    debug!(from = %Size::new(image.width(), image.height()), to = %size, "resize");
    image.resize_exact(size.width, size.height, FILTER)
}

/// Shrink to fit inside `max`, keeping the aspect ratio. Never upscales.
pub fn downscale_within(image: DynamicImage, max: Size) -> Result<DynamicImage> {
    Ok(
        match max_size_dimensions((image.width(), image.height()), max)? {
            Some((width, height)) => {
                debug!(%max, width, height, "max-size downscale");
                image.resize_exact(width, height, FILTER)
            }
            None => image,
        },
    )
}

/// Remove fixed pixel margins from the edges.
pub fn crop_edges(image: DynamicImage, pixels: CropPixels) -> Result<DynamicImage> {
    let rect = edge_crop_rect((image.width(), image.height()), pixels)?;
    debug!(%pixels, ?rect, "edge crop");
    Ok(crop(image, rect))
}

/// Run every configured transform in order. Absent steps pass the buffer through.
pub fn apply_transforms(image: DynamicImage, config: &TransformConfig) -> Result<DynamicImage> {
    let image = match config.aspect_ratio {
        Some(ratio) => crop_to_aspect(image, ratio, config.crop_position)?,
        None => image,
    };
    let image = match config.target_size {
        Some(size) => resize_to_target(image, size),
        None => image,
    };
    let image = match config.max_size {
        Some(max) => downscale_within(image, max)?,
        None => image,
    };
    match config.crop_pixels {
        Some(pixels) => crop_edges(image, pixels),
        None => Ok(image),
    }
}

/// Formats to write for one source: the configured list, or the source's own
/// format when none is configured (WebP if that has no encoder here).
pub fn resolve_formats(config: &TransformConfig, source: Option<ImageFormat>) -> Vec<OutputFormat> {
    if config.output_formats.is_empty() {
        let format = source
            .and_then(OutputFormat::from_image_format)
            .unwrap_or(OutputFormat::FALLBACK);
        vec![format]
    } else {
        config.output_formats.clone()
    }
}

/// Plan the encodes for one source without executing them.
///
/// Each request is built from scratch out of the immutable config.
pub fn plan_encodes(
    config: &TransformConfig,
    source_format: Option<ImageFormat>,
    exif: Option<&[u8]>,
    target: &OutputTarget,
) -> Vec<EncodeRequest> {
    resolve_formats(config, source_format)
        .into_iter()
        .map(|format| EncodeRequest {
            format,
            output: target.path_for(format),
            quality: config.quality,
            dpi: config.dpi,
            exif: exif
                .filter(|_| config.keep_metadata && format.carries_exif())
                .map(<[u8]>::to_vec),
        })
        .collect()
}
