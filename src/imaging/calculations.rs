//! Pure calculation functions for crop rectangles and resize dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Arithmetic is done in `u64` integers so floors and roundings are exact.

use super::params::{AspectRatio, CropPixels, CropPosition, Size};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Aspect ratio {ratio} leaves no pixels in a {width}x{height} image")]
    EmptyAspectCrop {
        ratio: AspectRatio,
        width: u32,
        height: u32,
    },
    #[error("Downscaling {width}x{height} to fit {max} rounds a side to zero pixels")]
    EmptyDownscale { max: Size, width: u32, height: u32 },
    #[error("Edge crop {crop} does not fit in a {width}x{height} image")]
    EdgeCropTooLarge {
        crop: CropPixels,
        width: u32,
        height: u32,
    },
}

/// Crop box in source pixel coordinates.
///
/// Invariant: `left < right <= width` and `top < bottom <= height` of the
/// image it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Calculate the largest rectangle with the target aspect ratio.
///
/// If the source is wider than the target ratio the full height is kept,
/// otherwise the full width. The position decides which part survives.
///
/// # Examples
/// ```
/// # use imgopt::imaging::{AspectRatio, CropPosition, CropRect, aspect_crop_rect};
/// // 1600x900 to 1:1, centered → 900x900 box starting at x=350
/// let rect = aspect_crop_rect((1600, 900), AspectRatio::new(1, 1), CropPosition::Center).unwrap();
/// assert_eq!(rect, CropRect { left: 350, top: 0, right: 1250, bottom: 900 });
/// ```
pub fn aspect_crop_rect(
    source: (u32, u32),
    ratio: AspectRatio,
    position: CropPosition,
) -> Result<CropRect, GeometryError> {
    let (width, height) = source;
    let (w, h) = (width as u64, height as u64);
    let (aw, ah) = (ratio.width as u64, ratio.height as u64);

    // width/height > aw/ah, cross-multiplied
    let (new_w, new_h) = if w * ah > h * aw {
        ((h * aw / ah) as u32, height)
    } else {
        (width, (w * ah / aw) as u32)
    };

    if new_w == 0 || new_h == 0 {
        return Err(GeometryError::EmptyAspectCrop {
            ratio,
            width,
            height,
        });
    }

    let spare_x = width - new_w;
    let spare_y = height - new_h;
    let (left, top) = match position {
        CropPosition::Center => (spare_x / 2, spare_y / 2),
        CropPosition::Left => (0, spare_y / 2),
        CropPosition::Right => (spare_x, spare_y / 2),
        CropPosition::Top => (spare_x / 2, 0),
        CropPosition::Bottom => (spare_x / 2, spare_y),
    };

    Ok(CropRect {
        left,
        top,
        right: left + new_w,
        bottom: top + new_h,
    })
}

/// Calculate dimensions that fit inside `max` while keeping the source ratio.
///
/// Returns `None` when the source already fits, so callers never upscale.
/// The dimension with the larger overshoot ratio binds to its maximum and
/// the other is rounded to the nearest pixel. A side that rounds to zero is
/// an error.
///
/// # Examples
/// ```
/// # use imgopt::imaging::{Size, max_size_dimensions};
/// assert_eq!(max_size_dimensions((4000, 3000), Size::new(1920, 1080)), Ok(Some((1440, 1080))));
/// assert_eq!(max_size_dimensions((800, 600), Size::new(1920, 1080)), Ok(None));
/// assert!(max_size_dimensions((10000, 1), Size::new(100, 100)).is_err());
/// ```
pub fn max_size_dimensions(
    source: (u32, u32),
    max: Size,
) -> Result<Option<(u32, u32)>, GeometryError> {
    let (width, height) = source;
    if width <= max.width && height <= max.height {
        return Ok(None);
    }

    let (w, h) = (width as u64, height as u64);
    let (mw, mh) = (max.width as u64, max.height as u64);

    // width/max_width > height/max_height, cross-multiplied
    let (new_w, new_h) = if w * mh > h * mw {
        (mw, div_round(mw * h, w))
    } else {
        (div_round(mh * w, h), mh)
    };

    if new_w == 0 || new_h == 0 {
        return Err(GeometryError::EmptyDownscale { max, width, height });
    }
    // The binding side shrinks, so the rounded side never exceeds the source
    Ok(Some((new_w as u32, new_h as u32)))
}

/// Integer division rounding half away from zero.
fn div_round(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Calculate the rectangle left after removing fixed edge margins.
///
/// Margins must leave at least one pixel in each direction:
/// `left + right < width` and `top + bottom < height`.
///
/// # Examples
/// ```
/// # use imgopt::imaging::{CropPixels, CropRect, edge_crop_rect};
/// let crop = CropPixels::Sides { top: 10, right: 20, bottom: 30, left: 40 };
/// let rect = edge_crop_rect((500, 400), crop).unwrap();
/// assert_eq!(rect, CropRect { left: 40, top: 10, right: 480, bottom: 370 });
/// ```
pub fn edge_crop_rect(source: (u32, u32), crop: CropPixels) -> Result<CropRect, GeometryError> {
    let (width, height) = source;
    let m = crop.margins();

    let horizontal = m.left as u64 + m.right as u64;
    let vertical = m.top as u64 + m.bottom as u64;
    if horizontal >= width as u64 || vertical >= height as u64 {
        return Err(GeometryError::EdgeCropTooLarge {
            crop,
            width,
            height,
        });
    }

    Ok(CropRect {
        left: m.left,
        top: m.top,
        right: width - m.right,
        bottom: height - m.bottom,
    })
}
