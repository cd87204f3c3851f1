//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the configuration layer, the pure geometry in
//! [`calculations`](super::calculations), and the codec
//! [`backend`](super::backend) that does the pixel and byte work.
//!
//! ## Types
//!
//! - [`Quality`]: Encoding quality (0–100, default 90). Clamped on construction.
//! - [`Size`]: Absolute `width x height` in pixels.
//! - [`AspectRatio`]: Target `width:height` ratio with non-zero components.
//! - [`CropPosition`]: Which part of the image an aspect crop keeps.
//! - [`CropPixels`]: Fixed margins removed from the edges.
//! - [`OutputFormat`]: The encoders this tool writes.
//! - [`OutputTarget`]: Where a source file's outputs land.
//! - [`EncodeRequest`]: Everything needed to write one output file.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Quality setting for encoding (0-100).
///
/// For WebP, 100 selects the lossless encoder; anything lower is lossy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lossless(self) -> bool {
        self.0 == 100
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Absolute image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Target aspect ratio. Both components are non-zero (enforced by config parsing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Anchor for the aspect-ratio crop.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CropPosition {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl fmt::Display for CropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CropPosition::Center => "center",
            CropPosition::Top => "top",
            CropPosition::Bottom => "bottom",
            CropPosition::Left => "left",
            CropPosition::Right => "right",
        };
        f.write_str(name)
    }
}

/// Pixels removed from the image edges, parsed from 1, 2 or 4 comma-separated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPixels {
    /// One value: the same margin on every edge.
    Uniform(u32),
    /// Two values: `first` is the top margin and is reused for left and
    /// right, `second` is the bottom margin.
    ///
    /// This mirrors how the tool has always read two values. It is
    /// asymmetric next to the four-value form and kept as-is on purpose.
    Vertical { first: u32, second: u32 },
    /// Four values, clockwise from the top.
    Sides {
        top: u32,
        right: u32,
        bottom: u32,
        left: u32,
    },
}

/// Margins resolved from [`CropPixels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl CropPixels {
    pub fn margins(self) -> Margins {
        match self {
            CropPixels::Uniform(v) => Margins {
                top: v,
                right: v,
                bottom: v,
                left: v,
            },
            CropPixels::Vertical { first, second } => Margins {
                top: first,
                right: first,
                bottom: second,
                left: first,
            },
            CropPixels::Sides {
                top,
                right,
                bottom,
                left,
            } => Margins {
                top,
                right,
                bottom,
                left,
            },
        }
    }
}

impl fmt::Display for CropPixels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropPixels::Uniform(v) => write!(f, "{v}"),
            CropPixels::Vertical { first, second } => write!(f, "{first},{second}"),
            CropPixels::Sides {
                top,
                right,
                bottom,
                left,
            } => write!(f, "{top},{right},{bottom},{left}"),
        }
    }
}

/// Output encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Tiff,
}

impl OutputFormat {
    /// Used when no format is configured and the source format has no encoder here.
    pub const FALLBACK: OutputFormat = OutputFormat::Webp;

    /// Parse a format name or file extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jfif" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::Webp),
            ImageFormat::Tiff => Some(OutputFormat::Tiff),
            _ => None,
        }
    }

    /// Lowercase file extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Whether the source EXIF block can be carried into this format.
    pub fn carries_exif(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Tiff)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Destination of every artifact produced from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Destination root for the whole run.
    pub root: PathBuf,
    /// Source file's directory relative to the input root.
    pub relative_dir: PathBuf,
    /// Source file name without extension.
    pub stem: String,
    /// Put each format under its own `<root>/<ext>/` subtree.
    pub group_by_format: bool,
}

impl OutputTarget {
    /// Directory that receives `format` outputs.
    pub fn dir_for(&self, format: OutputFormat) -> PathBuf {
        let base: &Path = &self.root;
        if self.group_by_format {
            base.join(format.extension()).join(&self.relative_dir)
        } else {
            base.join(&self.relative_dir)
        }
    }

    /// Full output path for `format`: `<dir>/<stem>.<ext>`.
    pub fn path_for(&self, format: OutputFormat) -> PathBuf {
        self.dir_for(format)
            .join(format!("{}.{}", self.stem, format.extension()))
    }
}

/// One encoded artifact, built fresh per format so no option leaks between formats.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub format: OutputFormat,
    pub output: PathBuf,
    pub quality: Quality,
    /// Dots per inch stamped into the format's resolution metadata.
    pub dpi: Option<u16>,
    /// Raw EXIF (TIFF-structured) block to re-attach, already filtered by format.
    pub exif: Option<Vec<u8>>,
}
