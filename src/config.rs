//! Run configuration.
//!
//! Handles loading, validating, and merging settings. Three layers are merged
//! as TOML values, later layers overriding earlier ones key by key:
//!
//! ```text
//! stock defaults  →  imgopt.toml  →  command-line flags
//! ```
//!
//! The merged record is deserialized into [`Settings`] and then validated
//! once into the immutable [`TransformConfig`] every worker reads. Nothing is
//! re-parsed per image.
//!
//! ## Persisted Defaults
//!
//! ```toml
//! # All options are optional - defaults shown below
//! input_dir = "input"
//! output_dir = "output"
//! size = "1080x1080"        # "none" disables the resize step
//! aspect = "1:1"            # "none" disables the aspect crop
//! crop = "center"           # center | top | bottom | left | right
//! # max_size = "2000x2000"
//! # crop_pixels = "10,20,30,40"
//! # format = "webp,jpeg"    # omit to keep each source's format
//! quality = 90
//! # dpi = 300
//! keep_metadata = false
//! group_by_format = false
//! delete_original = false
//! # threads = 4
//! timestamped = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{AspectRatio, CropPixels, CropPosition, OutputFormat, Quality, Size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "imgopt.toml";

/// Largest accepted width or height for `size` and `max_size`.
pub const MAX_DIMENSION: u32 = 4080;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Timestamp error: {0}")]
    Timestamp(String),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

/// Persisted settings, as read from `imgopt.toml` and overridden by flags.
///
/// String-typed fields keep the user's spelling (`"1080x1080"`, `"16:9"`)
/// so the file round-trips; [`Settings::transform_config`] parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Exact output size, `WxH`.
    pub size: Option<String>,
    /// Aspect ratio crop, `W:H`.
    pub aspect: Option<String>,
    pub crop: CropPosition,
    /// Bounding box for the downscale step, `WxH`.
    pub max_size: Option<String>,
    /// Edge margins: 1, 2 or 4 comma-separated values.
    pub crop_pixels: Option<String>,
    /// Comma-separated output formats.
    pub format: Option<String>,
    pub quality: u32,
    pub dpi: Option<u32>,
    pub keep_metadata: bool,
    pub group_by_format: bool,
    pub delete_original: bool,
    /// Maximum parallel workers. Absent means all cores.
    pub threads: Option<usize>,
    /// Write into a fresh `YYYYMMDD_HHMMSS` subdirectory of `output_dir`.
    pub timestamped: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            size: Some("1080x1080".to_string()),
            aspect: Some("1:1".to_string()),
            crop: CropPosition::Center,
            max_size: None,
            crop_pixels: None,
            format: None,
            quality: Quality::default().value() as u32,
            dpi: None,
            keep_metadata: false,
            group_by_format: false,
            delete_original: false,
            threads: None,
            timestamped: true,
        }
    }
}

/// Flag values from the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub size: Option<String>,
    pub aspect: Option<String>,
    pub crop: Option<CropPosition>,
    pub max_size: Option<String>,
    pub crop_pixels: Option<String>,
    pub format: Option<String>,
    pub quality: Option<u32>,
    pub dpi: Option<u32>,
    pub keep_metadata: Option<bool>,
    pub group_by_format: Option<bool>,
    pub delete_original: Option<bool>,
    pub threads: Option<usize>,
    pub timestamped: Option<bool>,
}

/// Validated, immutable transform settings shared by every worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformConfig {
    pub target_size: Option<Size>,
    pub aspect_ratio: Option<AspectRatio>,
    pub crop_position: CropPosition,
    pub max_size: Option<Size>,
    pub crop_pixels: Option<CropPixels>,
    /// Empty means "same as the source".
    pub output_formats: Vec<OutputFormat>,
    pub quality: Quality,
    pub dpi: Option<u16>,
    pub keep_metadata: bool,
    pub delete_original: bool,
    pub group_by_format: bool,
}

impl Settings {
    /// Validate every field and build the transform configuration.
    pub fn transform_config(&self) -> Result<TransformConfig, ConfigError> {
        if self.quality > 100 {
            return Err(invalid(format!(
                "quality must be 0-100, got {}",
                self.quality
            )));
        }
        let dpi = match self.dpi {
            None => None,
            Some(0) => return Err(invalid("dpi must be at least 1")),
            Some(v) => Some(
                u16::try_from(v)
                    .map_err(|_| invalid(format!("dpi must be at most {}, got {v}", u16::MAX)))?,
            ),
        };
        if self.threads == Some(0) {
            return Err(invalid("threads must be at least 1"));
        }

        Ok(TransformConfig {
            target_size: enabled(self.size.as_deref()).map(parse_size).transpose()?,
            aspect_ratio: enabled(self.aspect.as_deref())
                .map(parse_aspect)
                .transpose()?,
            crop_position: self.crop,
            max_size: enabled(self.max_size.as_deref())
                .map(parse_size)
                .transpose()?,
            crop_pixels: enabled(self.crop_pixels.as_deref())
                .map(parse_crop_pixels)
                .transpose()?,
            output_formats: match enabled(self.format.as_deref()) {
                Some(s) => parse_formats(s)?,
                None => Vec::new(),
            },
            quality: Quality::new(self.quality),
            dpi,
            keep_metadata: self.keep_metadata,
            delete_original: self.delete_original,
            group_by_format: self.group_by_format,
        })
    }

    /// Where this run writes: `output_dir`, or a timestamped directory inside it.
    pub fn destination(&self) -> Result<PathBuf, ConfigError> {
        if self.timestamped {
            Ok(self.output_dir.join(run_timestamp()?))
        } else {
            Ok(self.output_dir.clone())
        }
    }
}

/// Treat empty strings and `"none"` as an unset optional setting.
fn enabled(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("none"))
}

fn parse_component(raw: &str, what: &str, input: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| invalid(format!("invalid {what} '{input}'")))
}

/// Parse `WxH`. Each dimension must be in `1..=4080`.
pub fn parse_size(s: &str) -> Result<Size, ConfigError> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| invalid(format!("invalid size '{s}', expected WIDTHxHEIGHT")))?;
    let width = parse_component(w, "size", s)?;
    let height = parse_component(h, "size", s)?;
    for dim in [width, height] {
        if dim == 0 || dim > MAX_DIMENSION {
            return Err(invalid(format!(
                "size '{s}' out of range: each dimension must be 1-{MAX_DIMENSION}"
            )));
        }
    }
    Ok(Size::new(width, height))
}

/// Parse `W:H` with non-zero components.
pub fn parse_aspect(s: &str) -> Result<AspectRatio, ConfigError> {
    let (w, h) = s
        .split_once(':')
        .ok_or_else(|| invalid(format!("invalid aspect ratio '{s}', expected W:H")))?;
    let width = parse_component(w, "aspect ratio", s)?;
    let height = parse_component(h, "aspect ratio", s)?;
    if width == 0 || height == 0 {
        return Err(invalid(format!(
            "aspect ratio '{s}' must have non-zero components"
        )));
    }
    Ok(AspectRatio::new(width, height))
}

/// Parse 1, 2 or 4 comma-separated margins.
pub fn parse_crop_pixels(s: &str) -> Result<CropPixels, ConfigError> {
    let values = s
        .split(',')
        .map(|v| parse_component(v, "crop pixels", s))
        .collect::<Result<Vec<_>, _>>()?;
    match values[..] {
        [v] => Ok(CropPixels::Uniform(v)),
        [first, second] => Ok(CropPixels::Vertical { first, second }),
        [top, right, bottom, left] => Ok(CropPixels::Sides {
            top,
            right,
            bottom,
            left,
        }),
        _ => Err(invalid(format!(
            "crop pixels '{s}' must have 1, 2 or 4 values"
        ))),
    }
}

/// Parse a comma-separated format list. Duplicates are dropped, order kept.
pub fn parse_formats(s: &str) -> Result<Vec<OutputFormat>, ConfigError> {
    let mut formats = Vec::new();
    for name in s.split(',').filter(|n| !n.trim().is_empty()) {
        let format = OutputFormat::from_name(name)
            .ok_or_else(|| invalid(format!("unsupported output format '{}'", name.trim())))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        return Err(invalid(format!("no output format in '{s}'")));
    }
    Ok(formats)
}

/// Name of the per-run output subdirectory, `YYYYMMDD_HHMMSS` in local time.
pub fn run_timestamp() -> Result<String, ConfigError> {
    use time::{OffsetDateTime, macros::format_description};
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(format)
        .map_err(|e| ConfigError::Timestamp(e.to_string()))
}

/// Resolve the effective thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(threads: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// ============================================================================
// Layered loading
// ============================================================================

/// Stock defaults as a TOML value, the base of every merge.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Settings::default())?)
}

/// Deep-merge two TOML values. Tables merge key by key; anything else is replaced.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a settings file as a raw TOML value. Returns `None` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge layers over `base` in order and deserialize the result.
pub fn resolve_settings(
    base: toml::Value,
    layers: impl IntoIterator<Item = toml::Value>,
) -> Result<Settings, ConfigError> {
    let merged = layers.into_iter().fold(base, merge_toml);
    let settings: Settings = merged.try_into()?;
    settings.transform_config()?;
    Ok(settings)
}

/// Load settings: stock defaults, then the settings file, then `overrides`.
///
/// An explicit `config_path` must exist; without one, [`CONFIG_FILE`] in the
/// working directory is used if present.
pub fn load_settings(
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<Settings, ConfigError> {
    let file_layer = match config_path {
        Some(path) => Some(load_raw_config(path)?.ok_or_else(|| {
            invalid(format!("config file {} not found", path.display()))
        })?),
        None => load_raw_config(Path::new(CONFIG_FILE))?,
    };
    let cli_layer = toml::Value::try_from(overrides)?;
    resolve_settings(
        stock_defaults_value()?,
        file_layer.into_iter().chain(Some(cli_layer)),
    )
}

/// A documented stock `imgopt.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r##"# imgopt configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override this file.
# Unknown keys will cause an error.

# Directory scanned recursively for .jpg/.jpeg/.jfif/.png/.webp sources.
input_dir = "input"

# Directory receiving the results. Source subdirectories are mirrored.
output_dir = "output"

# Write into a fresh YYYYMMDD_HHMMSS subdirectory of output_dir on every run.
timestamped = true

# ---------------------------------------------------------------------------
# Geometry (applied in this order)
# ---------------------------------------------------------------------------

# 1. Crop to an aspect ratio "W:H". "none" disables.
aspect = "1:1"

# Part of the image the aspect crop keeps: center, top, bottom, left, right.
crop = "center"

# 2. Resize to exactly "WxH" (each side 1-4080). "none" disables.
size = "1080x1080"

# 3. Shrink to fit inside "WxH", keeping proportions. Never enlarges.
# max_size = "2000x2000"

# 4. Remove fixed margins: "v" (all edges), "top,bottom" (top also
# applies to left and right), or "top,right,bottom,left".
# crop_pixels = "10,20,30,40"

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------

# Comma-separated list of jpeg, png, webp, tiff. Omit to keep each source's
# own format.
# format = "webp"

# 0-100. WebP at 100 is lossless. PNG and TIFF are always lossless.
quality = 90

# Dots per inch written into the output's resolution metadata.
# dpi = 300

# Copy the source EXIF block into JPEG and TIFF outputs.
keep_metadata = false

# Put each format under its own subdirectory (output/webp/..., output/jpg/...).
group_by_format = false

# Remove each source after all of its outputs were written.
delete_original = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------

# Maximum parallel workers. Omit to use every CPU core.
# threads = 4
"##
}
