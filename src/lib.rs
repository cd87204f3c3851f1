//! # imgopt
//!
//! Batch image cropper, resizer and re-encoder. Point it at a directory of
//! photos and every supported file is transformed the same way and written
//! to a mirrored tree under the output directory.
//!
//! # Architecture: One Pipeline Per File
//!
//! ```text
//! scan      input/     →  [SourceFile]             (walkdir, sorted)
//! process   SourceFile →  decode → transforms → encode × N → (delete original)
//! output    events     →  stdout                   (one line per file + summary)
//! ```
//!
//! Each file is independent. A failure is reported for that file and the
//! batch moves on; only an unusable configuration or an uncreatable
//! destination stops the run before it begins.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `imgopt.toml` + flag layering, validation into [`config::TransformConfig`] |
//! | [`scan`] | Discovers source images under the input directory |
//! | [`process`] | Runs the per-file pipeline over a rayon pool, emits progress events |
//! | [`imaging`] | Crop/resize geometry, transform chain, codecs and EXIF handling |
//! | [`output`] | User-facing progress and summary lines |
//! | [`logging`] | `tracing` subscriber setup for diagnostics on stderr |
//!
//! # Design Decisions
//!
//! ## Integer Geometry
//!
//! Crop rectangles and downscale dimensions are computed with integer
//! arithmetic on `u64`. Ratios are compared by cross-multiplication, so the
//! same input always produces the same rectangle on every platform and no
//! intermediate float can round a dimension to zero.
//!
//! ## Validate Once
//!
//! Strings like `"1080x1080"` or `"10,20,30,40"` are parsed exactly once,
//! when the configuration is loaded. Workers only ever see the typed,
//! immutable [`config::TransformConfig`], so a bad value fails the run before
//! any file is touched instead of failing every file the same way.
//!
//! ## Fresh Encode Requests
//!
//! Every output format gets its own [`imaging::EncodeRequest`] built from the
//! configuration. Options for one format (lossless WebP, EXIF for JPEG)
//! cannot leak into the next.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate family (`png`, `tiff`,
//! `jpeg-decoder`/`zune-jpeg`), with `libwebp` through the `webp` crate for
//! lossy WebP. No ImageMagick, no system libraries to install.

pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
