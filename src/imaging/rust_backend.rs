//! Pure Rust codec backend.
//!
//! Everything is statically linked into the binary except libwebp, which the
//! `webp` crate builds from vendored sources.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with content sniffing |
//! | Read EXIF | `kamadak-exif` container reader |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` + JFIF density + APP1 EXIF |
//! | Encode → PNG | `png` crate (needed for the `pHYs` chunk) |
//! | Encode → WebP (q = 100) | `image::codecs::webp::WebPEncoder::new_lossless` |
//! | Encode → WebP (q < 100) | `webp::Encoder` (libwebp lossy) |
//! | Encode → TIFF | `tiff` crate (resolution + descriptive EXIF tags) |

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::exif::{self, TiffTagValue};
use super::params::{EncodeRequest, OutputFormat, Quality};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;
use tiff::encoder::{Rational, TiffEncoder, colortype};
use tiff::tags::{ResolutionUnit, Tag};
use tracing::trace;

/// Source extensions the tool picks up, paired with the decoder they need.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("jfif", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the lowercase source extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel layouts the encoders accept. Everything is reduced to 8 bits per channel.
enum Pixels {
    Gray(Vec<u8>),
    Rgb(Vec<u8>),
    Rgba(Vec<u8>),
}

impl Pixels {
    fn from_image(img: &DynamicImage) -> Self {
        let color = img.color();
        if color.has_alpha() {
            Pixels::Rgba(img.to_rgba8().into_raw())
        } else if color.has_color() {
            Pixels::Rgb(img.to_rgb8().into_raw())
        } else {
            Pixels::Gray(img.to_luma8().into_raw())
        }
    }

    /// Same as [`from_image`](Self::from_image) but without alpha, for JPEG.
    fn opaque(img: &DynamicImage) -> Self {
        if img.color().has_color() {
            Pixels::Rgb(img.to_rgb8().into_raw())
        } else {
            Pixels::Gray(img.to_luma8().into_raw())
        }
    }

    /// Gray has no WebP encoding; widen it to RGB.
    fn color_only(img: &DynamicImage) -> Self {
        match Self::from_image(img) {
            Pixels::Gray(_) => Pixels::Rgb(img.to_rgb8().into_raw()),
            other => other,
        }
    }

    fn data(&self) -> &[u8] {
        match self {
            Pixels::Gray(d) | Pixels::Rgb(d) | Pixels::Rgba(d) => d,
        }
    }

    fn color_type(&self) -> ExtendedColorType {
        match self {
            Pixels::Gray(_) => ExtendedColorType::L8,
            Pixels::Rgb(_) => ExtendedColorType::Rgb8,
            Pixels::Rgba(_) => ExtendedColorType::Rgba8,
        }
    }
}

fn encode_failed(format: OutputFormat, err: impl std::fmt::Display) -> BackendError {
    BackendError::Encode(format!("{format} encode failed: {err}"))
}

fn encode_jpeg(
    img: &DynamicImage,
    quality: Quality,
    dpi: Option<u16>,
    exif_block: Option<&[u8]>,
) -> Result<Vec<u8>, BackendError> {
    let pixels = Pixels::opaque(img);
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.value().max(1));
    if let Some(dpi) = dpi {
        encoder.set_pixel_density(PixelDensity::dpi(dpi));
    }
    encoder
        .write_image(
            pixels.data(),
            img.width(),
            img.height(),
            pixels.color_type(),
        )
        .map_err(|e| encode_failed(OutputFormat::Jpeg, e))?;

    match exif_block {
        Some(block) => {
            let mut block = block.to_vec();
            if let Some(dpi) = dpi {
                // Readers that prefer EXIF over JFIF must see the same density
                exif::stamp_resolution(&mut block, dpi);
            }
            exif::embed_in_jpeg(&buf, &block)
        }
        None => Ok(buf),
    }
}

/// Dots per inch to pixels per metre, rounded.
fn pixels_per_metre(dpi: u16) -> u32 {
    (dpi as u32 * 10_000 + 127) / 254
}

fn encode_png(img: &DynamicImage, dpi: Option<u16>) -> Result<Vec<u8>, BackendError> {
    let pixels = Pixels::from_image(img);
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, img.width(), img.height());
        encoder.set_color(match pixels {
            Pixels::Gray(_) => png::ColorType::Grayscale,
            Pixels::Rgb(_) => png::ColorType::Rgb,
            Pixels::Rgba(_) => png::ColorType::Rgba,
        });
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(dpi) = dpi {
            let ppm = pixels_per_metre(dpi);
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| encode_failed(OutputFormat::Png, e))?;
        writer
            .write_image_data(pixels.data())
            .map_err(|e| encode_failed(OutputFormat::Png, e))?;
        writer
            .finish()
            .map_err(|e| encode_failed(OutputFormat::Png, e))?;
    }
    Ok(buf)
}

fn encode_webp(
    img: &DynamicImage,
    quality: Quality,
    dpi: Option<u16>,
) -> Result<Vec<u8>, BackendError> {
    let pixels = Pixels::color_only(img);
    let (width, height) = (img.width(), img.height());

    let buf = if quality.is_lossless() {
        let mut buf = Vec::new();
        WebPEncoder::new_lossless(&mut buf)
            .write_image(pixels.data(), width, height, pixels.color_type())
            .map_err(|e| encode_failed(OutputFormat::Webp, e))?;
        buf
    } else {
        let encoder = match &pixels {
            Pixels::Rgba(data) => webp::Encoder::from_rgba(data, width, height),
            _ => webp::Encoder::from_rgb(pixels.data(), width, height),
        };
        encoder
            .encode_simple(false, quality.value() as f32)
            .map_err(|e| encode_failed(OutputFormat::Webp, format!("{e:?}")))?
            .to_vec()
    };

    match dpi {
        Some(dpi) => exif::embed_in_webp(&buf, &exif::resolution_block(dpi)?, width, height),
        None => Ok(buf),
    }
}

fn encode_tiff(
    img: &DynamicImage,
    dpi: Option<u16>,
    exif_block: Option<&[u8]>,
) -> Result<Vec<u8>, BackendError> {
    let pixels = Pixels::from_image(img);
    let metadata = exif_block.map(exif::tiff_metadata).unwrap_or_default();
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder =
            TiffEncoder::new(&mut buf).map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
        // Monomorphised per color type; the body is identical.
        macro_rules! write_tiff {
            ($color:ty, $data:expr) => {{
                let mut image = encoder
                    .new_image::<$color>(img.width(), img.height())
                    .map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
                if let Some(dpi) = dpi {
                    image.resolution(
                        ResolutionUnit::Inch,
                        Rational {
                            n: dpi as u32,
                            d: 1,
                        },
                    );
                }
                for tag in &metadata.tags {
                    let dir = image.encoder();
                    let written = match &tag.value {
                        TiffTagValue::Ascii(s) => dir.write_tag(Tag::Unknown(tag.number), s.as_str()),
                        TiffTagValue::Short(v) => dir.write_tag(Tag::Unknown(tag.number), v.as_slice()),
                        TiffTagValue::Long(v) => dir.write_tag(Tag::Unknown(tag.number), v.as_slice()),
                    };
                    written.map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
                }
                for ifd in &metadata.sub_ifds {
                    let dir = image.encoder();
                    // Writing nothing reports the current end of the file
                    let start = dir
                        .write_data(&[] as &[u8])
                        .map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
                    let (offset, bytes) = ifd.layout(start)?;
                    dir.write_data(bytes.as_slice())
                        .map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
                    dir.write_tag(Tag::Unknown(ifd.pointer), offset)
                        .map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
                }
                image
                    .write_data($data)
                    .map_err(|e| encode_failed(OutputFormat::Tiff, e))?;
            }};
        }
        match &pixels {
            Pixels::Gray(data) => write_tiff!(colortype::Gray8, data),
            Pixels::Rgb(data) => write_tiff!(colortype::RGB8, data),
            Pixels::Rgba(data) => write_tiff!(colortype::RGBA8, data),
        }
    }
    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError> {
        let bytes = std::fs::read(path)?;
        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(BackendError::Io)?;
        let format = reader.format();
        if format.is_none() {
            return Err(BackendError::UnsupportedFormat(path.display().to_string()));
        }
        let pixels = reader.decode().map_err(|e| {
            BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
        })?;
        let exif = exif::read_exif(&bytes);
        trace!(path = %path.display(), ?format, exif = exif.is_some(), "decoded");
        Ok(SourceImage {
            pixels,
            format,
            exif,
        })
    }

    fn encode(&self, image: &DynamicImage, request: &EncodeRequest) -> Result<(), BackendError> {
        let exif_block = request.exif.as_deref();
        let bytes = match request.format {
            OutputFormat::Jpeg => encode_jpeg(image, request.quality, request.dpi, exif_block)?,
            OutputFormat::Png => encode_png(image, request.dpi)?,
            OutputFormat::Webp => encode_webp(image, request.quality, request.dpi)?,
            OutputFormat::Tiff => encode_tiff(image, request.dpi, exif_block)?,
        };
        std::fs::write(&request.output, bytes)?;
        Ok(())
    }
}
