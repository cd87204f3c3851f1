//! Shared test utilities: synthetic images on disk and EXIF readers.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("rotated.jpg");
//! write_jpeg_with_orientation(&path, 64, 48, 6);
//! assert_eq!(exif_orientation(&path), Some(6));
//! ```

use crate::imaging::exif::embed_in_jpeg;
use exif::experimental::Writer;
use exif::{Exif, Field, In, Rational, Reader, Tag, Value};
use image::{ImageEncoder, RgbImage};
use std::io::{BufReader, Cursor};
use std::path::Path;

// =========================================================================
// Synthetic images
// =========================================================================

/// Deterministic RGB gradient, so crops can be checked by pixel value.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a small valid JPEG with the given dimensions.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Write a JPEG carrying an EXIF block built from `fields`.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, fields: &[Field]) {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut block = Cursor::new(Vec::new());
    writer.write(&mut block, false).unwrap();

    let bytes = embed_in_jpeg(&jpeg_bytes(width, height), &block.into_inner()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Write a JPEG carrying an EXIF block with `Orientation` and `Make`.
pub fn write_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u16) {
    let orientation = Field {
        tag: Tag::Orientation,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![orientation]),
    };
    let make = Field {
        tag: Tag::Make,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"TestCam".to_vec()]),
    };
    write_jpeg_with_exif(path, width, height, &[orientation, make]);
}

/// Fields a camera would write: 72 dpi, orientation, capture time and GPS.
pub fn camera_fields() -> Vec<Field> {
    let density = Value::Rational(vec![Rational { num: 72, denom: 1 }]);
    vec![
        Field {
            tag: Tag::XResolution,
            ifd_num: In::PRIMARY,
            value: density.clone(),
        },
        Field {
            tag: Tag::YResolution,
            ifd_num: In::PRIMARY,
            value: density,
        },
        Field {
            tag: Tag::ResolutionUnit,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![2]),
        },
        Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![6]),
        },
        Field {
            tag: Tag::DateTimeOriginal,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"2024:05:01 10:20:30".to_vec()]),
        },
        Field {
            tag: Tag::FNumber,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![Rational { num: 28, denom: 10 }]),
        },
        Field {
            tag: Tag::GPSLatitudeRef,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"N".to_vec()]),
        },
    ]
}

// =========================================================================
// Readers
// =========================================================================

/// Parsed EXIF of an encoded file, `None` if it has no EXIF block.
pub fn read_file_exif(path: &Path) -> Option<Exif> {
    let file = std::fs::File::open(path).ok()?;
    Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()
}

/// EXIF orientation of an encoded file, `None` if it has no EXIF block.
pub fn exif_orientation(path: &Path) -> Option<u32> {
    read_file_exif(path)?
        .get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)
}
