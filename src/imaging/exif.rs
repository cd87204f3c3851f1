//! EXIF capture and re-attachment.
//!
//! Reading uses `kamadak-exif`, which understands JPEG, TIFF, PNG and WebP
//! containers. Writing works on encoded bytes:
//!
//! | Target | Where the block goes |
//! |---|---|
//! | JPEG | APP1 `Exif\0\0` segment right after SOI / JFIF APP0 |
//! | WebP | `EXIF` chunk, converting a simple file to the extended (VP8X) layout |
//! | TIFF | descriptive IFD0 tags plus the Exif and GPS sub-IFDs, see [`tiff_metadata`] |
//!
//! [`resolution_block`] synthesizes a minimal block holding only
//! XResolution / YResolution / ResolutionUnit, used to stamp DPI into WebP.

use super::backend::BackendError;
use exif::experimental::Writer;
use exif::{Context, Exif, Field, In, Rational, Reader, Tag, Value};
use std::io::Cursor;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

/// Extract the raw TIFF-structured EXIF block from an encoded image.
/// Returns `None` if the container has no EXIF or can't be parsed.
pub fn read_exif(bytes: &[u8]) -> Option<Vec<u8>> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    Some(exif.buf().to_vec())
}

// ---------------------------------------------------------------------------
// JPEG
// ---------------------------------------------------------------------------

/// Insert `exif` as an APP1 segment into an encoded JPEG.
///
/// The segment goes after SOI and a leading JFIF APP0, which is where
/// readers expect it.
pub fn embed_in_jpeg(jpeg: &[u8], exif: &[u8]) -> Result<Vec<u8>, BackendError> {
    if !jpeg.starts_with(&SOI) {
        return Err(BackendError::Encode("JPEG stream has no SOI marker".into()));
    }
    // Segment length counts its own two bytes
    let seg_len = EXIF_HEADER.len() + exif.len() + 2;
    let seg_len = u16::try_from(seg_len).map_err(|_| {
        BackendError::Encode(format!(
            "EXIF block of {} bytes does not fit in a JPEG APP1 segment",
            exif.len()
        ))
    })?;

    let mut insert_at = SOI.len();
    if jpeg.len() >= insert_at + 4 && jpeg[insert_at] == 0xFF && jpeg[insert_at + 1] == APP0 {
        let app0_len = u16::from_be_bytes([jpeg[insert_at + 2], jpeg[insert_at + 3]]) as usize;
        insert_at = (insert_at + 2 + app0_len).min(jpeg.len());
    }

    let mut out = Vec::with_capacity(jpeg.len() + seg_len as usize + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[0xFF, APP1]);
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Resolution-only block
// ---------------------------------------------------------------------------

/// Build a TIFF-structured EXIF block carrying only the resolution tags.
pub fn resolution_block(dpi: u16) -> Result<Vec<u8>, BackendError> {
    let density = Value::Rational(vec![Rational {
        num: dpi as u32,
        denom: 1,
    }]);
    let x_res = Field {
        tag: Tag::XResolution,
        ifd_num: In::PRIMARY,
        value: density.clone(),
    };
    let y_res = Field {
        tag: Tag::YResolution,
        ifd_num: In::PRIMARY,
        value: density,
    };
    // 2 = inches
    let unit = Field {
        tag: Tag::ResolutionUnit,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![2]),
    };

    let mut writer = Writer::new();
    writer.push_field(&x_res);
    writer.push_field(&y_res);
    writer.push_field(&unit);

    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, false)
        .map_err(|e| BackendError::Encode(format!("EXIF write failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Overwrite the IFD0 resolution tags of a raw EXIF block with `dpi` per inch.
///
/// Only tags already present are touched and the block layout never
/// changes, so maker notes and other offset-bearing data stay valid.
pub fn stamp_resolution(block: &mut [u8], dpi: u16) {
    let little = match block.get(0..2) {
        Some(b"II") => true,
        Some(b"MM") => false,
        _ => return,
    };
    let u16_at = move |b: &[u8], at: usize| {
        b.get(at..at + 2).map(|r| {
            let r = [r[0], r[1]];
            if little { u16::from_le_bytes(r) } else { u16::from_be_bytes(r) }
        })
    };
    let u32_at = move |b: &[u8], at: usize| {
        b.get(at..at + 4).map(|r| {
            let r = [r[0], r[1], r[2], r[3]];
            if little { u32::from_le_bytes(r) } else { u32::from_be_bytes(r) }
        })
    };
    let u32_bytes = move |v: u32| if little { v.to_le_bytes() } else { v.to_be_bytes() };

    let Some(ifd) = u32_at(block, 4).map(|o| o as usize) else {
        return;
    };
    let Some(count) = u16_at(block, ifd) else {
        return;
    };
    for i in 0..count as usize {
        let entry = ifd + 2 + 12 * i;
        let (Some(tag), Some(kind), Some(n)) = (
            u16_at(block, entry),
            u16_at(block, entry + 2),
            u32_at(block, entry + 4),
        ) else {
            return;
        };
        let value_at = entry + 8;
        match (tag, kind, n) {
            // X/YResolution: one RATIONAL, stored out of line
            (0x011A | 0x011B, 5, 1) => {
                let Some(offset) = u32_at(block, value_at).map(|o| o as usize) else {
                    continue;
                };
                if let Some(slot) = block.get_mut(offset..offset + 8) {
                    slot[..4].copy_from_slice(&u32_bytes(dpi as u32));
                    slot[4..].copy_from_slice(&u32_bytes(1));
                }
            }
            // ResolutionUnit: one SHORT, inline
            (0x0128, 3, 1) => {
                let unit = if little { 2u16.to_le_bytes() } else { 2u16.to_be_bytes() };
                if let Some(slot) = block.get_mut(value_at..value_at + 2) {
                    slot.copy_from_slice(&unit);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// WebP (RIFF)
// ---------------------------------------------------------------------------

const VP8X_FLAG_EXIF: u8 = 0x08;
const VP8X_FLAG_ALPHA: u8 = 0x10;

/// Split a RIFF WebP body (after `WEBP`) into `(fourcc, payload)` chunks.
fn webp_chunks(body: &[u8]) -> Result<Vec<([u8; 4], &[u8])>, BackendError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos + 8 <= body.len() {
        let fourcc = [body[pos], body[pos + 1], body[pos + 2], body[pos + 3]];
        let len = u32::from_le_bytes([body[pos + 4], body[pos + 5], body[pos + 6], body[pos + 7]])
            as usize;
        pos += 8;
        if pos + len > body.len() {
            return Err(BackendError::Encode("truncated WebP chunk".into()));
        }
        chunks.push((fourcc, &body[pos..pos + len]));
        // Payloads are padded to even length
        pos += len + (len & 1);
    }
    Ok(chunks)
}

fn push_chunk(out: &mut Vec<u8>, fourcc: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(fourcc);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() & 1 == 1 {
        out.push(0);
    }
}

/// Whether a lone `VP8L` bitstream declares an alpha channel.
fn vp8l_has_alpha(payload: &[u8]) -> bool {
    // 0x2f signature, then 14 bits width-1, 14 bits height-1, 1 bit alpha
    payload.len() >= 5 && payload[0] == 0x2f && {
        let bits = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
        (bits >> 28) & 1 == 1
    }
}

/// Attach `exif` to an encoded WebP, upgrading it to the extended layout if needed.
pub fn embed_in_webp(
    webp: &[u8],
    exif: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, BackendError> {
    if webp.len() < 12 || &webp[0..4] != b"RIFF" || &webp[8..12] != b"WEBP" {
        return Err(BackendError::Encode("not a RIFF WebP stream".into()));
    }
    let chunks = webp_chunks(&webp[12..])?;

    let mut body = Vec::with_capacity(webp.len() + exif.len() + 32);
    match chunks.first() {
        Some((fourcc, payload)) if fourcc == b"VP8X" => {
            let mut header = payload.to_vec();
            if let Some(flags) = header.first_mut() {
                *flags |= VP8X_FLAG_EXIF;
            }
            push_chunk(&mut body, b"VP8X", &header);
        }
        _ => {
            let alpha = chunks
                .iter()
                .any(|(fourcc, payload)| fourcc == b"VP8L" && vp8l_has_alpha(payload));
            let mut header = [0u8; 10];
            header[0] = VP8X_FLAG_EXIF | if alpha { VP8X_FLAG_ALPHA } else { 0 };
            header[4..7].copy_from_slice(&(width - 1).to_le_bytes()[..3]);
            header[7..10].copy_from_slice(&(height - 1).to_le_bytes()[..3]);
            push_chunk(&mut body, b"VP8X", &header);
        }
    }
    for (fourcc, payload) in chunks.iter().filter(|(f, _)| f != b"VP8X" && f != b"EXIF") {
        push_chunk(&mut body, fourcc, payload);
    }
    push_chunk(&mut body, b"EXIF", exif);

    let mut out = Vec::with_capacity(body.len() + 12);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend_from_slice(&body);
    Ok(out)
}

// ---------------------------------------------------------------------------
// TIFF
// ---------------------------------------------------------------------------

/// A descriptive IFD0 tag copied from the source EXIF into a TIFF output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffTag {
    pub number: u16,
    pub value: TiffTagValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TiffTagValue {
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
}

/// Source metadata laid out for a TIFF output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TiffMetadata {
    /// Written straight into IFD0 through the encoder.
    pub tags: Vec<TiffTag>,
    /// Written as raw directories, each linked from IFD0 by its pointer tag.
    pub sub_ifds: Vec<SubIfd>,
}

/// Tags that describe the picture rather than its pixel layout. The TIFF
/// encoder writes the layout tags itself.
const DESCRIPTIVE_TAGS: &[Tag] = &[
    Tag::ImageDescription,
    Tag::Make,
    Tag::Model,
    Tag::Orientation,
    Tag::Software,
    Tag::DateTime,
    Tag::Artist,
    Tag::Copyright,
];

/// Split a raw EXIF block into what a TIFF output can carry: the descriptive
/// primary-IFD tags, and the Exif and GPS directories with every field
/// kept at its original type.
pub fn tiff_metadata(exif: &[u8]) -> TiffMetadata {
    let Ok(parsed) = Reader::new().read_raw(exif.to_vec()) else {
        return TiffMetadata::default();
    };

    let tags = DESCRIPTIVE_TAGS
        .iter()
        .filter_map(|&tag| {
            let field = parsed.get_field(tag, In::PRIMARY)?;
            let value = match &field.value {
                Value::Ascii(parts) => {
                    let text = parts.first()?;
                    TiffTagValue::Ascii(String::from_utf8_lossy(text).into_owned())
                }
                Value::Short(v) if !v.is_empty() => TiffTagValue::Short(v.clone()),
                Value::Long(v) if !v.is_empty() => TiffTagValue::Long(v.clone()),
                _ => return None,
            };
            Some(TiffTag {
                number: tag.number(),
                value,
            })
        })
        .collect();

    let sub_ifds = [
        SubIfd::collect(&parsed, Context::Exif, Tag::ExifIFDPointer),
        SubIfd::collect(&parsed, Context::Gps, Tag::GPSInfoIFDPointer),
    ]
    .into_iter()
    .flatten()
    .collect();

    TiffMetadata { tags, sub_ifds }
}

/// One directory entry with its value already encoded.
#[derive(Debug, Clone, PartialEq)]
struct RawEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    data: Vec<u8>,
}

/// A private IFD (Exif or GPS) carried from the source.
///
/// Entries are encoded in native byte order, matching the `tiff` encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct SubIfd {
    /// IFD0 tag that points at this directory.
    pub pointer: u16,
    entries: Vec<RawEntry>,
}

impl SubIfd {
    fn collect(parsed: &Exif, context: Context, pointer: Tag) -> Option<Self> {
        let mut entries: Vec<RawEntry> = parsed
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY && f.tag.context() == context)
            // Offsets into the source block mean nothing in the output
            .filter(|f| f.tag != Tag::InteropIFDPointer)
            .filter_map(raw_entry)
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by_key(|e| e.tag);
        entries.dedup_by_key(|e| e.tag);
        Some(SubIfd {
            pointer: pointer.number(),
            entries,
        })
    }

    /// Serialize the directory for placement at absolute file offset `start`.
    ///
    /// Returns the word-aligned offset the IFD begins at and the bytes to
    /// write at `start`: optional padding, the entry table, a zero next-IFD
    /// link, then the out-of-line values.
    pub fn layout(&self, start: u64) -> Result<(u32, Vec<u8>), BackendError> {
        let pad = (start & 1) as usize;
        let base = start + pad as u64;
        let table_len = 2 + 12 * self.entries.len() + 4;
        let count = u16::try_from(self.entries.len())
            .map_err(|_| BackendError::Encode("too many EXIF entries for one IFD".into()))?;

        let mut bytes = vec![0u8; pad];
        let mut values = Vec::new();
        bytes.extend_from_slice(&count.to_ne_bytes());
        for entry in &self.entries {
            bytes.extend_from_slice(&entry.tag.to_ne_bytes());
            bytes.extend_from_slice(&entry.field_type.to_ne_bytes());
            bytes.extend_from_slice(&entry.count.to_ne_bytes());
            if entry.data.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..entry.data.len()].copy_from_slice(&entry.data);
                bytes.extend_from_slice(&inline);
            } else {
                let offset = file_offset(base + (table_len + values.len()) as u64)?;
                bytes.extend_from_slice(&offset.to_ne_bytes());
                values.extend_from_slice(&entry.data);
                if values.len() & 1 == 1 {
                    values.push(0);
                }
            }
        }
        bytes.extend_from_slice(&0u32.to_ne_bytes());
        bytes.extend_from_slice(&values);
        Ok((file_offset(base)?, bytes))
    }
}

fn file_offset(offset: u64) -> Result<u32, BackendError> {
    u32::try_from(offset)
        .map_err(|_| BackendError::Encode("TIFF output exceeds 4 GiB".into()))
}

fn pack<T: Copy, const N: usize>(values: &[T], to_bytes: fn(T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(|&v| to_bytes(v)).collect()
}

/// Encode a parsed field back into TIFF type code, count and value bytes.
fn raw_entry(field: &Field) -> Option<RawEntry> {
    let (field_type, count, data) = match &field.value {
        Value::Byte(v) => (1, v.len(), v.clone()),
        Value::Ascii(parts) => {
            let data: Vec<u8> = parts
                .iter()
                .flat_map(|part| part.iter().copied().chain([0]))
                .collect();
            (2, data.len(), data)
        }
        Value::Short(v) => (3, v.len(), pack(v, u16::to_ne_bytes)),
        Value::Long(v) => (4, v.len(), pack(v, u32::to_ne_bytes)),
        Value::Rational(v) => {
            let parts: Vec<u32> = v.iter().flat_map(|r| [r.num, r.denom]).collect();
            (5, v.len(), pack(&parts, u32::to_ne_bytes))
        }
        Value::SByte(v) => (6, v.len(), v.iter().map(|&b| b as u8).collect()),
        Value::Undefined(v, _) => (7, v.len(), v.clone()),
        Value::SShort(v) => (8, v.len(), pack(v, i16::to_ne_bytes)),
        Value::SLong(v) => (9, v.len(), pack(v, i32::to_ne_bytes)),
        Value::SRational(v) => {
            let parts: Vec<i32> = v.iter().flat_map(|r| [r.num, r.denom]).collect();
            (10, v.len(), pack(&parts, i32::to_ne_bytes))
        }
        Value::Float(v) => (11, v.len(), pack(v, f32::to_ne_bytes)),
        Value::Double(v) => (12, v.len(), pack(v, f64::to_ne_bytes)),
        Value::Unknown(..) => return None,
    };
    if count == 0 {
        return None;
    }
    Some(RawEntry {
        tag: field.tag.number(),
        field_type,
        count: u32::try_from(count).ok()?,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orientation_block(orientation: u16) -> Vec<u8> {
        let field = Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![orientation]),
        };
        let make = Field {
            tag: Tag::Make,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"Acme".to_vec()]),
        };
        let mut writer = Writer::new();
        writer.push_field(&field);
        writer.push_field(&make);
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    #[test]
    fn resolution_block_parses_back() {
        let block = resolution_block(300).unwrap();
        let parsed = Reader::new().read_raw(block).unwrap();
        let x = parsed.get_field(Tag::XResolution, In::PRIMARY).unwrap();
        assert!(matches!(&x.value, Value::Rational(v) if v[0].num == 300 && v[0].denom == 1));
        let unit = parsed.get_field(Tag::ResolutionUnit, In::PRIMARY).unwrap();
        assert_eq!(unit.value.get_uint(0), Some(2));
    }

    #[test]
    fn stamp_resolution_rewrites_existing_tags() {
        let centimetres = Field {
            tag: Tag::ResolutionUnit,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![3]),
        };
        let density = Value::Rational(vec![Rational { num: 72, denom: 1 }]);
        let mut writer = Writer::new();
        let x_res = Field {
            tag: Tag::XResolution,
            ifd_num: In::PRIMARY,
            value: density.clone(),
        };
        let y_res = Field {
            tag: Tag::YResolution,
            ifd_num: In::PRIMARY,
            value: density,
        };
        writer.push_field(&x_res);
        writer.push_field(&y_res);
        writer.push_field(&centimetres);
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        let mut block = buf.into_inner();
        let len = block.len();

        stamp_resolution(&mut block, 300);

        assert_eq!(block.len(), len);
        let parsed = Reader::new().read_raw(block).unwrap();
        for tag in [Tag::XResolution, Tag::YResolution] {
            let field = parsed.get_field(tag, In::PRIMARY).unwrap();
            assert!(matches!(&field.value, Value::Rational(v) if v[0].num == 300 && v[0].denom == 1));
        }
        let unit = parsed.get_field(Tag::ResolutionUnit, In::PRIMARY).unwrap();
        assert_eq!(unit.value.get_uint(0), Some(2));
    }

    #[test]
    fn stamp_resolution_leaves_blocks_without_resolution_alone() {
        let original = orientation_block(6);
        let mut block = original.clone();
        stamp_resolution(&mut block, 300);
        assert_eq!(block, original);

        let mut garbage = b"nope".to_vec();
        stamp_resolution(&mut garbage, 300);
        assert_eq!(garbage, b"nope");
    }

    #[test]
    fn jpeg_without_soi_is_rejected() {
        assert!(embed_in_jpeg(b"not a jpeg", b"II*\0").is_err());
    }

    #[test]
    fn jpeg_segment_goes_after_app0() {
        // SOI, APP0 of length 4 (2 payload bytes), then EOI
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xD9];
        let out = embed_in_jpeg(&jpeg, b"XY").unwrap();
        assert_eq!(&out[..8], &jpeg[..8]);
        assert_eq!(&out[8..10], &[0xFF, 0xE1]);
        assert_eq!(u16::from_be_bytes([out[10], out[11]]), 2 + 6 + 2);
        assert_eq!(&out[12..18], EXIF_HEADER);
        assert_eq!(&out[18..20], b"XY");
        assert_eq!(&out[20..], &[0xFF, 0xD9]);
    }

    #[test]
    fn jpeg_oversized_block_is_rejected() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xD9];
        let huge = vec![0u8; 70_000];
        assert!(embed_in_jpeg(&jpeg, &huge).is_err());
    }

    #[test]
    fn webp_simple_file_becomes_extended() {
        // Minimal RIFF with one odd-length VP8L chunk (not a decodable image)
        let payload = [0x2f, 0x00, 0x00, 0x00, 0x10];
        let mut body = Vec::new();
        push_chunk(&mut body, b"VP8L", &payload);
        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        webp.extend_from_slice(b"WEBP");
        webp.extend_from_slice(&body);

        let out = embed_in_webp(&webp, b"EXIFDATA", 16, 8).unwrap();
        let chunks = webp_chunks(&out[12..]).unwrap();
        let names: Vec<&[u8; 4]> = chunks.iter().map(|(f, _)| f).collect();
        assert_eq!(names, vec![b"VP8X", b"VP8L", b"EXIF"]);

        let vp8x = chunks[0].1;
        assert_eq!(vp8x[0], VP8X_FLAG_EXIF | VP8X_FLAG_ALPHA);
        assert_eq!(&vp8x[4..7], &[15, 0, 0]);
        assert_eq!(&vp8x[7..10], &[7, 0, 0]);
        assert_eq!(chunks[2].1, b"EXIFDATA");

        let riff_len = u32::from_le_bytes([out[4], out[5], out[6], out[7]]) as usize;
        assert_eq!(riff_len + 8, out.len());
    }

    #[test]
    fn webp_rejects_other_containers() {
        assert!(embed_in_webp(b"\x89PNG\r\n\x1a\n....", b"x", 1, 1).is_err());
    }

    fn camera_block() -> Vec<u8> {
        let fields = [
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
                tag: Tag::ExposureTime,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![Rational { num: 1, denom: 250 }]),
            },
            Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![b"N".to_vec()]),
            },
        ];
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    #[test]
    fn tiff_metadata_keeps_descriptive_fields() {
        let tags = tiff_metadata(&orientation_block(6)).tags;
        assert!(tags.contains(&TiffTag {
            number: 274,
            value: TiffTagValue::Short(vec![6]),
        }));
        assert!(tags.contains(&TiffTag {
            number: 271,
            value: TiffTagValue::Ascii("Acme".to_string()),
        }));
    }

    #[test]
    fn tiff_metadata_of_garbage_is_empty() {
        assert_eq!(tiff_metadata(b"nope"), TiffMetadata::default());
    }

    #[test]
    fn tiff_metadata_splits_exif_and_gps_directories() {
        let metadata = tiff_metadata(&camera_block());
        let pointers: Vec<u16> = metadata.sub_ifds.iter().map(|ifd| ifd.pointer).collect();
        assert_eq!(
            pointers,
            vec![Tag::ExifIFDPointer.number(), Tag::GPSInfoIFDPointer.number()]
        );
        // DateTimeOriginal + ExposureTime
        assert_eq!(metadata.sub_ifds[0].entries.len(), 2);
        assert_eq!(metadata.sub_ifds[1].entries.len(), 1);
    }

    #[test]
    fn sub_ifd_layout_is_word_aligned_with_offsets_past_the_table() {
        let metadata = tiff_metadata(&camera_block());
        let exif_ifd = &metadata.sub_ifds[0];

        let (offset, bytes) = exif_ifd.layout(101).unwrap();
        assert_eq!(offset, 102);
        assert_eq!(bytes[0], 0);
        let count = u16::from_ne_bytes([bytes[1], bytes[2]]);
        assert_eq!(count, 2);

        // ExposureTime (0x829a) sorts before DateTimeOriginal (0x9003)
        let first = &bytes[3..15];
        assert_eq!(u16::from_ne_bytes([first[0], first[1]]), 0x829a);
        assert_eq!(u16::from_ne_bytes([first[2], first[3]]), 5);
        let value_at = u32::from_ne_bytes([first[8], first[9], first[10], first[11]]);
        let table_end = 102 + 2 + 12 * 2 + 4;
        assert_eq!(value_at, table_end);
        let rel = (value_at - 101) as usize;
        assert_eq!(u32::from_ne_bytes(bytes[rel..rel + 4].try_into().unwrap()), 1);
        assert_eq!(
            u32::from_ne_bytes(bytes[rel + 4..rel + 8].try_into().unwrap()),
            250
        );
    }
}
