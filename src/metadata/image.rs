//! Image metadata extraction (EXIF, PNG, GIF)
//!
//! JPEG and TIFF carry EXIF: a TIFF byte stream holding tagged directories
//! with camera, capture and GPS attributes. PNG and GIF expose dimensions in
//! their fixed headers. Everything here parses a bounded prefix window; any
//! field that fails to parse is silently omitted.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{u16_be, u16_le, u32_be};

/// Attributes extracted from an image file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Device manufacturer (EXIF Make)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    /// Device model (EXIF Model)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    /// File modification timestamp as recorded by the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Original capture timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time_original: Option<String>,
    /// Shutter speed, e.g. "1/125"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length_mm: Option<f64>,
    /// Signed decimal degrees, negative = South
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,
    /// Signed decimal degrees, negative = West
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_altitude_m: Option<f64>,
}

/// Extract image attributes from the leading bytes of a file
pub fn extract(window: &[u8]) -> ImageMetadata {
    let mut meta = ImageMetadata::default();

    if window.len() >= 3 && window[..3] == [0xFF, 0xD8, 0xFF] {
        extract_jpeg(window, &mut meta);
    } else if window.len() >= 8 && window[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        extract_png(window, &mut meta);
    } else if window.len() >= 6 && (window[..6] == *b"GIF87a" || window[..6] == *b"GIF89a") {
        extract_gif(window, &mut meta);
    } else if window.len() >= 4
        && (window[..4] == [0x49, 0x49, 0x2A, 0x00] || window[..4] == [0x4D, 0x4D, 0x00, 0x2A])
    {
        // Bare TIFF: the whole file is the EXIF byte stream
        parse_tiff(window, &mut meta);
    }

    meta
}

// =============================================================================
// JPEG segment walk
// =============================================================================

/// Walk JPEG segments for the APP1/EXIF payload and an SOF frame header
fn extract_jpeg(data: &[u8], meta: &mut ImageMetadata) {
    let mut pos = 2; // past SOI
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // standalone markers carry no length
        if marker == 0xD8 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let seg_len = match u16_be(data, pos + 2) {
            Some(l) if l >= 2 => l as usize,
            _ => break,
        };
        let payload = match data.get(pos + 4..pos + 2 + seg_len) {
            Some(p) => p,
            None => break,
        };

        match marker {
            // APP1 containing "Exif\0\0" + TIFF stream
            0xE1 if payload.len() > 6 && &payload[..6] == b"Exif\x00\x00" => {
                parse_tiff(&payload[6..], meta);
            }
            // SOF frames: precision(1) height(2) width(2)
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD
            | 0xCE | 0xCF => {
                if meta.height.is_none() {
                    meta.height = u16_be(payload, 1).map(u32::from);
                }
                if meta.width.is_none() {
                    meta.width = u16_be(payload, 3).map(u32::from);
                }
            }
            // entropy-coded data follows SOS; nothing structured past it
            0xDA => break,
            _ => {}
        }
        pos += 2 + seg_len;
    }
}

fn extract_png(data: &[u8], meta: &mut ImageMetadata) {
    // IHDR is mandatory and always first: length(4) "IHDR" width(4) height(4)
    if data.get(12..16) == Some(b"IHDR") {
        meta.width = u32_be(data, 16);
        meta.height = u32_be(data, 20);
    }
}

fn extract_gif(data: &[u8], meta: &mut ImageMetadata) {
    // logical screen descriptor follows the 6-byte signature
    meta.width = u16_le(data, 6).map(u32::from);
    meta.height = u16_le(data, 8).map(u32::from);
}

// =============================================================================
// TIFF/EXIF directory walk
// =============================================================================

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

/// Bounds-checked reader over one TIFF byte stream
struct TiffReader<'a> {
    data: &'a [u8],
    big_endian: bool,
}

/// One parsed IFD entry
struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    /// Offset of the value bytes within the TIFF stream
    value_offset: usize,
}

impl<'a> TiffReader<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(..2)? {
            b"II" => false,
            b"MM" => true,
            _ => return None,
        };
        let reader = Self { data, big_endian };
        if reader.u16(2)? != 42 {
            return None;
        }
        Some(reader)
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.data.get(offset..offset + 2)?;
        Some(if self.big_endian {
            u16::from_be_bytes([bytes[0], bytes[1]])
        } else {
            u16::from_le_bytes([bytes[0], bytes[1]])
        })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.data.get(offset..offset + 4)?;
        Some(if self.big_endian {
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        } else {
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        })
    }

    fn ifd0_offset(&self) -> Option<usize> {
        self.u32(4).map(|o| o as usize)
    }

    /// Parse the entries of one IFD
    fn entries(&self, ifd_offset: usize) -> Vec<IfdEntry> {
        let mut entries = Vec::new();
        let count = match self.u16(ifd_offset) {
            Some(c) => c as usize,
            None => return entries,
        };
        for i in 0..count {
            let entry_offset = ifd_offset + 2 + i * 12;
            let (Some(tag), Some(field_type), Some(value_count)) = (
                self.u16(entry_offset),
                self.u16(entry_offset + 2),
                self.u32(entry_offset + 4),
            ) else {
                break;
            };
            let type_size: u32 = match field_type {
                TYPE_SHORT => 2,
                TYPE_LONG | 11 => 4,
                TYPE_RATIONAL | 10 | 12 => 8,
                _ => 1,
            };
            // values wider than 4 bytes live elsewhere in the stream
            let value_offset = if type_size.saturating_mul(value_count) <= 4 {
                entry_offset + 8
            } else {
                match self.u32(entry_offset + 8) {
                    Some(o) => o as usize,
                    None => continue,
                }
            };
            entries.push(IfdEntry {
                tag,
                field_type,
                count: value_count,
                value_offset,
            });
        }
        entries
    }

    fn ascii(&self, entry: &IfdEntry) -> Option<String> {
        if entry.field_type != TYPE_ASCII {
            return None;
        }
        let bytes = self
            .data
            .get(entry.value_offset..entry.value_offset + entry.count as usize)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = String::from_utf8_lossy(&bytes[..end]).trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn uint(&self, entry: &IfdEntry) -> Option<u32> {
        match entry.field_type {
            TYPE_SHORT => self.u16(entry.value_offset).map(u32::from),
            TYPE_LONG => self.u32(entry.value_offset),
            _ => None,
        }
    }

    /// Read the `index`th unsigned rational of an entry as (numerator, denominator)
    fn rational(&self, entry: &IfdEntry, index: u32) -> Option<(u32, u32)> {
        if entry.field_type != TYPE_RATIONAL || index >= entry.count {
            return None;
        }
        let offset = entry.value_offset + (index as usize) * 8;
        Some((self.u32(offset)?, self.u32(offset + 4)?))
    }

    fn rational_f64(&self, entry: &IfdEntry, index: u32) -> Option<f64> {
        let (num, den) = self.rational(entry, index)?;
        if den == 0 {
            return None;
        }
        Some(num as f64 / den as f64)
    }
}

/// Walk IFD0 and its EXIF/GPS sub-directories, filling in `meta`
fn parse_tiff(tiff: &[u8], meta: &mut ImageMetadata) {
    let Some(reader) = TiffReader::new(tiff) else {
        trace!("APP1 payload is not a TIFF stream");
        return;
    };
    let Some(ifd0) = reader.ifd0_offset() else {
        return;
    };

    let mut exif_ifd = None;
    let mut gps_ifd = None;

    for entry in reader.entries(ifd0) {
        match entry.tag {
            0x0100 => meta.width = reader.uint(&entry).or(meta.width),
            0x0101 => meta.height = reader.uint(&entry).or(meta.height),
            0x010F => meta.make = reader.ascii(&entry),
            0x0110 => meta.model = reader.ascii(&entry),
            0x0112 => {
                meta.orientation = reader.uint(&entry).map(describe_orientation);
            }
            0x0131 => meta.software = reader.ascii(&entry),
            0x0132 => meta.date_time = reader.ascii(&entry),
            0x8769 => exif_ifd = reader.u32(entry.value_offset).map(|o| o as usize),
            0x8825 => gps_ifd = reader.u32(entry.value_offset).map(|o| o as usize),
            _ => {}
        }
    }

    if let Some(offset) = exif_ifd {
        parse_exif_ifd(&reader, offset, meta);
    }
    if let Some(offset) = gps_ifd {
        parse_gps_ifd(&reader, offset, meta);
    }
}

fn parse_exif_ifd(reader: &TiffReader<'_>, offset: usize, meta: &mut ImageMetadata) {
    for entry in reader.entries(offset) {
        match entry.tag {
            // ExposureTime, kept in the photographic "1/N" form
            0x829A => {
                meta.exposure_time = reader
                    .rational(&entry, 0)
                    .filter(|(_, den)| *den != 0)
                    .map(|(num, den)| format!("{}/{}", num, den));
            }
            0x829D => meta.f_number = reader.rational_f64(&entry, 0),
            0x8827 => meta.iso = reader.uint(&entry),
            0x9003 => meta.date_time_original = reader.ascii(&entry),
            0x920A => meta.focal_length_mm = reader.rational_f64(&entry, 0),
            0xA002 => meta.width = reader.uint(&entry).or(meta.width),
            0xA003 => meta.height = reader.uint(&entry).or(meta.height),
            _ => {}
        }
    }
}

fn parse_gps_ifd(reader: &TiffReader<'_>, offset: usize, meta: &mut ImageMetadata) {
    let mut lat_ref = None;
    let mut lat = None;
    let mut lon_ref = None;
    let mut lon = None;
    let mut alt_below_sea = false;
    let mut alt = None;

    for entry in reader.entries(offset) {
        match entry.tag {
            0x0001 => lat_ref = reader.ascii(&entry),
            0x0002 => lat = read_dms(reader, &entry),
            0x0003 => lon_ref = reader.ascii(&entry),
            0x0004 => lon = read_dms(reader, &entry),
            0x0005 => {
                // GPSAltitudeRef: 1 = below sea level
                alt_below_sea = reader.data.get(entry.value_offset) == Some(&1);
            }
            0x0006 => alt = reader.rational_f64(&entry, 0),
            _ => {}
        }
    }

    if let (Some(dms), Some(r)) = (lat, lat_ref.as_deref()) {
        meta.gps_latitude = Some(dms_to_decimal(dms.0, dms.1, dms.2, r));
    }
    if let (Some(dms), Some(r)) = (lon, lon_ref.as_deref()) {
        meta.gps_longitude = Some(dms_to_decimal(dms.0, dms.1, dms.2, r));
    }
    if let Some(a) = alt {
        meta.gps_altitude_m = Some(if alt_below_sea { -a } else { a });
    }
}

fn read_dms(reader: &TiffReader<'_>, entry: &IfdEntry) -> Option<(f64, f64, f64)> {
    Some((
        reader.rational_f64(entry, 0)?,
        reader.rational_f64(entry, 1)?,
        reader.rational_f64(entry, 2)?,
    ))
}

/// Convert degrees/minutes/seconds plus hemisphere reference to signed
/// decimal degrees
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: &str) -> f64 {
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    match reference.trim() {
        "S" | "W" => -decimal,
        _ => decimal,
    }
}

fn describe_orientation(value: u32) -> String {
    match value {
        1 => "Horizontal (normal)".to_string(),
        2 => "Mirror horizontal".to_string(),
        3 => "Rotate 180".to_string(),
        4 => "Mirror vertical".to_string(),
        5 => "Mirror horizontal and rotate 270 CW".to_string(),
        6 => "Rotate 90 CW".to_string(),
        7 => "Mirror horizontal and rotate 90 CW".to_string(),
        8 => "Rotate 270 CW".to_string(),
        other => format!("Unknown ({})", other),
    }
}

// =============================================================================
// Tests
// =============================================================================
