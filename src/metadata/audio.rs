//! Audio metadata extraction (ID3/MP3, WAV, FLAC, OGG)
//!
//! ID3v2 text frames carry the usual title/artist/album tags; WAV and FLAC
//! expose sample format in their fixed headers. Parsing stays inside the
//! prefix window and omits anything it cannot read.

use serde::{Deserialize, Serialize};

use super::{u16_le, u32_be, u32_le};

/// Attributes extracted from an audio file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Container/codec name, e.g. "MP3 (ID3v2.3)"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// Extract audio attributes from the leading bytes of a file
pub fn extract(window: &[u8]) -> AudioMetadata {
    let mut meta = AudioMetadata::default();

    if window.len() >= 10 && window[..3] == *b"ID3" {
        extract_id3v2(window, &mut meta);
    } else if window.len() >= 12 && window[..4] == *b"RIFF" && window[8..12] == *b"WAVE" {
        extract_wav(window, &mut meta);
    } else if window.len() >= 4 && window[..4] == *b"fLaC" {
        extract_flac(window, &mut meta);
    } else if window.len() >= 4 && window[..4] == *b"OggS" {
        meta.format = Some("OGG".to_string());
    }

    meta
}

// =============================================================================
// ID3v2 (MP3)
// =============================================================================

fn extract_id3v2(data: &[u8], meta: &mut AudioMetadata) {
    let major = data[3];
    meta.format = Some(format!("MP3 (ID3v2.{})", major));

    // tag size is syncsafe: 4x 7-bit bytes
    let tag_size = syncsafe_u32(&data[6..10]) as usize;
    let tag_end = (10 + tag_size).min(data.len());

    // ID3v2.2 uses 3-byte frame ids and sizes; not worth supporting here
    if major < 3 {
        return;
    }

    let mut pos = 10;
    while pos + 10 <= tag_end {
        let id = &data[pos..pos + 4];
        if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            break; // padding reached
        }
        let raw_size = match u32_be(data, pos + 4) {
            Some(s) => s,
            None => break,
        };
        let frame_size = if major >= 4 {
            syncsafe_u32(&data[pos + 4..pos + 8]) as usize
        } else {
            raw_size as usize
        };
        let body = match data.get(pos + 10..pos + 10 + frame_size) {
            Some(b) => b,
            None => break,
        };

        match id {
            b"TIT2" => meta.title = text_frame(body),
            b"TPE1" => meta.artist = text_frame(body),
            b"TALB" => meta.album = text_frame(body),
            b"TYER" | b"TDRC" => meta.year = text_frame(body),
            _ => {}
        }
        pos += 10 + frame_size;
    }
}

fn syncsafe_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, b| (acc << 7) | u32::from(b & 0x7F))
}

/// Decode an ID3 text frame: one encoding byte then the string
fn text_frame(body: &[u8]) -> Option<String> {
    let (&encoding, rest) = body.split_first()?;
    let text = match encoding {
        // UTF-16 with BOM
        1 => {
            let bytes = rest.strip_prefix(&[0xFF, 0xFE]).unwrap_or(rest);
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        // Latin-1 and UTF-8 both pass through lossy decoding well enough
        _ => String::from_utf8_lossy(rest).to_string(),
    };
    let text = text.trim_end_matches('\0').trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// =============================================================================
// WAV
// =============================================================================

fn extract_wav(data: &[u8], meta: &mut AudioMetadata) {
    meta.format = Some("WAV".to_string());

    // chunk walk after RIFF header: id(4) size(4) payload
    let mut pos = 12;
    let mut byte_rate = None;
    let mut data_len = None;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = match u32_le(data, pos + 4) {
            Some(s) => s as usize,
            None => break,
        };
        if id == b"fmt " && pos + 8 + 16 <= data.len() {
            meta.channels = u16_le(data, pos + 10);
            meta.sample_rate_hz = u32_le(data, pos + 12);
            byte_rate = u32_le(data, pos + 16);
            meta.bits_per_sample = u16_le(data, pos + 22);
        } else if id == b"data" {
            data_len = Some(size as u64);
        }
        // chunks are word-aligned
        pos += 8 + size + (size & 1);
    }

    if let (Some(rate), Some(len)) = (byte_rate, data_len) {
        if rate > 0 {
            meta.duration_seconds = Some(len as f64 / rate as f64);
        }
    }
}

// =============================================================================
// FLAC
// =============================================================================

fn extract_flac(data: &[u8], meta: &mut AudioMetadata) {
    meta.format = Some("FLAC".to_string());

    // first metadata block header at 4; STREAMINFO is mandatory and first
    let block_type = match data.get(4) {
        Some(b) => b & 0x7F,
        None => return,
    };
    if block_type != 0 {
        return;
    }
    let info = match data.get(8..42) {
        Some(i) => i,
        None => return,
    };

    // sample rate: 20 bits starting at STREAMINFO byte 10
    let sample_rate = (u32::from(info[10]) << 12) | (u32::from(info[11]) << 4) | (u32::from(info[12]) >> 4);
    let channels = ((info[12] >> 1) & 0x07) + 1;
    let bits = (((info[12] & 0x01) << 4) | (info[13] >> 4)) + 1;
    let total_samples = (u64::from(info[13] & 0x0F) << 32)
        | (u64::from(info[14]) << 24)
        | (u64::from(info[15]) << 16)
        | (u64::from(info[16]) << 8)
        | u64::from(info[17]);

    if sample_rate > 0 {
        meta.sample_rate_hz = Some(sample_rate);
        if total_samples > 0 {
            meta.duration_seconds = Some(total_samples as f64 / sample_rate as f64);
        }
    }
    meta.channels = Some(u16::from(channels));
    meta.bits_per_sample = Some(u16::from(bits));
}
