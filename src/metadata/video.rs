//! Video metadata extraction (MP4/QuickTime, AVI, Matroska)
//!
//! MP4 brand and movie-header duration are read from the box structure; AVI
//! exposes dimensions and frame counts in its main header. Files whose
//! `moov` sits past the prefix window just yield fewer fields.

use serde::{Deserialize, Serialize};

use super::{find_bytes, u32_be, u32_le};

/// Attributes extracted from a video file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Container name, e.g. "MP4", "AVI", "Matroska"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// MP4 ftyp major brand, e.g. "isom"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// Extract video attributes from the leading bytes of a file
pub fn extract(window: &[u8]) -> VideoMetadata {
    let mut meta = VideoMetadata::default();

    if window.len() >= 12 && window[4..8] == *b"ftyp" {
        extract_mp4(window, &mut meta);
    } else if window.len() >= 12 && window[..4] == *b"RIFF" && window[8..12] == *b"AVI " {
        extract_avi(window, &mut meta);
    } else if window.len() >= 4 && window[..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        meta.format = Some("Matroska".to_string());
    }

    meta
}

// =============================================================================
// MP4 / QuickTime
// =============================================================================

fn extract_mp4(data: &[u8], meta: &mut VideoMetadata) {
    let brand = String::from_utf8_lossy(&data[8..12]).trim().to_string();
    meta.format = Some(if brand == "qt" {
        "QuickTime".to_string()
    } else {
        "MP4".to_string()
    });
    if !brand.is_empty() {
        meta.major_brand = Some(brand);
    }

    // top-level box walk looking for moov/mvhd; moov is often at the end of
    // the file, in which case duration is simply unavailable here
    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let size = match u32_be(data, pos) {
            Some(s) if s >= 8 => s as usize,
            _ => break,
        };
        let box_type = &data[pos + 4..pos + 8];
        if box_type == b"moov" {
            let end = (pos + size).min(data.len());
            parse_moov(&data[pos + 8..end], meta);
            break;
        }
        pos = match pos.checked_add(size) {
            Some(p) => p,
            None => break,
        };
    }
}

fn parse_moov(moov: &[u8], meta: &mut VideoMetadata) {
    let mvhd_pos = match find_bytes(moov, b"mvhd") {
        Some(p) => p + 4,
        None => return,
    };
    // mvhd: version(1) flags(3) then v0 = 4x u32, v1 = u64 times
    let version = match moov.get(mvhd_pos) {
        Some(v) => *v,
        None => return,
    };
    let (timescale, duration) = if version == 1 {
        let timescale = u32_be(moov, mvhd_pos + 4 + 16);
        let duration = moov
            .get(mvhd_pos + 4 + 20..mvhd_pos + 4 + 28)
            .map(|b| u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]));
        (timescale, duration)
    } else {
        let timescale = u32_be(moov, mvhd_pos + 4 + 8);
        let duration = u32_be(moov, mvhd_pos + 4 + 12).map(u64::from);
        (timescale, duration)
    };

    if let (Some(scale), Some(dur)) = (timescale, duration) {
        if scale > 0 {
            meta.duration_seconds = Some(dur as f64 / f64::from(scale));
        }
    }
}

// =============================================================================
// AVI
// =============================================================================

fn extract_avi(data: &[u8], meta: &mut VideoMetadata) {
    meta.format = Some("AVI".to_string());

    // avih (main AVI header) lives early in the hdrl LIST
    let avih_pos = match find_bytes(data, b"avih") {
        Some(p) => p,
        None => return,
    };
    let body = avih_pos + 8; // past id + size
    let us_per_frame = u32_le(data, body);
    meta.frame_count = u32_le(data, body + 16);
    meta.width = u32_le(data, body + 32);
    meta.height = u32_le(data, body + 36);

    if let (Some(us), Some(frames)) = (us_per_frame, meta.frame_count) {
        if us > 0 {
            meta.duration_seconds = Some(frames as f64 * us as f64 / 1_000_000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp4_brand_and_duration() {
        let mut mp4 = Vec::new();
        // ftyp box
        mp4.extend_from_slice(&16u32.to_be_bytes());
        mp4.extend_from_slice(b"ftypisom");
        mp4.extend_from_slice(b"\x00\x00\x02\x00");
        // moov box holding a v0 mvhd
        let mut mvhd = Vec::new();
        mvhd.extend_from_slice(&108u32.to_be_bytes());
        mvhd.extend_from_slice(b"mvhd");
        mvhd.push(0); // version 0
        mvhd.extend_from_slice(&[0, 0, 0]); // flags
        mvhd.extend_from_slice(&0u32.to_be_bytes()); // creation
        mvhd.extend_from_slice(&0u32.to_be_bytes()); // modification
        mvhd.extend_from_slice(&600u32.to_be_bytes()); // timescale
        mvhd.extend_from_slice(&3000u32.to_be_bytes()); // duration = 5 s
        let moov_size = 8 + mvhd.len();
        mp4.extend_from_slice(&(moov_size as u32).to_be_bytes());
        mp4.extend_from_slice(b"moov");
        mp4.extend_from_slice(&mvhd);

        let meta = extract(&mp4);
        assert_eq!(meta.format.as_deref(), Some("MP4"));
        assert_eq!(meta.major_brand.as_deref(), Some("isom"));
        assert_eq!(meta.duration_seconds, Some(5.0));
    }

    #[test]
    fn test_mp4_without_moov_in_window() {
        let mut mp4 = Vec::new();
        mp4.extend_from_slice(&16u32.to_be_bytes());
        mp4.extend_from_slice(b"ftypmp42");
        mp4.extend_from_slice(b"\x00\x00\x00\x00");
        let meta = extract(&mp4);
        assert_eq!(meta.major_brand.as_deref(), Some("mp42"));
        assert!(meta.duration_seconds.is_none());
    }

    #[test]
    fn test_quicktime_brand() {
        let mut mov = Vec::new();
        mov.extend_from_slice(&16u32.to_be_bytes());
        mov.extend_from_slice(b"ftypqt  ");
        mov.extend_from_slice(b"\x00\x00\x00\x00");
        let meta = extract(&mov);
        assert_eq!(meta.format.as_deref(), Some("QuickTime"));
        assert_eq!(meta.major_brand.as_deref(), Some("qt"));
    }

    #[test]
    fn test_avi_header_fields() {
        let mut avi = b"RIFF".to_vec();
        avi.extend_from_slice(&200u32.to_le_bytes());
        avi.extend_from_slice(b"AVI LIST");
        avi.extend_from_slice(&80u32.to_le_bytes());
        avi.extend_from_slice(b"hdrl");
        avi.extend_from_slice(b"avih");
        avi.extend_from_slice(&56u32.to_le_bytes());
        let mut avih = [0u8; 56];
        avih[0..4].copy_from_slice(&33_333u32.to_le_bytes()); // ~30 fps
        avih[16..20].copy_from_slice(&900u32.to_le_bytes()); // 30 s of frames
        avih[32..36].copy_from_slice(&640u32.to_le_bytes());
        avih[36..40].copy_from_slice(&480u32.to_le_bytes());
        avi.extend_from_slice(&avih);

        let meta = extract(&avi);
        assert_eq!(meta.format.as_deref(), Some("AVI"));
        assert_eq!(meta.width, Some(640));
        assert_eq!(meta.height, Some(480));
        assert_eq!(meta.frame_count, Some(900));
        let duration = meta.duration_seconds.unwrap();
        assert!((duration - 29.9997).abs() < 1e-3);
    }

    #[test]
    fn test_matroska_format_only() {
        let meta = extract(&[0x1A, 0x45, 0xDF, 0xA3, 0x01, 0x02]);
        assert_eq!(meta.format.as_deref(), Some("Matroska"));
        assert!(meta.width.is_none());
    }

    #[test]
    fn test_garbage_is_empty() {
        assert_eq!(extract(&[0xAA, 0xBB, 0xCC, 0xDD]), VideoMetadata::default());
    }
}
