//! Magic-number signature checks and content sniffing
//!
//! Two independent pieces of evidence come out of the header bytes:
//!
//! 1. A signature verdict: does the content start with the bytes the
//!    declared MIME type promises? Declared types are user controlled and
//!    may be wrong, so a mismatch is flagged rather than trusted away.
//! 2. A sniffed content category, derived from the bytes alone, used to
//!    route metadata extraction regardless of what the uploader claimed.

use serde::{Deserialize, Serialize};

/// Bytes of header needed for reliable signature and sniff decisions
pub const HEADER_LEN: usize = 16;

// =============================================================================
// Signature Verdict
// =============================================================================

/// Why a signature check came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictReason {
    /// No signature entry exists for the declared type: inconclusive,
    /// never to be conflated with "verified"
    NoKnownSignature,
    /// Leading bytes match the declared type's signature exactly
    Matched,
    /// Leading bytes differ from the declared type's signature
    Mismatched,
}

/// Outcome of comparing content against the declared type's signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVerdict {
    pub matched: bool,
    pub reason: VerdictReason,
}

impl SignatureVerdict {
    fn new(reason: VerdictReason) -> Self {
        Self {
            matched: reason == VerdictReason::Matched,
            reason,
        }
    }
}

// =============================================================================
// Signature Table
// =============================================================================

/// Known signatures, keyed by declared MIME type
///
/// Each signature is a set of (offset, bytes) runs that must all hold.
/// Container formats need more than the leading bytes: RIFF files carry
/// their form type at offset 8, ISO-BMFF files carry `ftyp` at offset 4.
const SIGNATURES: &[(&str, &[(usize, &[u8])])] = &[
    ("image/jpeg", &[(0, &[0xFF, 0xD8, 0xFF])]),
    ("image/png", &[(0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])]),
    ("image/gif", &[(0, b"GIF8")]),
    ("image/bmp", &[(0, b"BM")]),
    ("image/tiff", &[(0, &[0x49, 0x49, 0x2A, 0x00])]),
    ("image/webp", &[(0, b"RIFF"), (8, b"WEBP")]),
    ("application/pdf", &[(0, b"%PDF")]),
    ("application/zip", &[(0, &[0x50, 0x4B, 0x03, 0x04])]),
    ("application/gzip", &[(0, &[0x1F, 0x8B])]),
    ("audio/mpeg", &[(0, b"ID3")]),
    ("audio/wav", &[(0, b"RIFF"), (8, b"WAVE")]),
    ("audio/flac", &[(0, b"fLaC")]),
    ("audio/ogg", &[(0, b"OggS")]),
    ("video/mp4", &[(4, b"ftyp")]),
    ("video/avi", &[(0, b"RIFF"), (8, b"AVI ")]),
    ("video/x-matroska", &[(0, &[0x1A, 0x45, 0xDF, 0xA3])]),
];

/// Compare a file's leading bytes against the declared type's signature
///
/// Every run of the signature must compare byte-for-byte at its offset; no
/// partial-credit scoring. An unlisted declared type is `NoKnownSignature`
/// regardless of content.
pub fn inspect(prefix: &[u8], declared_type: &str) -> SignatureVerdict {
    let declared = declared_type.trim().to_lowercase();
    let expected = match SIGNATURES.iter().find(|(mime, _)| *mime == declared) {
        Some((_, sig)) => *sig,
        None => return SignatureVerdict::new(VerdictReason::NoKnownSignature),
    };

    let all_match = expected.iter().all(|(offset, bytes)| {
        prefix
            .get(*offset..*offset + bytes.len())
            .map_or(false, |slice| slice == *bytes)
    });
    if all_match {
        SignatureVerdict::new(VerdictReason::Matched)
    } else {
        SignatureVerdict::new(VerdictReason::Mismatched)
    }
}

// =============================================================================
// Content Sniffing
// =============================================================================

/// Content categories the metadata dispatcher routes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileCategory {
    Image,
    Document,
    Audio,
    Video,
    Unknown,
}

/// Determine the actual content category from header bytes
///
/// Independent of the declared type; spoofed extensions and MIME claims do
/// not reach this decision.
pub fn sniff_category(header: &[u8]) -> FileCategory {
    match sniff_mime(header) {
        Some(mime) if mime.starts_with("image/") => FileCategory::Image,
        Some(mime) if mime.starts_with("audio/") => FileCategory::Audio,
        Some(mime) if mime.starts_with("video/") => FileCategory::Video,
        Some("application/pdf") | Some("application/rtf") | Some("application/x-ole-storage") => {
            FileCategory::Document
        }
        _ => FileCategory::Unknown,
    }
}

/// Detect a MIME type from header bytes
///
/// Returns None if the header matches no known signature. Ordering matters:
/// RIFF containers share a prefix and are told apart by their form type.
pub fn sniff_mime(header: &[u8]) -> Option<&'static str> {
    if header.is_empty() {
        return None;
    }

    // Images
    if header.len() >= 3 && header[..3] == [0xFF, 0xD8, 0xFF] {
        return Some("image/jpeg");
    }
    if header.len() >= 8 && header[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("image/png");
    }
    if header.len() >= 6 && (header[..6] == *b"GIF87a" || header[..6] == *b"GIF89a") {
        return Some("image/gif");
    }
    if header.len() >= 12 && header[..4] == *b"RIFF" && header[8..12] == *b"WEBP" {
        return Some("image/webp");
    }
    if header.len() >= 4
        && (header[..4] == [0x49, 0x49, 0x2A, 0x00] || header[..4] == [0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some("image/tiff");
    }
    if header.len() >= 2 && header[..2] == *b"BM" {
        return Some("image/bmp");
    }

    // Documents
    if header.len() >= 4 && header[..4] == *b"%PDF" {
        return Some("application/pdf");
    }
    if header.len() >= 5 && header[..5] == *b"{\\rtf" {
        return Some("application/rtf");
    }
    if header.len() >= 8 && header[..8] == [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1] {
        return Some("application/x-ole-storage");
    }

    // Audio (RIFF/WAVE before the generic RIFF checks below)
    if header.len() >= 12 && header[..4] == *b"RIFF" && header[8..12] == *b"WAVE" {
        return Some("audio/wav");
    }
    if header.len() >= 3 && header[..3] == *b"ID3" {
        return Some("audio/mpeg");
    }
    if header.len() >= 4 && header[..4] == *b"fLaC" {
        return Some("audio/flac");
    }
    if header.len() >= 4 && header[..4] == *b"OggS" {
        return Some("audio/ogg");
    }

    // Video
    if header.len() >= 12 && header[4..8] == *b"ftyp" {
        let brand = &header[8..12];
        if brand == b"qt  " {
            return Some("video/quicktime");
        }
        if brand == b"heic" || brand == b"heix" || brand == b"mif1" {
            return Some("image/heic");
        }
        return Some("video/mp4");
    }
    if header.len() >= 12 && header[..4] == *b"RIFF" && header[8..12] == *b"AVI " {
        return Some("video/avi");
    }
    if header.len() >= 4 && header[..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return Some("video/x-matroska");
    }
    if header.len() >= 3 && header[..3] == *b"FLV" {
        return Some("video/x-flv");
    }

    None
}

// =============================================================================
// Tests
// =============================================================================
