//! Type-specific metadata extraction
//!
//! The dispatcher sniffs the actual content category from magic bytes and
//! routes to the matching extractor. The sniffed category takes precedence
//! over the declared type: declared types are user controlled and lying
//! about them is exactly what this subsystem is meant to expose.
//!
//! Extraction is strictly best-effort. A field that fails to parse is
//! omitted; an extractor that finds nothing usable yields an empty
//! attribute set. Nothing in here can fail the surrounding analysis.

pub mod audio;
pub mod document;
pub mod image;
pub mod video;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunk::ChunkSource;
use crate::magic::{self, FileCategory, HEADER_LEN};

pub use audio::AudioMetadata;
pub use document::DocumentMetadata;
pub use image::ImageMetadata;
pub use video::VideoMetadata;

/// Bounded window of leading bytes handed to the extractors
///
/// EXIF, container headers and PDF info dictionaries live near the front of
/// the file; capping the read keeps memory independent of file size.
pub const METADATA_WINDOW: usize = 256 * 1024;

/// Structured attributes extracted from one file, tagged by category
///
/// Absent fields are omitted from serialized output, never null-filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum FileMetadata {
    Image(ImageMetadata),
    Document(DocumentMetadata),
    Audio(AudioMetadata),
    Video(VideoMetadata),
    Unknown,
}

impl FileMetadata {
    /// True when extraction produced no attributes at all
    pub fn is_empty(&self) -> bool {
        match self {
            FileMetadata::Image(m) => *m == ImageMetadata::default(),
            FileMetadata::Document(m) => *m == DocumentMetadata::default(),
            FileMetadata::Audio(m) => *m == AudioMetadata::default(),
            FileMetadata::Video(m) => *m == VideoMetadata::default(),
            FileMetadata::Unknown => true,
        }
    }
}

/// Extract metadata for a file, routing on the sniffed content category
///
/// The declared type is only consulted as a fallback when the header bytes
/// match no known signature. Any failure degrades to `FileMetadata::Unknown`.
pub fn extract(source: &mut dyn ChunkSource, declared_type: &str) -> FileMetadata {
    let window = match source.read_prefix(METADATA_WINDOW) {
        Ok(w) => w,
        Err(e) => {
            warn!("metadata window read failed, skipping extraction: {}", e);
            return FileMetadata::Unknown;
        }
    };

    let header = &window[..window.len().min(HEADER_LEN)];
    let mut category = magic::sniff_category(header);
    if category == FileCategory::Unknown {
        category = category_from_declared(declared_type);
    }
    debug!(?category, declared_type, "routing metadata extraction");

    match category {
        FileCategory::Image => FileMetadata::Image(image::extract(&window)),
        FileCategory::Document => FileMetadata::Document(document::extract(&window)),
        FileCategory::Audio => FileMetadata::Audio(audio::extract(&window)),
        FileCategory::Video => FileMetadata::Video(video::extract(&window)),
        FileCategory::Unknown => FileMetadata::Unknown,
    }
}

/// Fallback routing from the declared MIME type, used only when sniffing
/// found nothing
fn category_from_declared(declared_type: &str) -> FileCategory {
    let declared = declared_type.trim().to_lowercase();
    if declared.starts_with("image/") {
        FileCategory::Image
    } else if declared.starts_with("audio/") {
        FileCategory::Audio
    } else if declared.starts_with("video/") {
        FileCategory::Video
    } else if declared == "application/pdf"
        || declared.contains("document")
        || declared.contains("spreadsheet")
        || declared.contains("presentation")
    {
        FileCategory::Document
    } else {
        FileCategory::Unknown
    }
}

// =============================================================================
// Shared byte readers (big/little endian, bounds-checked)
// =============================================================================

pub(crate) fn u16_be(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn u32_be(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Find the first occurrence of `needle` in `haystack`
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
