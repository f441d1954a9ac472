//! Document metadata extraction (PDF)
//!
//! Pulls the version from the header and the classic Info-dictionary string
//! fields when they appear in the prefix window. PDFs with the Info
//! dictionary past the window simply yield fewer fields.

use serde::{Deserialize, Serialize};

use super::find_bytes;

/// Attributes extracted from a document file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Format version, e.g. "1.7" for PDF
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Application that produced the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    /// Application the content was created in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Raw PDF date string, e.g. "D:20230714103000Z"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

/// Extract document attributes from the leading bytes of a file
pub fn extract(window: &[u8]) -> DocumentMetadata {
    let mut meta = DocumentMetadata::default();

    if window.len() >= 4 && window[..4] == *b"%PDF" {
        extract_pdf(window, &mut meta);
    }

    meta
}

fn extract_pdf(data: &[u8], meta: &mut DocumentMetadata) {
    // header line: %PDF-1.7
    if data.len() >= 8 && data[4] == b'-' {
        let version: Vec<u8> = data[5..data.len().min(12)]
            .iter()
            .copied()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .collect();
        if !version.is_empty() {
            meta.version = Some(String::from_utf8_lossy(&version).to_string());
        }
    }

    meta.title = info_string(data, b"/Title");
    meta.author = info_string(data, b"/Author");
    meta.producer = info_string(data, b"/Producer");
    meta.creator = info_string(data, b"/Creator");
    meta.creation_date = info_string(data, b"/CreationDate");
}

/// Read the literal string value of an Info-dictionary key: `/Key (value)`
///
/// Only uncompressed literal strings are handled; hex strings and values
/// inside object streams are out of reach and the field is omitted.
fn info_string(data: &[u8], key: &[u8]) -> Option<String> {
    let key_pos = find_bytes(data, key)?;
    let rest = &data[key_pos + key.len()..];

    // skip whitespace between key and opening parenthesis
    let mut pos = 0;
    while pos < rest.len() && (rest[pos] == b' ' || rest[pos] == b'\r' || rest[pos] == b'\n') {
        pos += 1;
    }
    if rest.get(pos) != Some(&b'(') {
        return None;
    }
    pos += 1;

    let mut value = Vec::new();
    let mut depth = 1;
    while pos < rest.len() && value.len() < 1024 {
        match rest[pos] {
            b'\\' if pos + 1 < rest.len() => {
                // keep the escaped character, drop the backslash
                value.push(rest[pos + 1]);
                pos += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        value.push(rest[pos]);
        pos += 1;
    }
    if depth != 0 {
        return None;
    }

    let text = String::from_utf8_lossy(&value).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf() -> Vec<u8> {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend_from_slice(b"1 0 obj\n<< /Title (Quarterly Report) /Author (J. Doe)\n");
        pdf.extend_from_slice(b"/Producer (LibreOffice 7.4) /Creator (Writer)\n");
        pdf.extend_from_slice(b"/CreationDate (D:20230714103000Z) >>\nendobj\n");
        pdf
    }

    #[test]
    fn test_pdf_info_fields() {
        let meta = extract(&sample_pdf());
        assert_eq!(meta.version.as_deref(), Some("1.7"));
        assert_eq!(meta.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(meta.author.as_deref(), Some("J. Doe"));
        assert_eq!(meta.producer.as_deref(), Some("LibreOffice 7.4"));
        assert_eq!(meta.creator.as_deref(), Some("Writer"));
        assert_eq!(meta.creation_date.as_deref(), Some("D:20230714103000Z"));
    }

    #[test]
    fn test_pdf_escaped_parenthesis() {
        let pdf = b"%PDF-1.4\n<< /Title (Report \\(final\\)) >>".to_vec();
        let meta = extract(&pdf);
        assert_eq!(meta.title.as_deref(), Some("Report (final)"));
    }

    #[test]
    fn test_pdf_header_only() {
        let meta = extract(b"%PDF-1.4\n%binary stuff follows");
        assert_eq!(meta.version.as_deref(), Some("1.4"));
        assert!(meta.title.is_none());
        assert!(meta.author.is_none());
    }

    #[test]
    fn test_unterminated_string_omitted() {
        let pdf = b"%PDF-1.4\n<< /Title (never closed".to_vec();
        let meta = extract(&pdf);
        assert!(meta.title.is_none());
    }

    #[test]
    fn test_non_pdf_is_empty() {
        let meta = extract(b"plain text file");
        assert_eq!(meta, DocumentMetadata::default());
    }
}
