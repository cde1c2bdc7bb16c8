//! RFC 822 header block parsing: line splitting, folding, and extraction of
//! the structured MIME fields.

use encoding_rs::WINDOWS_1252;

use crate::error::{MimeError, Result};
use crate::model::content::{ContentDisposition, ContentType};
use crate::model::headers::HeaderList;

/// Parse a raw header block into an ordered header list.
///
/// `base_offset` is the absolute position of `raw` inside the message and is
/// only used for error reporting. The block may include the trailing blank
/// separator line; parsing stops at the first blank line.
///
/// Folded continuation lines (leading space or tab) are appended to the
/// previous header's value with the leading whitespace collapsed to a single
/// space. A non-continuation line without a colon is a
/// [`MimeError::MalformedHeader`].
pub fn parse_header_block(raw: &[u8], base_offset: u64) -> Result<HeaderList> {
    let text = decode_header_bytes(raw);
    let mut headers = HeaderList::new();
    let mut pos: u64 = 0;

    for line in text.split('\n') {
        let line_offset = base_offset + pos;
        pos += line.len() as u64 + 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim().is_empty() {
            // Blank separator: end of the header block.
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match headers.last_value_mut() {
                Some(value) => {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                None => {
                    return Err(MimeError::malformed(
                        line_offset,
                        "continuation line with no preceding header",
                    ));
                }
            }
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.push(name.trim(), value.trim());
            }
            _ => {
                return Err(MimeError::malformed(
                    line_offset,
                    format!("header line without a name: '{}'", truncate(line, 60)),
                ));
            }
        }
    }

    Ok(headers)
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every
/// byte). A leading BOM is stripped.
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Parsed `Content-Type`, defaulting to `text/plain` when the header is
/// absent (RFC 2045 default).
pub fn content_type_of(headers: &HeaderList) -> ContentType {
    headers
        .get("Content-Type")
        .map(ContentType::parse)
        .unwrap_or_default()
}

/// Lowercase `Content-Transfer-Encoding` token, `"7bit"` when absent.
pub fn transfer_encoding_of(headers: &HeaderList) -> String {
    headers
        .get("Content-Transfer-Encoding")
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_else(|| "7bit".to_string())
}

/// Parsed `Content-Disposition`, when the header is present.
pub fn disposition_of(headers: &HeaderList) -> Option<ContentDisposition> {
    headers.get("Content-Disposition").map(ContentDisposition::parse)
}

/// `Content-Id` value with surrounding angle brackets stripped.
pub fn content_id_of(headers: &HeaderList) -> Option<String> {
    headers
        .get("Content-Id")
        .map(strip_angle_brackets)
        .filter(|v| !v.is_empty())
}

/// Strip one surrounding `<...>` pair, e.g. `"<img1@host>"` -> `"img1@host"`.
fn strip_angle_brackets(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Clip a line for inclusion in an error message.
fn truncate(line: &str, max: usize) -> &str {
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_block() {
        let raw = b"From: alice@example.com\r\nSubject: Hi\r\n\r\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("from"), Some("alice@example.com"));
        assert_eq!(headers.get("SUBJECT"), Some("Hi"));
    }

    #[test]
    fn test_parse_folded_header() {
        let raw = b"Subject: a very\r\n\tlong subject\r\nFrom: a@b\r\n\r\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(headers.get("Subject"), Some("a very long subject"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_lf_only_line_endings() {
        let raw = b"Subject: test\nX-Flag: yes\n\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(headers.get("x-flag"), Some("yes"));
    }

    #[test]
    fn test_stops_at_blank_line() {
        let raw = b"Subject: test\r\n\r\nNot-A-Header body text\r\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_malformed_line_errors() {
        let raw = b"Subject: ok\r\nthis line has no colon\r\n\r\n";
        let err = parse_header_block(raw, 100).unwrap_err();
        match err {
            MimeError::MalformedHeader { offset, .. } => assert_eq!(offset, 113),
            other => panic!("expected MalformedHeader, got {other:?}"),
        }
    }

    #[test]
    fn test_leading_continuation_errors() {
        let raw = b"  dangling continuation\r\n\r\n";
        assert!(matches!(
            parse_header_block(raw, 0),
            Err(MimeError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_duplicate_headers_kept() {
        let raw = b"Received: one\r\nReceived: two\r\n\r\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(headers.get("Received"), Some("one"));
        assert_eq!(headers.get_all("Received").count(), 2);
    }

    #[test]
    fn test_field_extraction_defaults() {
        let headers = parse_header_block(b"Subject: x\r\n\r\n", 0).unwrap();
        assert_eq!(content_type_of(&headers).essence(), "text/plain");
        assert_eq!(transfer_encoding_of(&headers), "7bit");
        assert!(disposition_of(&headers).is_none());
        assert!(content_id_of(&headers).is_none());
    }

    #[test]
    fn test_field_extraction() {
        let raw = b"Content-Type: Image/PNG; name=\"logo.png\"\r\n\
Content-Transfer-Encoding: Base64\r\n\
Content-Disposition: inline; filename=\"logo.png\"\r\n\
Content-Id: <logo@example.com>\r\n\r\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(content_type_of(&headers).essence(), "image/png");
        assert_eq!(transfer_encoding_of(&headers), "base64");
        assert_eq!(disposition_of(&headers).unwrap().kind, "inline");
        assert_eq!(content_id_of(&headers).as_deref(), Some("logo@example.com"));
    }

    #[test]
    fn test_non_utf8_header_bytes() {
        // "caf\xe9" in Windows-1252
        let raw = b"Subject: caf\xe9\r\n\r\n";
        let headers = parse_header_block(raw, 0).unwrap();
        assert_eq!(headers.get("subject"), Some("café"));
    }
}
