//! MIME structure parsing: recursive multipart boundary scanning with exact
//! byte-offset bookkeeping.
//!
//! Walks the message through bounded chunk reads, never holding more than
//! one chunk of body bytes at a time. Tolerant of truncated and slightly
//! non-conformant messages: structural anomalies degrade locally, only an
//! unparseable header block aborts the parse.

use tracing::warn;

use crate::error::{MimeError, Result};
use crate::index::PartIndex;
use crate::model::part::{PartId, PartRecord};
use crate::parser::header;
use crate::source::ByteSource;

/// Size of one scan chunk read from the byte source.
const CHUNK_SIZE: u64 = 64 * 1024;

/// Maximum nesting depth for recursive multipart parsing (guards against
/// adversarial input). Parts at the cap are kept as leaves.
const MAX_DEPTH: usize = 10;

/// Parse the full message and build the part index.
///
/// The returned index is in pre-order (parent before children, document
/// order), which equals the lexicographic-by-segment order of the part ids.
pub fn parse_structure(source: &dyn ByteSource) -> Result<PartIndex> {
    let records = parse_part(source, PartId::root(), 0, source.len())?;
    Ok(PartIndex::from_records(records))
}

/// Parse one part spanning `[start, end)`; returns the part's record
/// followed by all descendant records in pre-order.
fn parse_part(source: &dyn ByteSource, id: PartId, start: u64, end: u64) -> Result<Vec<PartRecord>> {
    let body_start = find_body_start(source, start, end)?;
    let headers = header::parse_header_block(&source.read_range(start, body_start)?, start)?;

    let content_type = header::content_type_of(&headers);
    let transfer_encoding = header::transfer_encoding_of(&headers);
    let disposition = header::disposition_of(&headers);
    let content_id = header::content_id_of(&headers);

    let mut record = PartRecord {
        id: id.clone(),
        content_type,
        transfer_encoding,
        disposition,
        content_id,
        headers,
        part_start: start,
        part_end: end,
        body_start,
        body_end: end,
        children: Vec::new(),
    };

    if !record.is_multipart() {
        return Ok(vec![record]);
    }

    if id.depth() >= MAX_DEPTH {
        warn!(part = %id, "Multipart nesting too deep, keeping as leaf");
        return Ok(vec![record]);
    }

    match scan_multipart(source, &record, body_start, end) {
        Ok(scan) => {
            record.body_end = scan.body_end;
            let mut records = vec![record];
            for (i, (child_start, child_end)) in scan.child_spans.iter().enumerate() {
                let child_id = id.child(i as u32 + 1);
                records[0].children.push(child_id.clone());
                let child = parse_part(source, child_id, *child_start, *child_end)?;
                records.extend(child);
            }
            Ok(records)
        }
        Err(MimeError::MissingBoundary { id }) => {
            // Surface the container as an unparsed leaf rather than failing
            // the whole message.
            warn!(part = %id, "Multipart part without boundary parameter, keeping as leaf");
            Ok(vec![record])
        }
        Err(e) => Err(e),
    }
}

/// Find the offset of the first body byte: immediately after the blank line
/// terminating the header block. A part without a separator is headers-only
/// and gets `body_start == end`.
fn find_body_start(source: &dyn ByteSource, start: u64, end: u64) -> Result<u64> {
    let mut scanner = LineScanner::new(source, start, end);
    while let Some(line) = scanner.next_line()? {
        if line.is_blank() {
            return Ok(line.start + line.total_len());
        }
    }
    Ok(end)
}

/// Result of scanning one multipart body for delimiter lines.
struct MultipartScan {
    /// `[part_start, part_end)` spans of the children, in document order.
    child_spans: Vec<(u64, u64)>,
    /// Offset of the closing delimiter line, or the end of the range when
    /// the message is truncated.
    body_end: u64,
}

/// Scan `[body_start, end)` for `--boundary` / `--boundary--` lines.
///
/// Delimiters are matched at line starts only, so boundary-looking text
/// inside child bodies cannot split a part. Content before the first
/// delimiter (preamble) and after the closing delimiter (postamble) belongs
/// to no child.
fn scan_multipart(
    source: &dyn ByteSource,
    record: &PartRecord,
    body_start: u64,
    end: u64,
) -> Result<MultipartScan> {
    let boundary = record
        .content_type
        .boundary()
        .ok_or_else(|| MimeError::MissingBoundary {
            id: record.id.to_string(),
        })?;
    let delimiter = format!("--{boundary}").into_bytes();

    let mut child_spans: Vec<(u64, u64)> = Vec::new();
    let mut open_child: Option<u64> = None;
    // End of the previous line excluding its terminator; the terminator
    // preceding a delimiter line belongs to the delimiter, not the child.
    let mut prev_content_end = body_start;

    let mut scanner = LineScanner::new(source, body_start, end);
    while let Some(line) = scanner.next_line()? {
        match classify_line(&line.content, &delimiter) {
            LineKind::Delimiter => {
                if let Some(child_start) = open_child {
                    child_spans.push((child_start, prev_content_end.max(child_start)));
                }
                open_child = Some(line.start + line.total_len());
            }
            LineKind::ClosingDelimiter => {
                if let Some(child_start) = open_child {
                    child_spans.push((child_start, prev_content_end.max(child_start)));
                }
                return Ok(MultipartScan {
                    child_spans,
                    body_end: line.start,
                });
            }
            LineKind::Content => {}
        }
        prev_content_end = line.start + line.content.len() as u64;
    }

    // No closing delimiter: tolerate the truncation and hand the remainder
    // to the last child.
    if let Some(child_start) = open_child {
        warn!(part = %record.id, "Multipart body without closing delimiter");
        child_spans.push((child_start, end));
    }
    Ok(MultipartScan {
        child_spans,
        body_end: end,
    })
}

enum LineKind {
    Content,
    Delimiter,
    ClosingDelimiter,
}

/// Classify a line against the delimiter, tolerating trailing transport
/// padding (spaces/tabs) after the delimiter.
fn classify_line(content: &[u8], delimiter: &[u8]) -> LineKind {
    let trimmed = trim_trailing_ws(content);
    if trimmed.len() == delimiter.len() + 2
        && trimmed.starts_with(delimiter)
        && trimmed.ends_with(b"--")
    {
        LineKind::ClosingDelimiter
    } else if trimmed == delimiter {
        LineKind::Delimiter
    } else {
        LineKind::Content
    }
}

fn trim_trailing_ws(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b' ' || line[end - 1] == b'\t') {
        end -= 1;
    }
    &line[..end]
}

/// One physical line yielded by [`LineScanner`].
struct Line {
    /// Absolute offset of the first byte of the line.
    start: u64,
    /// Line bytes without the terminator.
    content: Vec<u8>,
    /// 0 at EOF, 1 for `\n`, 2 for `\r\n`.
    terminator_len: usize,
}

impl Line {
    fn total_len(&self) -> u64 {
        (self.content.len() + self.terminator_len) as u64
    }

    fn is_blank(&self) -> bool {
        self.content
            .iter()
            .all(|&b| b == b' ' || b == b'\t' || b == b'\r')
    }
}

/// Line-by-line walker over a byte range, reading the source in bounded
/// chunks so the message is never materialized whole.
struct LineScanner<'a> {
    source: &'a dyn ByteSource,
    end: u64,
    /// Absolute offset of the next unread byte.
    pos: u64,
    buf: Vec<u8>,
    buf_pos: usize,
}

impl<'a> LineScanner<'a> {
    fn new(source: &'a dyn ByteSource, start: u64, end: u64) -> Self {
        Self {
            source,
            end,
            pos: start,
            buf: Vec::new(),
            buf_pos: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<Line>> {
        if self.buf_pos >= self.buf.len() && self.pos >= self.end {
            return Ok(None);
        }

        let start = self.pos;
        let mut bytes: Vec<u8> = Vec::new();
        let mut saw_newline = false;

        loop {
            if self.buf_pos >= self.buf.len() && !self.refill()? {
                break;
            }
            let chunk = &self.buf[self.buf_pos..];
            match chunk.iter().position(|&b| b == b'\n') {
                Some(p) => {
                    bytes.extend_from_slice(&chunk[..=p]);
                    self.buf_pos += p + 1;
                    self.pos += (p + 1) as u64;
                    saw_newline = true;
                    break;
                }
                None => {
                    bytes.extend_from_slice(chunk);
                    self.pos += chunk.len() as u64;
                    self.buf_pos = self.buf.len();
                }
            }
        }

        let terminator_len = if saw_newline {
            if bytes.ends_with(b"\r\n") {
                2
            } else {
                1
            }
        } else {
            0
        };
        bytes.truncate(bytes.len() - terminator_len);

        Ok(Some(Line {
            start,
            content: bytes,
            terminator_len,
        }))
    }

    fn refill(&mut self) -> Result<bool> {
        if self.pos >= self.end {
            return Ok(false);
        }
        let chunk_end = (self.pos + CHUNK_SIZE).min(self.end);
        self.buf = self.source.read_range(self.pos, chunk_end)?;
        self.buf_pos = 0;
        Ok(!self.buf.is_empty())
    }
}
