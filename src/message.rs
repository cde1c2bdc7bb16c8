//! The parse session and its accessor API.
//!
//! [`MailMessage`] is two-phase: create it, hand it a byte source with one
//! of the `parse_*` methods, then query parts lazily. Every accessor before
//! a successful parse fails with [`MimeError::NotParsed`]. Accessors read
//! only the byte ranges they need; bodies are never cached.

use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::error::{MimeError, Result};
use crate::index::PartIndex;
use crate::model::headers::HeaderList;
use crate::model::part::{PartId, PartRecord};
use crate::parser::structure;
use crate::source::{ByteSource, FileSource, MemorySource};

/// Preferred main-body flavor for [`MailMessage::identify_main_body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `text/plain`
    Text,
    /// `text/html`
    Html,
}

impl BodyKind {
    fn target(self) -> &'static str {
        match self {
            BodyKind::Text => "text/plain",
            BodyKind::Html => "text/html",
        }
    }
}

/// State available once a message has been parsed.
struct ParsedState {
    source: Box<dyn ByteSource>,
    index: PartIndex,
    /// Memoized id of the main body part, filled on first discovery.
    main_body: Option<PartId>,
}

/// A parsed (or not-yet-parsed) mail message.
///
/// Owns the byte source and the part index; the source's backing resource
/// (buffer, mapping, temp file) is released when the message is dropped.
#[derive(Default)]
pub struct MailMessage {
    state: Option<ParsedState>,
}

impl MailMessage {
    /// Create an unparsed message session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a message from any byte source and build the part index.
    ///
    /// Replaces the result of any previous parse on this session.
    pub fn parse_source(&mut self, source: Box<dyn ByteSource>) -> Result<()> {
        let index = structure::parse_structure(source.as_ref())?;
        debug!(parts = index.len(), len = source.len(), "Parsed message");
        self.state = Some(ParsedState {
            source,
            index,
            main_body: None,
        });
        Ok(())
    }

    /// Parse a message held in memory.
    pub fn parse_bytes(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.parse_source(Box::new(MemorySource::new(data)))
    }

    /// Parse a message file, memory-mapping it.
    pub fn parse_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.parse_source(Box::new(FileSource::open(path)?))
    }

    /// Parse a message from a stream, caching it to an anonymous temp file
    /// first. The temp file is removed when the session is dropped.
    pub fn parse_reader(&mut self, reader: impl Read) -> Result<()> {
        self.parse_source(Box::new(FileSource::from_reader(reader)?))
    }

    fn state(&self) -> Result<&ParsedState> {
        self.state.as_ref().ok_or(MimeError::NotParsed)
    }

    /// All part ids in traversal (pre-order document) order.
    pub fn part_ids(&self) -> Result<Vec<PartId>> {
        Ok(self.state()?.index.ids().cloned().collect())
    }

    /// Number of parts in the message.
    pub fn part_count(&self) -> Result<usize> {
        Ok(self.state()?.index.len())
    }

    /// Part id at a linear position in traversal order.
    pub fn part_id_at(&self, index: usize) -> Result<Option<PartId>> {
        Ok(self.state()?.index.get_at(index).map(|r| r.id.clone()))
    }

    /// All part records in traversal order.
    pub fn parts(&self) -> Result<impl Iterator<Item = &PartRecord>> {
        Ok(self.state()?.index.iter())
    }

    /// Record for one part.
    pub fn part(&self, id: &PartId) -> Result<&PartRecord> {
        self.state()?.index.require(id)
    }

    /// Parsed headers of one part.
    pub fn headers(&self, id: &PartId) -> Result<&HeaderList> {
        Ok(&self.part(id)?.headers)
    }

    /// First header value matching `name` case-insensitively, if any.
    pub fn header(&self, id: &PartId, name: &str) -> Result<Option<String>> {
        Ok(self.part(id)?.headers.get(name).map(String::from))
    }

    /// Raw bytes of the whole part, headers included:
    /// `[part_start, part_end)`.
    pub fn raw_part(&self, id: &PartId) -> Result<Vec<u8>> {
        let state = self.state()?;
        let record = state.index.require(id)?;
        debug!(part = %id, start = record.part_start, end = record.part_end, "Reading raw part");
        state.source.read_range(record.part_start, record.part_end)
    }

    /// Raw header bytes of a part: `[part_start, body_start)`.
    pub fn raw_headers(&self, id: &PartId) -> Result<Vec<u8>> {
        let state = self.state()?;
        let record = state.index.require(id)?;
        state.source.read_range(record.part_start, record.body_start)
    }

    /// Raw, still-encoded body bytes of a part: `[body_start, body_end)`.
    pub fn raw_body(&self, id: &PartId) -> Result<Vec<u8>> {
        let state = self.state()?;
        let record = state.index.require(id)?;
        state.source.read_range(record.body_start, record.body_end)
    }

    /// Find the first leaf with exactly the requested content type
    /// (`text/plain` for [`BodyKind::Text`], `text/html` for
    /// [`BodyKind::Html`]), scanning in traversal order and skipping
    /// `multipart/*` containers.
    ///
    /// A hit is memoized as the session's main body part.
    pub fn identify_main_body(&mut self, kind: BodyKind) -> Result<Option<PartId>> {
        let state = self.state.as_mut().ok_or(MimeError::NotParsed)?;
        let target = kind.target();
        let found = state
            .index
            .iter()
            .find(|record| !record.is_multipart() && record.content_type.essence() == target)
            .map(|record| record.id.clone());
        if let Some(id) = &found {
            state.main_body = Some(id.clone());
        }
        Ok(found)
    }

    /// Decoded body of the main part: the first `text/plain` leaf, falling
    /// back to the first `text/html` leaf.
    ///
    /// Fails with [`MimeError::NoBodyFound`] when the message has neither.
    pub fn body(&mut self) -> Result<Vec<u8>> {
        let cached = self.state()?.main_body.clone();
        let id = match cached {
            Some(id) => id,
            None => {
                let found = match self.identify_main_body(BodyKind::Text)? {
                    Some(id) => Some(id),
                    None => self.identify_main_body(BodyKind::Html)?,
                };
                found.ok_or(MimeError::NoBodyFound)?
            }
        };
        self.body_of(&id)
    }

    /// Decoded body of a specific part.
    ///
    /// Only base64 is decoded; every other transfer encoding, including
    /// quoted-printable, is returned as the raw body bytes. Use
    /// [`MailMessage::raw_body`] for the untouched bytes.
    pub fn body_of(&self, id: &PartId) -> Result<Vec<u8>> {
        let record = self.part(id)?;
        let encoding = record.transfer_encoding.clone();
        let raw = self.raw_body(id)?;
        if encoding != "base64" {
            return Ok(raw);
        }
        let cleaned: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        match STANDARD.decode(&cleaned) {
            Ok(decoded) => Ok(decoded),
            Err(e) => {
                warn!(part = %id, error = %e, "Invalid base64 body, returning raw bytes");
                Ok(raw)
            }
        }
    }

    /// Parts classified as attachments, in traversal order.
    ///
    /// A part qualifies when its disposition is `attachment` or `inline`.
    /// With `include_inline == false`, any qualifying part that also carries
    /// a `Content-Id` is dropped: a disposition-inline part referenced by
    /// `Content-Id` is an embedded resource (an image in HTML), not a
    /// user-facing attachment.
    pub fn attachments(&self, include_inline: bool) -> Result<Vec<PartId>> {
        let state = self.state()?;
        Ok(state
            .index
            .iter()
            .filter(|record| {
                matches!(record.disposition_kind(), Some("attachment") | Some("inline"))
            })
            .filter(|record| include_inline || record.content_id.is_none())
            .map(|record| record.id.clone())
            .collect())
    }
}
