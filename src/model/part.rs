//! Part identifiers and part records.
//!
//! Only offsets and metadata are stored per part. Body bytes stay in the
//! message source and are read on demand.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MimeError;
use crate::model::content::{ContentDisposition, ContentType};
use crate::model::headers::HeaderList;

/// Hierarchical dotted part identifier.
///
/// The top-level message is `"1"`; the children of a multipart container are
/// `"<parent>.1"`, `"<parent>.2"`, ... in document order. The derived
/// ordering (lexicographic by segment) equals pre-order document order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId {
    segments: Vec<u32>,
}

impl PartId {
    /// The id of the top-level message part.
    pub fn root() -> Self {
        Self { segments: vec![1] }
    }

    /// The id of this part's `n`-th child (1-based).
    pub fn child(&self, n: u32) -> Self {
        let mut segments = self.segments.clone();
        segments.push(n);
        Self { segments }
    }

    /// Dotted segments, e.g. `[1, 2, 3]` for `"1.2.3"`.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Nesting depth: `1` for the root, `2` for its children, and so on.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for PartId {
    type Err = MimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Result<Vec<u32>, _> = s.split('.').map(|seg| seg.parse::<u32>()).collect();
        match segments {
            Ok(segments) if !segments.is_empty() => Ok(Self { segments }),
            _ => Err(MimeError::UnknownPart(s.to_string())),
        }
    }
}

impl Serialize for PartId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything known about one MIME part: structured headers plus the byte
/// ranges locating it inside the original message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    /// Hierarchical identifier of this part.
    pub id: PartId,

    /// Parsed `Content-Type`, defaulting to `text/plain` when absent.
    pub content_type: ContentType,

    /// Lowercase `Content-Transfer-Encoding` token, `"7bit"` when absent.
    pub transfer_encoding: String,

    /// Parsed `Content-Disposition`, when present.
    pub disposition: Option<ContentDisposition>,

    /// `Content-Id` value with surrounding angle brackets stripped.
    pub content_id: Option<String>,

    /// All headers of the part in document order.
    pub headers: HeaderList,

    /// Absolute offset of the first byte of the part (its headers).
    pub part_start: u64,

    /// Absolute offset one past the last byte of the part.
    pub part_end: u64,

    /// Absolute offset of the first body byte (after the blank separator).
    pub body_start: u64,

    /// Absolute offset one past the last body byte.
    pub body_end: u64,

    /// Child part ids, in document order. Empty for leaf parts.
    pub children: Vec<PartId>,
}

impl PartRecord {
    /// `true` for `multipart/*` containers.
    pub fn is_multipart(&self) -> bool {
        self.content_type.is_multipart()
    }

    /// Disposition kind (`"attachment"`, `"inline"`, ...), if any.
    pub fn disposition_kind(&self) -> Option<&str> {
        self.disposition.as_ref().map(|d| d.kind.as_str())
    }

    /// Length in bytes of the (still encoded) body.
    pub fn body_len(&self) -> u64 {
        self.body_end - self.body_start
    }
}
