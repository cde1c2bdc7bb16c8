//! `mimeindex` — lazy MIME message parsing over byte-range offsets.
//!
//! Parses a raw RFC 822/2045 message into a tree of MIME parts without
//! materializing bodies: each part is indexed by its exact byte offsets into
//! the original message, and headers and bodies are read (and decoded) on
//! demand through a random-access byte source.

pub mod error;
pub mod index;
pub mod message;
pub mod model;
pub mod parser;
pub mod source;
