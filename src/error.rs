//! Centralized error types for mimeindex.

use thiserror::Error;

/// All errors produced by the mimeindex library.
#[derive(Error, Debug)]
pub enum MimeError {
    /// An accessor was used before `parse_source()` completed successfully.
    #[error("parse_source() must be called before accessing message parts")]
    NotParsed,

    /// The requested part id is not present in the part index.
    #[error("Unknown part id: '{0}'")]
    UnknownPart(String),

    /// A header block could not be parsed at a specific byte offset.
    ///
    /// This is fatal: there is no valid message without valid headers.
    #[error("Malformed header at offset {offset}: {reason}")]
    MalformedHeader { offset: u64, reason: String },

    /// A multipart part is missing the required `boundary` parameter.
    ///
    /// The structure parser recovers from this by keeping the container as
    /// an unparsed leaf; the variant surfaces when the subtree scan is
    /// invoked directly.
    #[error("Multipart part '{id}' has no boundary parameter")]
    MissingBoundary { id: String },

    /// No `text/plain` or `text/html` leaf exists to serve as the main body.
    #[error("Could not identify a main message body")]
    NoBodyFound,

    /// A requested byte range falls outside the message source.
    #[error("Byte range {start}..{end} out of bounds for source of {len} bytes")]
    InvalidRange { start: u64, end: u64, len: u64 },

    /// I/O error from the underlying byte source.
    #[error("I/O error reading message source: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, MimeError>`.
pub type Result<T> = std::result::Result<T, MimeError>;

impl MimeError {
    /// Create a `MalformedHeader` from an offset and a reason.
    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }
}
