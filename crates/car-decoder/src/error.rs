use car_types::TypeError;
use car_wire::WireError;

/// Errors that can occur while reading an archive.
///
/// Both readers report failures the same way: header problems are wrapped
/// in [`InvalidHeader`](Self::InvalidHeader), problems inside the body
/// carry the byte offset of the frame that failed.
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── InvalidHeader(WireError)   ← prefix, DAG-CBOR body, or version wrong
///   ├── HeaderTooLarge             ← header prefix exceeds the configured limit
///   ├── MalformedArchive           ← frame at `offset` failed to parse
///   ├── FrameTooLarge              ← frame prefix exceeds the configured limit
///   ├── DigestLength               ← digest size disagrees with the digest table
///   ├── Type                       ← payload at `offset` failed re-hash verification
///   └── Io(std::io::Error)         ← from the underlying reader, unchanged
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The length-prefixed header failed to parse.
    ///
    /// Empty input lands here too, as a truncated varint.
    #[error("invalid header: {0}")]
    InvalidHeader(WireError),

    #[error("header length {len} exceeds limit {limit}")]
    HeaderTooLarge { len: u64, limit: usize },

    /// A frame in the body failed to parse. `offset` is the position of
    /// the frame's length prefix from the start of the archive.
    #[error("malformed archive at offset {offset}: {source}")]
    MalformedArchive {
        offset: u64,
        #[source]
        source: WireError,
    },

    #[error("frame at offset {offset} declares {len} bytes, limit is {limit}")]
    FrameTooLarge { offset: u64, len: u64, limit: usize },

    /// A CID's digest length disagrees with the configured
    /// [`DigestTable`](car_types::DigestTable).
    #[error("frame at offset {offset}: {source}")]
    DigestLength {
        offset: u64,
        #[source]
        source: TypeError,
    },

    /// A payload did not hash to its CID (only with
    /// [`verify_blocks`](crate::ReaderConfig::verify_blocks)).
    #[error("frame at offset {offset}: {source}")]
    Type {
        offset: u64,
        #[source]
        source: TypeError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// The wire-level cause, for header and frame failures.
    #[must_use]
    pub fn wire_error(&self) -> Option<&WireError> {
        match self {
            Self::InvalidHeader(source) | Self::MalformedArchive { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Offset of the frame that failed, when the error is tied to one.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::MalformedArchive { offset, .. }
            | Self::FrameTooLarge { offset, .. }
            | Self::DigestLength { offset, .. }
            | Self::Type { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
