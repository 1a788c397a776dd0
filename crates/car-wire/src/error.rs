/// The specific way a varint failed to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VarintError {
    /// Varint encoding exceeded 10 bytes without terminating.
    #[error("exceeded 10-byte limit")]
    TooLong,

    /// The 10th byte carried bits that do not fit in a u64.
    #[error("value overflows u64")]
    Overflow,

    /// The encoding ends in a redundant zero group (e.g. `0x81 0x00`).
    #[error("not minimally encoded")]
    NotMinimal,

    /// Input ended while the continuation bit was still set.
    #[error("input ended mid-varint at offset {offset}")]
    Truncated { offset: usize },
}

/// Errors from the CAR wire codecs.
///
/// ```text
///   WireError
///   ├── MalformedVarint(VarintError) ← length prefix or CID field
///   ├── TruncatedIdentifier          ← digest shorter than declared
///   ├── UnknownVersion               ← CID version other than 0/1
///   ├── InvalidV0                    ← legacy CID with the wrong shape
///   ├── TrailingIdentifierBytes      ← bytes after a standalone CID
///   ├── InvalidCidString             ← textual CID failed to parse
///   ├── UnsupportedVersion           ← header version != 1
///   ├── MalformedHeader              ← header body not the expected map
///   ├── IncompleteFrame              ← fewer bytes than a prefix declares
///   └── Io(std::io::Error)
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed varint: {0}")]
    MalformedVarint(#[from] VarintError),

    /// The multihash declares more digest bytes than remain in the input.
    #[error("truncated identifier: digest declares {declared} bytes, {available} available")]
    TruncatedIdentifier { declared: u64, available: usize },

    /// CID version is neither the legacy v0 shape nor 1.
    #[error("unknown CID version {version}")]
    UnknownVersion { version: u64 },

    /// A v0 CID must be a sha2-256 multihash with a 32-byte digest.
    #[error("invalid CIDv0: {reason}")]
    InvalidV0 { reason: &'static str },

    #[error("{extra} unexpected bytes after identifier")]
    TrailingIdentifierBytes { extra: usize },

    #[error("invalid CID string: {reason}")]
    InvalidCidString { reason: String },

    /// Archive header version other than 1.
    #[error("unsupported CAR version {version}, expected 1")]
    UnsupportedVersion { version: u64 },

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    /// A length prefix declared more bytes than the input holds.
    #[error("incomplete frame: declared {declared} bytes, {available} available")]
    IncompleteFrame { declared: u64, available: usize },

    /// I/O error during read or write.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    pub(crate) fn malformed_header(reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
        }
    }
}
