use std::fmt;
use std::str::FromStr;

use multibase::Base;

use crate::error::WireError;
use crate::multihash::Multihash;
use crate::varint::{decode_varint, push_varint, varint_len};

/// Multicodec of every v0 CID (dag-pb).
pub const V0_CODEC: u64 = 0x70;

/// Hash algorithm of every v0 CID (sha2-256).
pub const V0_HASH_CODE: u64 = 0x12;

/// Digest length of every v0 CID.
pub const V0_DIGEST_LEN: usize = 32;

/// CID version.
///
/// v0 has no version byte on the wire: it is a bare sha2-256 multihash
/// (`0x12 0x20 <32 bytes>`) that implies the dag-pb codec. v1 starts with
/// the varint `1`, followed by the codec and the multihash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    V0,
    V1,
}

impl Version {
    #[must_use]
    pub fn as_u64(self) -> u64 {
        match self {
            Self::V0 => 0,
            Self::V1 => 1,
        }
    }
}

/// Content identifier: `(version, codec, multihash)`.
///
/// ```text
/// v1:
/// ┌──────────────────────────────────────────┐
/// │ version  (varint, always 1)              │
/// │ codec    (varint, e.g. 0x55 raw)         │
/// │ multihash (code, digest_len, digest)     │
/// └──────────────────────────────────────────┘
///
/// v0:
/// ┌──────────────────────────────────────────┐
/// │ 0x12 0x20 <32-byte sha2-256 digest>      │
/// └──────────────────────────────────────────┘
/// ```
///
/// Values are immutable once built. The decoder only accepts minimal
/// varints, so two `Cid`s compare equal exactly when their encodings are
/// byte-for-byte equal, which makes the derived `Hash`/`Eq` safe for map
/// keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid {
    version: Version,
    codec: u64,
    hash: Multihash,
}

impl Cid {
    /// Build a v1 CID.
    #[must_use]
    pub fn new_v1(codec: u64, hash: Multihash) -> Self {
        Self {
            version: Version::V1,
            codec,
            hash,
        }
    }

    /// Build a v0 CID. The hash must be sha2-256 with a 32-byte digest.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidV0`] if the multihash has any other shape.
    pub fn new_v0(hash: Multihash) -> Result<Self, WireError> {
        if hash.code() != V0_HASH_CODE {
            return Err(WireError::InvalidV0 {
                reason: "hash algorithm must be sha2-256",
            });
        }
        if hash.size() != V0_DIGEST_LEN {
            return Err(WireError::InvalidV0 {
                reason: "digest must be 32 bytes",
            });
        }
        Ok(Self {
            version: Version::V0,
            codec: V0_CODEC,
            hash,
        })
    }

    /// Build a CID of either version.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidV0`] for a v0 request whose codec is not dag-pb
    /// or whose hash is not a 32-byte sha2-256 digest.
    pub fn new(version: Version, codec: u64, hash: Multihash) -> Result<Self, WireError> {
        match version {
            Version::V1 => Ok(Self::new_v1(codec, hash)),
            Version::V0 if codec != V0_CODEC => Err(WireError::InvalidV0 {
                reason: "codec must be dag-pb",
            }),
            Version::V0 => Self::new_v0(hash),
        }
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// The multicodec describing how the payload is encoded.
    #[must_use]
    pub fn codec(&self) -> u64 {
        self.codec
    }

    #[must_use]
    pub fn hash(&self) -> &Multihash {
        &self.hash
    }

    /// Length of the canonical byte encoding.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self.version {
            Version::V0 => self.hash.encoded_len(),
            Version::V1 => varint_len(1) + varint_len(self.codec) + self.hash.encoded_len(),
        }
    }

    /// Canonical byte encoding.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.push_bytes(&mut out);
        out
    }

    /// Append the canonical byte encoding to `out`.
    pub fn push_bytes(&self, out: &mut Vec<u8>) {
        if self.version == Version::V1 {
            push_varint(out, 1);
            push_varint(out, self.codec);
        }
        self.hash.write_to(out);
    }

    /// Write the canonical byte encoding to `w`.
    ///
    /// # Returns
    ///
    /// Number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Io`] if the writer fails.
    pub fn write_bytes(&self, w: &mut impl std::io::Write) -> Result<usize, WireError> {
        let bytes = self.to_bytes();
        w.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Read a CID from the front of `buf`. CIDs are self-delimiting, so
    /// anything after the digest is left alone.
    ///
    /// # Returns
    ///
    /// `(cid, bytes_consumed)`.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnknownVersion`] for a version other than 1 that is
    ///   not the legacy v0 shape.
    /// - [`WireError::TruncatedIdentifier`] if the digest is cut short.
    /// - [`WireError::MalformedVarint`] if any varint field is bad.
    pub fn read_bytes(buf: &[u8]) -> Result<(Self, usize), WireError> {
        // A v0 CID starts with the sha2-256 multihash prefix
        if buf.first() == Some(&0x12) && buf.get(1) == Some(&0x20) {
            let (hash, consumed) = Multihash::read_from(buf)?;
            return Ok((Self::new_v0(hash)?, consumed));
        }

        let (version, mut cursor) = decode_varint(buf)?;
        if version != 1 {
            return Err(WireError::UnknownVersion { version });
        }

        let (codec, n) = decode_varint(&buf[cursor..])?;
        cursor += n;

        let (hash, n) = Multihash::read_from(&buf[cursor..])?;
        cursor += n;

        Ok((Self::new_v1(codec, hash), cursor))
    }
}

impl TryFrom<&[u8]> for Cid {
    type Error = WireError;

    /// Parse a standalone CID. Unlike [`Cid::read_bytes`], every byte must
    /// belong to the CID.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let (cid, consumed) = Self::read_bytes(bytes)?;
        if consumed != bytes.len() {
            return Err(WireError::TrailingIdentifierBytes {
                extra: bytes.len() - consumed,
            });
        }
        Ok(cid)
    }
}

impl fmt::Display for Cid {
    /// v1 renders as base32-lower multibase (`bafy...`, `bafk...`), v0 as
    /// bare base58btc (`Qm...`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.version {
            Version::V0 => Base::Base58Btc.encode(self.to_bytes()),
            Version::V1 => multibase::encode(Base::Base32Lower, self.to_bytes()),
        };
        f.write_str(&text)
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({self})")
    }
}

impl FromStr for Cid {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |e: multibase::Error| WireError::InvalidCidString {
            reason: e.to_string(),
        };

        let bytes = if s.len() == 46 && s.starts_with("Qm") {
            Base::Base58Btc.decode(s).map_err(invalid)?
        } else {
            multibase::decode(s).map_err(invalid)?.1
        };

        Self::try_from(bytes.as_slice())
    }
}
