use std::fmt;

use crate::error::WireError;
use crate::varint::{decode_varint, push_varint, varint_len};

/// A self-describing digest: hash algorithm code plus the raw digest.
///
/// ```text
/// ┌──────────────────────────────────────────┐
/// │ code        (varint, e.g. 0x12 sha2-256) │
/// │ digest_len  (varint)                     │
/// │ digest      [digest_len bytes]           │
/// └──────────────────────────────────────────┘
/// ```
///
/// The code is opaque at this layer. Whether a digest length is plausible
/// for its algorithm is checked one level up, against a digest table the
/// caller controls.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multihash {
    code: u64,
    digest: Box<[u8]>,
}

impl Multihash {
    /// Wrap an already computed digest.
    #[must_use]
    pub fn wrap(code: u64, digest: &[u8]) -> Self {
        Self {
            code,
            digest: digest.into(),
        }
    }

    /// The hash algorithm code.
    #[must_use]
    pub fn code(&self) -> u64 {
        self.code
    }

    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.digest.len()
    }

    /// Number of bytes [`write_to`](Self::write_to) appends.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        varint_len(self.code) + varint_len(self.digest.len() as u64) + self.digest.len()
    }

    /// Append the encoded multihash to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        push_varint(out, self.code);
        push_varint(out, self.digest.len() as u64);
        out.extend_from_slice(&self.digest);
    }

    /// Read a multihash from the front of `buf`.
    ///
    /// # Returns
    ///
    /// `(multihash, bytes_consumed)`.
    ///
    /// # Errors
    ///
    /// - [`WireError::MalformedVarint`] if the code or length varint is bad.
    /// - [`WireError::TruncatedIdentifier`] if fewer digest bytes remain
    ///   than the length varint declares.
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize), WireError> {
        let (code, mut cursor) = decode_varint(buf)?;
        let (declared, n) = decode_varint(&buf[cursor..])?;
        cursor += n;

        let available = buf.len() - cursor;
        let digest_len = usize::try_from(declared)
            .ok()
            .filter(|&len| len <= available)
            .ok_or(WireError::TruncatedIdentifier {
                declared,
                available,
            })?;

        let digest = &buf[cursor..cursor + digest_len];
        Ok((Self::wrap(code, digest), cursor + digest_len))
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({:#x}, ", self.code)?;
        for byte in self.digest.iter() {
            write!(f, "{byte:02x}")?;
        }
        f.write_str(")")
    }
}
