use std::collections::HashMap;

use car_wire::Multihash;

use crate::codec::hash;
use crate::error::TypeError;

/// Expected digest lengths per multihash algorithm.
///
/// The table is configuration, not format: the wire codec accepts any
/// `(code, digest)` pair, and the reader consults a table only when one is
/// configured. Algorithms missing from the table pass through unchecked,
/// which keeps archives produced with newer hash functions readable.
///
/// ```text
/// ┌────────────────┬────────┬────────────┐
/// │ Algorithm      │ Code   │ Digest len │
/// ├────────────────┼────────┼────────────┤
/// │ sha2-256       │ 0x12   │ 32         │
/// │ sha2-512       │ 0x13   │ 64         │
/// │ sha3-512       │ 0x14   │ 64         │
/// │ sha3-384       │ 0x15   │ 48         │
/// │ sha3-256       │ 0x16   │ 32         │
/// │ keccak-256     │ 0x1b   │ 32         │
/// │ blake2b-256    │ 0xb220 │ 32         │
/// └────────────────┴────────┴────────────┘
/// ```
///
/// Identity and BLAKE3 are variable length and therefore absent from
/// [`well_known`](Self::well_known).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestTable {
    lengths: HashMap<u64, usize>,
}

impl DigestTable {
    /// An empty table: every algorithm passes through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed-length algorithms listed above.
    #[must_use]
    pub fn well_known() -> Self {
        Self::new()
            .with(hash::SHA2_256, 32)
            .with(hash::SHA2_512, 64)
            .with(hash::SHA3_512, 64)
            .with(hash::SHA3_384, 48)
            .with(hash::SHA3_256, 32)
            .with(hash::KECCAK_256, 32)
            .with(hash::BLAKE2B_256, 32)
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, code: u64, len: usize) -> Self {
        self.insert(code, len);
        self
    }

    /// Register (or replace) the expected digest length for `code`.
    pub fn insert(&mut self, code: u64, len: usize) {
        self.lengths.insert(code, len);
    }

    #[must_use]
    pub fn expected_len(&self, code: u64) -> Option<usize> {
        self.lengths.get(&code).copied()
    }

    /// Check a multihash against the table.
    ///
    /// # Errors
    ///
    /// [`TypeError::DigestLength`] if the algorithm is listed and the
    /// digest has a different length.
    pub fn check(&self, mh: &Multihash) -> Result<(), TypeError> {
        match self.expected_len(mh.code()) {
            Some(expected) if expected != mh.size() => Err(TypeError::DigestLength {
                code: mh.code(),
                expected,
                actual: mh.size(),
            }),
            _ => Ok(()),
        }
    }
}
