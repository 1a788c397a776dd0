use car_wire::Cid;

/// Errors from block-level integrity checks.
///
/// ```text
///   TypeError
///   ├── DigestLength      ← digest size wrong for a known algorithm
///   ├── DigestMismatch    ← payload does not hash to its CID
///   ├── HasherMismatch    ← hasher algorithm differs from the CID's
///   └── UnsupportedHasher ← no built-in hasher for the CID's algorithm
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("digest for hash {code:#x} is {actual} bytes, expected {expected}")]
    DigestLength {
        code: u64,
        expected: usize,
        actual: usize,
    },

    /// Re-hashing the payload produced a different CID.
    #[error("payload of {expected} hashes to {actual}")]
    DigestMismatch { expected: Cid, actual: Cid },

    #[error("hasher produces {hasher:#x} but CID uses {cid:#x}")]
    HasherMismatch { hasher: u64, cid: u64 },

    #[error("no hasher available for multihash code {code:#x}")]
    UnsupportedHasher { code: u64 },
}
