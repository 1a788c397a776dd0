use car_wire::Multihash;
use sha2::{Digest, Sha256};

use crate::codec::hash;

/// A digest function that produces multihashes.
///
/// The archive codec never hashes anything on its own; callers hand it
/// CIDs. Hashers come in when a caller builds a block from raw bytes
/// ([`Block::encode`](crate::Block::encode)) or asks for a payload to be
/// checked against its CID ([`Block::verify`](crate::Block::verify)).
///
/// Implementations must be `Send + Sync` so a single instance can be
/// shared across tasks.
pub trait Hasher: Send + Sync {
    /// The multihash code this hasher produces.
    fn code(&self) -> u64;

    /// Hash `data` and wrap the digest with [`code`](Self::code).
    fn digest(&self, data: &[u8]) -> Multihash;
}

/// sha2-256 (`0x12`), the hash behind every v0 CID and most v1 CIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha2_256Hasher;

impl Hasher for Sha2_256Hasher {
    fn code(&self) -> u64 {
        hash::SHA2_256
    }

    fn digest(&self, data: &[u8]) -> Multihash {
        Multihash::wrap(hash::SHA2_256, &Sha256::digest(data))
    }
}

/// BLAKE3 (`0x1e`) with the default 32-byte output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn code(&self) -> u64 {
        hash::BLAKE3
    }

    fn digest(&self, data: &[u8]) -> Multihash {
        Multihash::wrap(hash::BLAKE3, blake3::hash(data).as_bytes())
    }
}

/// Identity (`0x00`): the digest is the input itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher;

impl Hasher for IdentityHasher {
    fn code(&self) -> u64 {
        hash::IDENTITY
    }

    fn digest(&self, data: &[u8]) -> Multihash {
        Multihash::wrap(hash::IDENTITY, data)
    }
}

static SHA2_256: Sha2_256Hasher = Sha2_256Hasher;
static BLAKE3: Blake3Hasher = Blake3Hasher;
static IDENTITY: IdentityHasher = IdentityHasher;

/// Look up a built-in hasher by multihash code.
///
/// Returns `None` for algorithms this workspace does not ship. Callers
/// treat those as opaque: the CID is still usable, the payload just cannot
/// be re-hashed.
#[must_use]
pub fn hasher_for(code: u64) -> Option<&'static dyn Hasher> {
    match code {
        hash::SHA2_256 => Some(&SHA2_256),
        hash::BLAKE3 => Some(&BLAKE3),
        hash::IDENTITY => Some(&IDENTITY),
        _ => None,
    }
}
