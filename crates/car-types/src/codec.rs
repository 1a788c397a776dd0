//! Well-known multicodec and multihash codes.
//!
//! Only the handful of codes this workspace names directly. Any other code
//! is carried through untouched: neither the CID codec nor the archive
//! reader needs to understand a codec to store or index it.

/// Raw binary payload.
pub const RAW: u64 = 0x55;

/// MerkleDAG protobuf (the implied codec of every v0 CID).
pub const DAG_PB: u64 = 0x70;

pub const DAG_CBOR: u64 = 0x71;

pub const LIBP2P_KEY: u64 = 0x72;

pub const DAG_JSON: u64 = 0x0129;

/// Multihash algorithm codes.
pub mod hash {
    /// The digest *is* the data. Variable length.
    pub const IDENTITY: u64 = 0x00;
    pub const SHA2_256: u64 = 0x12;
    pub const SHA2_512: u64 = 0x13;
    pub const SHA3_512: u64 = 0x14;
    pub const SHA3_384: u64 = 0x15;
    pub const SHA3_256: u64 = 0x16;
    pub const KECCAK_256: u64 = 0x1b;
    /// BLAKE3 with the default 32-byte output (longer outputs are legal).
    pub const BLAKE3: u64 = 0x1e;
    pub const BLAKE2B_256: u64 = 0xb220;
}
