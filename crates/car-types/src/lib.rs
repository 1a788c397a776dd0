#![warn(clippy::pedantic)]

pub mod block;
pub mod codec;
pub mod digest_table;
pub mod error;
pub mod hasher;

pub use block::Block;
pub use digest_table::DigestTable;
pub use error::TypeError;
pub use hasher::{Blake3Hasher, Hasher, IdentityHasher, Sha2_256Hasher, hasher_for};

pub use car_wire::{Cid, Multihash, Version};
