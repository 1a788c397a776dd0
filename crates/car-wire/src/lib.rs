#![warn(clippy::pedantic)]

pub mod block_frame;
pub mod cid;
pub mod error;
pub mod header;
pub mod multihash;
pub mod varint;

pub use block_frame::BlockFrame;
pub use cid::{Cid, Version};
pub use error::{VarintError, WireError};
pub use header::CarHeader;
pub use multihash::Multihash;
