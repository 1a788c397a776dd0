use bytes::Bytes;
use car_wire::{BlockFrame, Cid};

use crate::error::TypeError;
use crate::hasher::{Hasher, hasher_for};

/// A content-addressed block: a CID and the payload it names.
///
/// This is the value callers exchange with the writer and readers. It is
/// cheap to clone: the payload is reference-counted, and blocks handed out
/// by the indexed reader share the archive buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Bytes,
}

impl Block {
    /// Pair an existing CID with its payload. Nothing is checked.
    pub fn new(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    /// Hash `data` and build a v1 CID with the given codec.
    pub fn encode(codec: u64, hasher: &dyn Hasher, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let cid = Cid::new_v1(codec, hasher.digest(&data));
        Self { cid, data }
    }

    /// Re-hash the payload with `hasher` and compare against the CID.
    ///
    /// # Errors
    ///
    /// - [`TypeError::HasherMismatch`] if `hasher` is not the CID's
    ///   algorithm.
    /// - [`TypeError::DigestMismatch`] if the digests differ.
    pub fn verify_with(&self, hasher: &dyn Hasher) -> Result<(), TypeError> {
        let expected = self.cid.hash();
        if hasher.code() != expected.code() {
            return Err(TypeError::HasherMismatch {
                hasher: hasher.code(),
                cid: expected.code(),
            });
        }

        let actual = hasher.digest(&self.data);
        if &actual != expected {
            return Err(TypeError::DigestMismatch {
                expected: self.cid.clone(),
                actual: Cid::new_v1(self.cid.codec(), actual),
            });
        }
        Ok(())
    }

    /// Re-hash the payload with the built-in hasher for the CID's
    /// algorithm.
    ///
    /// # Errors
    ///
    /// - [`TypeError::UnsupportedHasher`] if no built-in hasher exists for
    ///   the algorithm.
    /// - [`TypeError::DigestMismatch`] if the digests differ.
    pub fn verify(&self) -> Result<(), TypeError> {
        let code = self.cid.hash().code();
        let hasher = hasher_for(code).ok_or(TypeError::UnsupportedHasher { code })?;
        self.verify_with(hasher)
    }
}

impl From<BlockFrame> for Block {
    fn from(frame: BlockFrame) -> Self {
        Self {
            cid: frame.cid,
            data: frame.data,
        }
    }
}

impl From<Block> for BlockFrame {
    fn from(block: Block) -> Self {
        BlockFrame::new(block.cid, block.data)
    }
}
