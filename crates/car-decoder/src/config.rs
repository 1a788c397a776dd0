use car_types::{Block, DigestTable, TypeError};
use tracing::trace;

use crate::error::DecodeError;

/// Default cap on the header and on each frame: 16 MiB.
pub const DEFAULT_MAX_LEN: usize = 16 * 1024 * 1024;

/// Limits and integrity checks shared by [`CarReader`](crate::CarReader),
/// [`StreamingDecoder`](crate::StreamingDecoder) and
/// [`StreamingIndexer`](crate::StreamingIndexer).
///
/// ```rust
/// use car_decoder::ReaderConfig;
///
/// let config = ReaderConfig {
///     verify_blocks: true,
///     ..ReaderConfig::default()
/// };
/// assert_eq!(config.max_frame_len, 16 * 1024 * 1024);
/// ```
#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// Largest header body accepted, in bytes.
    pub max_header_len: usize,

    /// Largest frame section (CID plus payload) accepted, in bytes. A
    /// prefix above this is rejected before anything is allocated.
    pub max_frame_len: usize,

    /// Expected digest lengths. `None` disables the check.
    pub digest_table: Option<DigestTable>,

    /// Re-hash every payload whose algorithm has a built-in hasher.
    /// Algorithms without one are passed through.
    pub verify_blocks: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_header_len: DEFAULT_MAX_LEN,
            max_frame_len: DEFAULT_MAX_LEN,
            digest_table: Some(DigestTable::well_known()),
            verify_blocks: false,
        }
    }
}

impl ReaderConfig {
    /// Reject a frame prefix above [`max_frame_len`](Self::max_frame_len).
    /// Returns the length as `usize` once it is known to fit.
    pub(crate) fn check_frame_len(&self, offset: u64, len: u64) -> Result<usize, DecodeError> {
        usize::try_from(len)
            .ok()
            .filter(|&n| n <= self.max_frame_len)
            .ok_or(DecodeError::FrameTooLarge {
                offset,
                len,
                limit: self.max_frame_len,
            })
    }

    pub(crate) fn check_header_len(&self, len: u64) -> Result<usize, DecodeError> {
        usize::try_from(len)
            .ok()
            .filter(|&n| n <= self.max_header_len)
            .ok_or(DecodeError::HeaderTooLarge {
                len,
                limit: self.max_header_len,
            })
    }

    /// Digest table lookup for a CID read at `offset`.
    pub(crate) fn check_cid(&self, offset: u64, cid: &car_wire::Cid) -> Result<(), DecodeError> {
        if let Some(table) = &self.digest_table {
            table
                .check(cid.hash())
                .map_err(|source| DecodeError::DigestLength { offset, source })?;
        }
        Ok(())
    }

    /// Digest table plus optional re-hash for a decoded block.
    pub(crate) fn check_block(&self, offset: u64, block: &Block) -> Result<(), DecodeError> {
        self.check_cid(offset, &block.cid)?;
        if self.verify_blocks {
            match block.verify() {
                Ok(()) => {}
                Err(TypeError::UnsupportedHasher { code }) => {
                    trace!(offset, code, "no hasher registered, skipping verification");
                }
                Err(source) => return Err(DecodeError::Type { offset, source }),
            }
        }
        Ok(())
    }
}
