use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use bytes::Bytes;
use car_types::Block;
use car_wire::varint::decode_varint;
use car_wire::{BlockFrame, CarHeader, Cid};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::config::ReaderConfig;
use crate::error::DecodeError;

/// Indexed archive reader: the whole archive in memory, blocks
/// addressable by CID.
///
/// Construction does one forward pass over the bytes: header first, then
/// frames until the buffer is exhausted. Any failure aborts construction,
/// so a `CarReader` that exists always describes a fully valid archive.
/// Payloads are slices of the retained buffer, not copies.
///
/// ```text
///   bytes ──▶ header ──▶ frame 0 ──▶ frame 1 ──▶ ... ──▶ end of buffer
///                          │           │
///                          ▼           ▼
///                 blocks: [Block,      Block,      ...]   file order
///                 index:  {cid → first position}
/// ```
///
/// When a CID appears more than once, [`get`](Self::get) returns the
/// first occurrence and [`blocks`](Self::blocks) still yields every
/// frame.
#[derive(Debug)]
pub struct CarReader {
    header: CarHeader,
    blocks: Vec<Block>,
    index: HashMap<Cid, usize>,
}

impl CarReader {
    /// Parse an in-memory archive with the default [`ReaderConfig`].
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InvalidHeader`] if the header is missing,
    ///   truncated or malformed.
    /// - [`DecodeError::MalformedArchive`] if any frame fails to parse.
    /// - [`DecodeError::HeaderTooLarge`], [`DecodeError::FrameTooLarge`]
    ///   or [`DecodeError::DigestLength`] per the configured limits.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, DecodeError> {
        Self::from_bytes_with_config(bytes, &ReaderConfig::default())
    }

    /// [`from_bytes`](Self::from_bytes) with explicit limits and checks.
    ///
    /// # Errors
    ///
    /// Same as [`from_bytes`](Self::from_bytes), plus
    /// [`DecodeError::Type`] when `verify_blocks` is set and a payload
    /// does not hash to its CID.
    pub fn from_bytes_with_config(
        bytes: impl Into<Bytes>,
        config: &ReaderConfig,
    ) -> Result<Self, DecodeError> {
        let bytes = bytes.into();

        let (declared, _) = decode_varint(&bytes).map_err(DecodeError::InvalidHeader)?;
        config.check_header_len(declared)?;
        let (header, mut cursor) = CarHeader::read_from(&bytes).map_err(DecodeError::InvalidHeader)?;
        debug!(roots = header.roots.len(), header_len = cursor, "car header read");

        let mut blocks = Vec::new();
        let mut index = HashMap::new();

        while cursor < bytes.len() {
            let offset = cursor as u64;
            let rest = bytes.slice(cursor..);
            let malformed = |source| DecodeError::MalformedArchive { offset, source };

            let (declared, _) = decode_varint(&rest).map_err(malformed)?;
            config.check_frame_len(offset, declared)?;

            let (frame, consumed) = BlockFrame::read_from(&rest).map_err(malformed)?;
            let block = Block::from(frame);
            config.check_block(offset, &block)?;

            match index.entry(block.cid.clone()) {
                Entry::Occupied(_) => debug!(cid = %block.cid, offset, "duplicate block, keeping first"),
                Entry::Vacant(slot) => {
                    slot.insert(blocks.len());
                }
            }
            blocks.push(block);
            cursor += consumed;
        }

        debug!(blocks = blocks.len(), unique = index.len(), bytes = bytes.len(), "car archive indexed");
        Ok(Self {
            header,
            blocks,
            index,
        })
    }

    /// Read `reader` to the end and parse the result.
    ///
    /// The reader is consumed and dropped on every path.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Io`] if reading fails, otherwise as
    /// [`from_bytes`](Self::from_bytes).
    pub async fn from_reader<R: AsyncRead + Unpin>(reader: R) -> Result<Self, DecodeError> {
        Self::from_reader_with_config(reader, &ReaderConfig::default()).await
    }

    /// [`from_reader`](Self::from_reader) with explicit limits and checks.
    ///
    /// # Errors
    ///
    /// As [`from_reader`](Self::from_reader).
    pub async fn from_reader_with_config<R: AsyncRead + Unpin>(
        mut reader: R,
        config: &ReaderConfig,
    ) -> Result<Self, DecodeError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        drop(reader);
        Self::from_bytes_with_config(buf, config)
    }

    /// Open and parse an archive file. The file is closed before this
    /// returns.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Io`] if the file cannot be opened or read,
    /// otherwise as [`from_bytes`](Self::from_bytes).
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        Self::open_with_config(path, &ReaderConfig::default()).await
    }

    /// [`open`](Self::open) with explicit limits and checks.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open).
    pub async fn open_with_config(
        path: impl AsRef<Path>,
        config: &ReaderConfig,
    ) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening car archive");
        let file = tokio::fs::File::open(path).await?;
        Self::from_reader_with_config(file, config).await
    }

    /// Header version; always 1 for an archive that parsed.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.header.version
    }

    #[must_use]
    pub fn header(&self) -> &CarHeader {
        &self.header
    }

    #[must_use]
    pub fn roots(&self) -> &[Cid] {
        &self.header.roots
    }

    /// Look up a block by CID. With duplicates, the first one in the
    /// archive wins.
    #[must_use]
    pub fn get(&self, cid: &Cid) -> Option<&Block> {
        self.index.get(cid).map(|&i| &self.blocks[i])
    }

    #[must_use]
    pub fn has(&self, cid: &Cid) -> bool {
        self.index.contains_key(cid)
    }

    /// Every block in file order, duplicates included.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// CIDs in file order, duplicates included.
    pub fn cids(&self) -> impl Iterator<Item = &Cid> {
        self.blocks.iter().map(|b| &b.cid)
    }

    /// Number of frames, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Take the blocks, file order.
    #[must_use]
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}
