use car_wire::varint::MAX_VARINT_BYTES;
use car_wire::{CarHeader, Cid, WireError};
use tokio::io::AsyncRead;
use tracing::trace;

use crate::config::ReaderConfig;
use crate::error::DecodeError;
use crate::frame_io;

/// Where one frame sits in an archive.
///
/// ```text
///  offset                block_offset
///    │                        │
///    ▼                        ▼
///    ┌────────────┬───────────┬─────────────────────┐
///    │ len prefix │ cid bytes │ payload             │
///    └────────────┴───────────┴─────────────────────┘
///    ◀──────────────────── length ─────────────────▶
///                             ◀──── block_length ──▶
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    pub cid: Cid,
    /// Archive offset of the frame's length prefix.
    pub offset: u64,
    /// Whole frame, prefix included.
    pub length: u64,
    /// Archive offset of the payload.
    pub block_offset: u64,
    pub block_length: u64,
}

/// Forward pass that locates every frame without keeping payloads.
///
/// Only the length prefix and the CID of each frame are read into
/// memory; payload bytes are skipped. Pair the resulting offsets with a
/// seekable source to fetch individual payloads later.
pub struct StreamingIndexer<R> {
    reader: R,
    config: ReaderConfig,
    header: Option<CarHeader>,
    done: bool,
    offset: u64,
    prefix: Vec<u8>,
    cid_buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> StreamingIndexer<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ReaderConfig::default())
    }

    /// Only the limits and the digest table are consulted;
    /// `verify_blocks` has no effect since payloads are never read.
    #[must_use]
    pub fn with_config(reader: R, config: ReaderConfig) -> Self {
        Self {
            reader,
            config,
            header: None,
            done: false,
            offset: 0,
            prefix: Vec::with_capacity(MAX_VARINT_BYTES),
            cid_buf: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(&self) -> Option<&CarHeader> {
        self.header.as_ref()
    }

    /// Locate the next frame. Same termination rules as
    /// [`StreamingDecoder::next`](crate::StreamingDecoder::next).
    pub async fn next(&mut self) -> Option<Result<BlockIndex, DecodeError>> {
        if self.done {
            return None;
        }

        let result = if self.header.is_some() {
            self.index_next_frame().await
        } else {
            self.read_header_then_frame().await
        };

        match result {
            Ok(Some(index)) => Some(Ok(index)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Drain the archive into a list of indices.
    ///
    /// # Errors
    ///
    /// The first error [`next`](Self::next) reports.
    pub async fn collect(mut self) -> Result<(CarHeader, Vec<BlockIndex>), DecodeError> {
        let mut indices = Vec::new();
        while let Some(index) = self.next().await {
            indices.push(index?);
        }
        // A clean end always follows a successful header read
        match self.header {
            Some(header) => Ok((header, indices)),
            None => Err(DecodeError::InvalidHeader(WireError::MalformedHeader {
                reason: "missing header".into(),
            })),
        }
    }

    async fn read_header_then_frame(&mut self) -> Result<Option<BlockIndex>, DecodeError> {
        let (header, consumed) = frame_io::read_header(&mut self.reader, &self.config).await?;
        self.header = Some(header);
        self.offset = consumed;
        self.index_next_frame().await
    }

    async fn index_next_frame(&mut self) -> Result<Option<BlockIndex>, DecodeError> {
        let offset = self.offset;

        self.prefix.clear();
        let declared = frame_io::read_varint(&mut self.reader, &mut self.prefix)
            .await
            .map_err(|e| e.into_frame_error(offset))?;
        let Some(declared) = declared else {
            return Ok(None);
        };
        let len = self.config.check_frame_len(offset, declared)?;

        let cid = frame_io::read_cid(&mut self.reader, len, &mut self.cid_buf)
            .await
            .map_err(|e| e.into_frame_error(offset))?;
        self.config.check_cid(offset, &cid)?;

        let cid_len = self.cid_buf.len();
        let payload_len = (len - cid_len) as u64;
        let skipped = frame_io::skip(&mut self.reader, payload_len).await?;
        if skipped < payload_len {
            return Err(DecodeError::MalformedArchive {
                offset,
                source: WireError::IncompleteFrame {
                    declared,
                    // skipped < payload_len <= usize::MAX
                    available: cid_len + usize::try_from(skipped).unwrap_or(usize::MAX),
                },
            });
        }

        let prefix_len = self.prefix.len() as u64;
        let index = BlockIndex {
            cid,
            offset,
            length: prefix_len + len as u64,
            block_offset: offset + prefix_len + cid_len as u64,
            block_length: payload_len,
        };
        self.offset += index.length;
        trace!(offset, cid = %index.cid, block_length = payload_len, "frame indexed");
        Ok(Some(index))
    }
}
