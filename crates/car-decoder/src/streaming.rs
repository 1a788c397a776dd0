use bytes::Bytes;
use car_types::Block;
use car_wire::varint::MAX_VARINT_BYTES;
use car_wire::{BlockFrame, CarHeader, Cid, WireError};
use tokio::io::AsyncRead;
use tracing::trace;

use crate::config::ReaderConfig;
use crate::error::DecodeError;
use crate::frame_io;

/// Asynchronous streaming decoder: yields blocks one at a time without
/// buffering the whole archive.
///
/// This is the API for large archives and network streams. The header
/// is read on the first call to [`next`](Self::next); each later call
/// reads exactly one frame. Backpressure is natural: nothing is read
/// until the caller awaits the next block. Each block owns its payload
/// allocation, so blocks already handed out stay valid whatever happens
/// to the stream afterwards.
///
/// The reader can be passed by value or as `&mut R` to keep ownership.
///
/// # Example
///
/// ```rust,no_run
/// use car_decoder::StreamingDecoder;
/// use tokio::io::AsyncRead;
///
/// async fn walk(reader: impl AsyncRead + Unpin) {
///     let mut stream = StreamingDecoder::new(reader);
///     while let Some(block) = stream.next().await.transpose().unwrap() {
///         println!("{} ({} bytes)", block.cid, block.data.len());
///     }
/// }
/// ```
pub struct StreamingDecoder<R> {
  reader: R,
  config: ReaderConfig,
  state: StreamState,
  header: Option<CarHeader>,
  /// Archive offset of the next frame's length prefix.
  offset: u64,
  /// Raw bytes of the current length prefix.
  prefix: Vec<u8>,
}

/// Internal state machine for the streaming decoder.
///
/// ```text
///   ReadHeader → ReadBlocks → Done
///        │                      ▲
///        └──────── error ───────┘
/// ```
///
/// Any error moves the decoder to `Done`; it is not restartable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
  ReadHeader,
  ReadBlocks,
  Done,
}

impl<R: AsyncRead + Unpin> StreamingDecoder<R> {
  /// Create a decoder with the default [`ReaderConfig`].
  #[must_use]
  pub fn new(reader: R) -> Self {
    Self::with_config(reader, ReaderConfig::default())
  }

  #[must_use]
  pub fn with_config(reader: R, config: ReaderConfig) -> Self {
    Self {
      reader,
      config,
      state: StreamState::ReadHeader,
      header: None,
      offset: 0,
      prefix: Vec::with_capacity(MAX_VARINT_BYTES),
    }
  }

  /// The archive header, once the first [`next`](Self::next) call has
  /// read it.
  #[must_use]
  pub fn header(&self) -> Option<&CarHeader> {
    self.header.as_ref()
  }

  /// The header's roots, once the first [`next`](Self::next) call has
  /// read them.
  #[must_use]
  pub fn roots(&self) -> Option<&[Cid]> {
    self.header.as_ref().map(|h| h.roots.as_slice())
  }

  /// Bytes consumed from the reader so far.
  #[must_use]
  pub fn offset(&self) -> u64 {
    self.offset
  }

  /// Give back the reader, positioned after the last consumed byte.
  pub fn into_inner(self) -> R {
    self.reader
  }

  /// Read the next block.
  ///
  /// Returns `Some(Ok(block))` for each frame, `None` once the input
  /// ends cleanly at a frame boundary, or `Some(Err(_))` on the first
  /// failure. After `None` or an error every later call returns `None`.
  ///
  /// An archive with a valid header and no frames yields `None` on the
  /// first call; [`header`](Self::header) is populated regardless.
  pub async fn next(&mut self) -> Option<Result<Block, DecodeError>> {
    if self.state == StreamState::ReadHeader {
      if let Err(e) = self.read_header().await {
        self.state = StreamState::Done;
        return Some(Err(e));
      }
    }

    if self.state == StreamState::Done {
      return None;
    }

    match self.read_next_block().await {
      Ok(Some(block)) => Some(Ok(block)),
      Ok(None) => {
        self.state = StreamState::Done;
        None
      }
      Err(e) => {
        self.state = StreamState::Done;
        Some(Err(e))
      }
    }
  }

  async fn read_header(&mut self) -> Result<(), DecodeError> {
    let (header, consumed) = frame_io::read_header(&mut self.reader, &self.config).await?;
    self.header = Some(header);
    self.offset = consumed;
    self.state = StreamState::ReadBlocks;
    Ok(())
  }

  /// Read one frame. `Ok(None)` means the input ended before a new
  /// length prefix.
  async fn read_next_block(&mut self) -> Result<Option<Block>, DecodeError> {
    let offset = self.offset;

    self.prefix.clear();
    let declared = frame_io::read_varint(&mut self.reader, &mut self.prefix)
      .await
      .map_err(|e| e.into_frame_error(offset))?;
    let Some(declared) = declared else {
      trace!(offset, "end of archive");
      return Ok(None);
    };
    let len = self.config.check_frame_len(offset, declared)?;

    // Fresh buffer per frame: the payload handed out keeps it alive
    let mut section = Vec::new();
    let available = frame_io::read_section(&mut self.reader, len, &mut section).await?;
    if available < len {
      return Err(DecodeError::MalformedArchive {
        offset,
        source: WireError::IncompleteFrame { declared, available },
      });
    }

    let frame = BlockFrame::from_section(Bytes::from(section))
      .map_err(|source| DecodeError::MalformedArchive { offset, source })?;
    let block = Block::from(frame);
    self.config.check_block(offset, &block)?;

    self.offset += (self.prefix.len() + len) as u64;
    trace!(offset, cid = %block.cid, len, "block read");
    Ok(Some(block))
  }
}
