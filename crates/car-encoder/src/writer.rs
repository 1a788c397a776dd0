use car_types::Block;
use car_wire::block_frame::write_frame;
use car_wire::{CarHeader, Cid};
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream};
use tracing::{debug, trace, warn};

use crate::error::EncodeError;

/// Buffer size of the in-memory channel behind [`CarWriter::create`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64 * 1024;

/// Writer lifecycle.
///
/// ```text
///   HeaderPending ──▶ HeaderWritten ──▶ BlockWritten ──▶ Closed
///         │                               ▲    │  put      ▲
///         │                               └────┘           │
///         └──────────────────── close ─────────────────────┘
///
///   any sink error ──▶ Failed   (every later put / close is refused)
/// ```
///
/// The header is encoded when the writer is created and sits in front of
/// everything else; it reaches the sink on the first `put` or on `close`,
/// whichever comes first.
///
/// A sink error can leave part of a header or frame in the sink, so the
/// writer never appends after one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// Header encoded and queued, nothing written to the sink yet.
    HeaderPending,
    HeaderWritten,
    BlockWritten,
    Closed,
    /// The sink reported an error; its contents end mid-archive.
    Failed,
}

/// Asynchronous, append-only archive writer.
///
/// `CarWriter` is a straight pass-through encoder: every
/// [`put`](Self::put) writes exactly one frame to the sink, in call order,
/// with no reordering and no buffering beyond one reusable frame buffer.
/// The writer owns its sink until [`finish`](Self::finish) hands it back
/// (or the writer is dropped).
///
/// # Example
///
/// ```rust,no_run
/// use car_encoder::CarWriter;
/// use car_types::{Block, Sha2_256Hasher, codec};
///
/// # async fn demo() -> Result<(), car_encoder::EncodeError> {
/// let block = Block::encode(codec::RAW, &Sha2_256Hasher, &b"hello"[..]);
/// let file = tokio::fs::File::create("example.car").await?;
///
/// let mut writer = CarWriter::new(file, vec![block.cid.clone()])?;
/// writer.put_block(&block).await?;
/// writer.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct CarWriter<W> {
    sink: W,
    state: WriterState,
    /// Length-prefixed header, emitted ahead of the first frame.
    header: Vec<u8>,
    /// Frame scratch buffer, reused across puts.
    buf: Vec<u8>,
    blocks_written: u64,
    bytes_written: u64,
}

impl CarWriter<DuplexStream> {
    /// Create a writer bound to an internal in-memory channel.
    ///
    /// Returns the writer and the read half of the channel. The read half
    /// yields the archive bytes as they are written and reaches EOF once
    /// the writer is closed. The channel holds
    /// [`DEFAULT_CHANNEL_CAPACITY`] bytes; when it is full, `put` waits
    /// for the reader to catch up, so drain the output from another task.
    ///
    /// The header is encoded here but sent lazily: the read half sees no
    /// bytes until the first [`put`](Self::put) or [`close`](Self::close),
    /// and then sees the header before anything else. Writing it here
    /// would block whenever the header is larger than the channel.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Wire`] if the header cannot be encoded.
    pub fn create(roots: Vec<Cid>) -> Result<(Self, DuplexStream), EncodeError> {
        Self::create_with_capacity(roots, DEFAULT_CHANNEL_CAPACITY)
    }

    /// [`create`](Self::create) with an explicit channel capacity.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Wire`] if the header cannot be encoded.
    pub fn create_with_capacity(
        roots: Vec<Cid>,
        capacity: usize,
    ) -> Result<(Self, DuplexStream), EncodeError> {
        let (sink, output) = tokio::io::duplex(capacity);
        Ok((Self::new(sink, roots)?, output))
    }
}

impl<W: AsyncWrite + Unpin> CarWriter<W> {
    /// Create a writer over `sink` with a version 1 header listing `roots`.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Wire`] if the header cannot be encoded.
    pub fn new(sink: W, roots: Vec<Cid>) -> Result<Self, EncodeError> {
        Self::with_header(sink, &CarHeader::new(roots))
    }

    /// Create a writer with a prepared header.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Wire`] if the header cannot be encoded.
    pub fn with_header(sink: W, header: &CarHeader) -> Result<Self, EncodeError> {
        let header_bytes = header.to_bytes()?;
        debug!(
            roots = header.roots.len(),
            header_len = header_bytes.len(),
            "car header queued"
        );

        Ok(Self {
            sink,
            state: WriterState::HeaderPending,
            header: header_bytes,
            buf: Vec::with_capacity(4096),
            blocks_written: 0,
            bytes_written: 0,
        })
    }

    #[must_use]
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of frames written so far.
    #[must_use]
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    /// Number of bytes handed to the sink so far, header included.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Append one block frame.
    ///
    /// The CID is written as given; this method does not hash `data`.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::WriterClosed`] if the writer has been closed.
    /// - [`EncodeError::Poisoned`] if an earlier sink error failed the
    ///   writer.
    /// - [`EncodeError::Io`] if the sink fails. A channel writer whose
    ///   output half was dropped reports `BrokenPipe` here. The writer is
    ///   failed from then on.
    pub async fn put(&mut self, cid: &Cid, data: &[u8]) -> Result<(), EncodeError> {
        match self.state {
            WriterState::Closed => return Err(EncodeError::WriterClosed),
            WriterState::Failed => return Err(EncodeError::Poisoned),
            _ => {}
        }
        self.emit_header().await?;

        self.buf.clear();
        let frame_len = write_frame(&mut self.buf, cid, data)?;
        let written = self.sink.write_all(&self.buf).await;
        self.check_sink(written)?;

        self.state = WriterState::BlockWritten;
        self.blocks_written += 1;
        self.bytes_written += frame_len as u64;
        trace!(%cid, frame_len, "block written");
        Ok(())
    }

    /// [`put`](Self::put) for a [`Block`].
    ///
    /// # Errors
    ///
    /// Same as [`put`](Self::put).
    pub async fn put_block(&mut self, block: &Block) -> Result<(), EncodeError> {
        self.put(&block.cid, &block.data).await
    }

    /// Emit the header if nothing has been written yet, flush, and shut
    /// the sink down.
    ///
    /// Closing twice is an error rather than a no-op.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::AlreadyClosed`] on the second and later calls.
    /// - [`EncodeError::Poisoned`] if an earlier sink error failed the
    ///   writer.
    /// - [`EncodeError::Io`] if writing, flushing or shutting down the sink
    ///   fails; the writer is failed from then on.
    pub async fn close(&mut self) -> Result<(), EncodeError> {
        match self.state {
            WriterState::Closed => return Err(EncodeError::AlreadyClosed),
            WriterState::Failed => return Err(EncodeError::Poisoned),
            _ => {}
        }
        self.emit_header().await?;

        let flushed = self.sink.flush().await;
        self.check_sink(flushed)?;
        let shut = self.sink.shutdown().await;
        self.check_sink(shut)?;

        self.state = WriterState::Closed;
        debug!(
            blocks = self.blocks_written,
            bytes = self.bytes_written,
            "car writer closed"
        );
        Ok(())
    }

    /// Close the writer (if still open) and return the sink.
    ///
    /// # Errors
    ///
    /// Same as [`close`](Self::close), except that an already closed
    /// writer is not an error here. A failed writer reports
    /// [`EncodeError::Poisoned`] and the sink is dropped.
    pub async fn finish(mut self) -> Result<W, EncodeError> {
        if self.state != WriterState::Closed {
            self.close().await?;
        }
        Ok(self.sink)
    }

    async fn emit_header(&mut self) -> Result<(), EncodeError> {
        if self.state != WriterState::HeaderPending {
            return Ok(());
        }
        let written = self.sink.write_all(&self.header).await;
        self.check_sink(written)?;
        self.bytes_written += self.header.len() as u64;
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Pass a sink result through, failing the writer on error.
    fn check_sink<T>(&mut self, result: std::io::Result<T>) -> Result<T, EncodeError> {
        result.map_err(|e| {
            warn!(error = %e, bytes = self.bytes_written, "sink failed, car writer poisoned");
            self.state = WriterState::Failed;
            EncodeError::Io(e)
        })
    }
}
