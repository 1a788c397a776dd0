use car_wire::WireError;

/// Errors that can occur while writing an archive.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── WriterClosed       ← put() after close()
///   ├── AlreadyClosed      ← close() called a second time
///   ├── Poisoned           ← put() / close() after a sink error
///   ├── Wire(WireError)    ← header could not be encoded
///   └── Io(std::io::Error) ← from the underlying sink, unchanged
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot put a block: writer is closed")]
    WriterClosed,

    #[error("writer is already closed")]
    AlreadyClosed,

    #[error("writer failed on an earlier sink error; the output is incomplete")]
    Poisoned,

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
