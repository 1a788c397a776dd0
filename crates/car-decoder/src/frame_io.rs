//! Async read helpers shared by the streaming decoder and indexer.

use car_wire::cid::V0_HASH_CODE;
use car_wire::varint::{MAX_VARINT_BYTES, decode_varint};
use car_wire::{CarHeader, Cid, VarintError, WireError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::config::ReaderConfig;
use crate::error::DecodeError;

/// Why an async read stopped short. The caller decides whether a wire
/// failure belongs to the header or to a frame.
pub(crate) enum ReadFailure {
  Io(std::io::Error),
  Wire(WireError),
}

impl ReadFailure {
  pub(crate) fn into_header_error(self) -> DecodeError {
    match self {
      Self::Io(e) => DecodeError::Io(e),
      Self::Wire(e) => DecodeError::InvalidHeader(e),
    }
  }

  pub(crate) fn into_frame_error(self, offset: u64) -> DecodeError {
    match self {
      Self::Io(e) => DecodeError::Io(e),
      Self::Wire(source) => DecodeError::MalformedArchive { offset, source },
    }
  }
}

impl From<WireError> for ReadFailure {
  fn from(e: WireError) -> Self {
    Self::Wire(e)
  }
}

impl From<std::io::Error> for ReadFailure {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

/// Read one varint a byte at a time, appending the raw bytes to `out`.
///
/// Returns `Ok(None)` if the input ends before the first byte. Ending
/// after it is a truncated varint.
pub(crate) async fn read_varint<R: AsyncRead + Unpin>(
  reader: &mut R,
  out: &mut Vec<u8>,
) -> Result<Option<u64>, ReadFailure> {
  let start = out.len();
  loop {
    let mut byte = [0u8; 1];
    if reader.read(&mut byte).await? == 0 {
      if out.len() == start {
        return Ok(None);
      }
      return Err(WireError::from(VarintError::Truncated { offset: out.len() - start }).into());
    }
    out.push(byte[0]);

    // decode_varint rejects a 10th byte that still has the MSB set
    if byte[0] & 0x80 == 0 || out.len() - start == MAX_VARINT_BYTES {
      let (value, _) = decode_varint(&out[start..])?;
      return Ok(Some(value));
    }
  }
}

/// Read up to `len` bytes into `out` (cleared first).
///
/// # Returns
///
/// How many bytes arrived; fewer than `len` means the input ended.
pub(crate) async fn read_section<R: AsyncRead + Unpin>(
  reader: &mut R,
  len: usize,
  out: &mut Vec<u8>,
) -> std::io::Result<usize> {
  out.clear();
  out.reserve_exact(len);
  (&mut *reader).take(len as u64).read_to_end(out).await
}

/// Discard up to `len` bytes. Returns how many were actually skipped.
pub(crate) async fn skip<R: AsyncRead + Unpin>(reader: &mut R, len: u64) -> std::io::Result<u64> {
  tokio::io::copy(&mut (&mut *reader).take(len), &mut tokio::io::sink()).await
}

/// Read and validate the length-prefixed header.
///
/// # Returns
///
/// `(header, bytes_consumed)`.
pub(crate) async fn read_header<R: AsyncRead + Unpin>(
  reader: &mut R,
  config: &ReaderConfig,
) -> Result<(CarHeader, u64), DecodeError> {
  let mut prefix = Vec::with_capacity(MAX_VARINT_BYTES);
  let declared = match read_varint(reader, &mut prefix).await {
    Ok(Some(len)) => len,
    Ok(None) => {
      return Err(DecodeError::InvalidHeader(VarintError::Truncated { offset: 0 }.into()));
    }
    Err(e) => return Err(e.into_header_error()),
  };
  let len = config.check_header_len(declared)?;

  let mut body = Vec::new();
  let available = read_section(reader, len, &mut body).await?;
  if available < len {
    return Err(DecodeError::InvalidHeader(WireError::IncompleteFrame {
      declared,
      available,
    }));
  }

  let header = CarHeader::decode_body(&body).map_err(DecodeError::InvalidHeader)?;
  debug!(roots = header.roots.len(), header_len = len, "car header read");
  Ok((header, (prefix.len() + len) as u64))
}

/// Read a CID field by field without reading past `limit` bytes.
///
/// The raw CID bytes are left in `buf`.
pub(crate) async fn read_cid<R: AsyncRead + Unpin>(
  reader: &mut R,
  limit: usize,
  buf: &mut Vec<u8>,
) -> Result<Cid, ReadFailure> {
  buf.clear();
  let first = read_cid_varint(reader, buf, limit).await?;

  if first == V0_HASH_CODE {
    // Legacy shape: 0x12 0x20 followed by a 32-byte digest
    read_cid_bytes(reader, buf, 1, limit).await?;
    if buf[1] == 0x20 {
      read_cid_bytes(reader, buf, 32, limit).await?;
    }
  } else if first == 1 {
    let _codec = read_cid_varint(reader, buf, limit).await?;
    let _hash_code = read_cid_varint(reader, buf, limit).await?;
    let digest_len = read_cid_varint(reader, buf, limit).await?;
    let available = limit - buf.len();
    let digest_len = usize::try_from(digest_len)
      .ok()
      .filter(|&n| n <= available)
      .ok_or(WireError::TruncatedIdentifier {
        declared: digest_len,
        available,
      })?;
    read_cid_bytes(reader, buf, digest_len, limit).await?;
  }

  // Anything else is rejected here with the same error the in-memory path
  // would report
  let (cid, _) = Cid::read_bytes(buf)?;
  Ok(cid)
}

async fn read_cid_varint<R: AsyncRead + Unpin>(
  reader: &mut R,
  buf: &mut Vec<u8>,
  limit: usize,
) -> Result<u64, ReadFailure> {
  let start = buf.len();
  let value = read_varint(reader, buf)
    .await?
    .ok_or(WireError::IncompleteFrame {
      declared: limit as u64,
      available: start,
    })?;
  if buf.len() > limit {
    return Err(
      WireError::TruncatedIdentifier {
        declared: buf.len() as u64,
        available: limit,
      }
      .into(),
    );
  }
  Ok(value)
}

async fn read_cid_bytes<R: AsyncRead + Unpin>(
  reader: &mut R,
  buf: &mut Vec<u8>,
  n: usize,
  limit: usize,
) -> Result<(), ReadFailure> {
  if buf.len() + n > limit {
    return Err(
      WireError::TruncatedIdentifier {
        declared: n as u64,
        available: limit - buf.len(),
      }
      .into(),
    );
  }
  let start = buf.len();
  let got = (&mut *reader).take(n as u64).read_to_end(buf).await?;
  if got < n {
    return Err(
      WireError::IncompleteFrame {
        declared: limit as u64,
        available: start + got,
      }
      .into(),
    );
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn varint(bytes: &[u8]) -> Result<Option<u64>, ReadFailure> {
    let mut reader = bytes;
    let mut out = Vec::new();
    read_varint(&mut reader, &mut out).await
  }

  #[tokio::test]
  async fn varint_values_and_eof() {
    assert!(matches!(varint(&[]).await, Ok(None)));
    assert!(matches!(varint(&[0x00]).await, Ok(Some(0))));
    assert!(matches!(varint(&[0xAC, 0x02]).await, Ok(Some(300))));
  }

  #[tokio::test]
  async fn varint_truncated_mid_value() {
    assert!(matches!(
      varint(&[0x80]).await,
      Err(ReadFailure::Wire(WireError::MalformedVarint(VarintError::Truncated { offset: 1 })))
    ));
  }

  #[tokio::test]
  async fn varint_too_long() {
    assert!(matches!(
      varint(&[0xFF; 11]).await,
      Err(ReadFailure::Wire(WireError::MalformedVarint(VarintError::TooLong)))
    ));
  }

  #[tokio::test]
  async fn cid_read_incrementally() {
    let v1 = Cid::new_v1(0x55, car_wire::Multihash::wrap(0x12, &[7; 32]));
    let v0 = Cid::new_v0(car_wire::Multihash::wrap(0x12, &[8; 32])).unwrap();

    for cid in [v1, v0] {
      let mut bytes = cid.to_bytes();
      bytes.extend_from_slice(b"payload");
      let mut reader = bytes.as_slice();
      let mut buf = Vec::new();

      let parsed = read_cid(&mut reader, bytes.len(), &mut buf).await.ok().unwrap();
      assert_eq!(parsed, cid);
      assert_eq!(buf.len(), cid.encoded_len());
      assert_eq!(reader, b"payload");
    }
  }

  #[tokio::test]
  async fn cid_longer_than_limit() {
    let cid = Cid::new_v1(0x55, car_wire::Multihash::wrap(0x12, &[7; 32]));
    let bytes = cid.to_bytes();
    let mut reader = bytes.as_slice();
    let mut buf = Vec::new();

    let result = read_cid(&mut reader, 10, &mut buf).await;
    assert!(matches!(
      result,
      Err(ReadFailure::Wire(WireError::TruncatedIdentifier { declared: 32, available: 6 }))
    ));
  }
}
