use bytes::Bytes;

use crate::cid::Cid;
use crate::error::WireError;
use crate::varint::{decode_varint, varint_len, write_varint};

/// Block frame — one `(cid, payload)` record in the archive body.
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │ section_len  (varint) = len(cid) + len(data)     │
/// │ cid          (self-delimiting, v0 or v1)         │
/// │ data         [section_len - len(cid) bytes]      │
/// └──────────────────────────────────────────────────┘
/// ```
///
/// The frame does not check that `data` hashes to `cid`; that is the
/// caller's integrity decision (see `car_types::Block::verify`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockFrame {
    pub cid: Cid,

    /// Payload bytes. When decoded with [`read_from`](Self::read_from) this
    /// is a slice of the input buffer, not a copy.
    pub data: Bytes,
}

impl BlockFrame {
    pub fn new(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    /// Length of the section after the prefix: CID bytes plus payload.
    #[must_use]
    pub fn section_len(&self) -> usize {
        self.cid.encoded_len() + self.data.len()
    }

    /// Total on-wire length including the varint prefix.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let section = self.section_len();
        varint_len(section as u64) + section
    }

    /// Write this frame to the provided writer.
    ///
    /// # Returns
    ///
    /// Total number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Io`] if the writer fails.
    pub fn write_to(&self, w: &mut impl std::io::Write) -> Result<usize, WireError> {
        write_frame(w, &self.cid, &self.data)
    }

    /// Read one frame from the front of `buf`.
    ///
    /// # Returns
    ///
    /// `(frame, bytes_consumed)`. The payload shares `buf`'s allocation.
    ///
    /// # Errors
    ///
    /// - [`WireError::MalformedVarint`] if the length prefix is bad.
    /// - [`WireError::IncompleteFrame`] if fewer bytes remain than the
    ///   prefix declares.
    /// - Any CID error from [`from_section`](Self::from_section).
    pub fn read_from(buf: &Bytes) -> Result<(Self, usize), WireError> {
        let (section_len, cursor) = read_section_len(buf)?;
        let available = buf.len() - cursor;
        if section_len > available {
            return Err(WireError::IncompleteFrame {
                declared: section_len as u64,
                available,
            });
        }

        let end = cursor + section_len;
        let frame = Self::from_section(buf.slice(cursor..end))?;
        Ok((frame, end))
    }

    /// Split a section (the bytes after the length prefix) into CID and
    /// payload.
    ///
    /// # Errors
    ///
    /// [`WireError::TruncatedIdentifier`], [`WireError::UnknownVersion`]
    /// or [`WireError::MalformedVarint`] if the CID at the front of the
    /// section is not well formed.
    pub fn from_section(section: Bytes) -> Result<Self, WireError> {
        let (cid, cid_len) = Cid::read_bytes(&section)?;
        Ok(Self {
            cid,
            data: section.slice(cid_len..),
        })
    }
}

/// Write a frame for `cid` and `data` without building a [`BlockFrame`].
///
/// # Returns
///
/// Total number of bytes written.
///
/// # Errors
///
/// Returns [`WireError::Io`] if the writer fails.
pub fn write_frame(w: &mut impl std::io::Write, cid: &Cid, data: &[u8]) -> Result<usize, WireError> {
    let cid_bytes = cid.to_bytes();
    let section_len = cid_bytes.len() + data.len();

    let n = write_varint(w, section_len as u64)?;
    w.write_all(&cid_bytes)?;
    w.write_all(data)?;

    Ok(n + section_len)
}

/// Decode a frame's length prefix.
///
/// # Returns
///
/// `(section_len, prefix_len)`.
///
/// # Errors
///
/// - [`WireError::MalformedVarint`] if the prefix is bad.
/// - [`WireError::IncompleteFrame`] if the declared length does not fit
///   in `usize`.
pub fn read_section_len(buf: &[u8]) -> Result<(usize, usize), WireError> {
    let (declared, n) = decode_varint(buf)?;
    let section_len = usize::try_from(declared).map_err(|_| WireError::IncompleteFrame {
        declared,
        available: buf.len() - n,
    })?;
    Ok((section_len, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multihash::Multihash;

    fn cid(fill: u8) -> Cid {
        Cid::new_v1(0x55, Multihash::wrap(0x12, &[fill; 32]))
    }

    /// Helper: write a frame to a Vec and return the bytes.
    fn write(frame: &BlockFrame) -> Bytes {
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();
        Bytes::from(buf)
    }

    #[test]
    fn roundtrip_frame() {
        let frame = BlockFrame::new(cid(1), &b"random meaningless bytes"[..]);
        let bytes = write(&frame);
        let (parsed, consumed) = BlockFrame::read_from(&bytes).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(consumed, bytes.len());
        assert_eq!(frame.encoded_len(), bytes.len());
    }

    #[test]
    fn prefix_counts_cid_and_payload() {
        let frame = BlockFrame::new(cid(1), vec![0u8; 10]);
        let bytes = write(&frame);
        // 36-byte CID + 10-byte payload
        assert_eq!(bytes[0], 46);
        assert_eq!(frame.section_len(), 46);
    }

    #[test]
    fn roundtrip_empty_payload() {
        let frame = BlockFrame::new(cid(2), Bytes::new());
        let bytes = write(&frame);
        let (parsed, _) = BlockFrame::read_from(&bytes).unwrap();
        assert!(parsed.data.is_empty());
        assert_eq!(parsed.cid, frame.cid);
    }

    #[test]
    fn roundtrip_large_payload() {
        // 10KB payload to test a multi-byte length prefix
        let frame = BlockFrame::new(cid(3), vec![0xAB; 10_000]);
        let bytes = write(&frame);
        let (parsed, consumed) = BlockFrame::read_from(&bytes).unwrap();
        assert_eq!(parsed.data.len(), 10_000);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn payload_is_zero_copy() {
        let frame = BlockFrame::new(cid(4), &b"shared"[..]);
        let bytes = write(&frame);
        let (parsed, _) = BlockFrame::read_from(&bytes).unwrap();
        let base = bytes.as_ptr() as usize;
        let data = parsed.data.as_ptr() as usize;
        assert!(data > base && data < base + bytes.len());
    }

    #[test]
    fn read_truncated_payload() {
        let frame = BlockFrame::new(cid(5), vec![0xFF; 100]);
        let full = write(&frame);

        // Keep the prefix and CID but only 5 bytes of payload
        let truncated = full.slice(..full.len() - 95);
        let result = BlockFrame::read_from(&truncated);
        assert!(matches!(
            result,
            Err(WireError::IncompleteFrame {
                declared: 136,
                available: 41
            })
        ));
    }

    #[test]
    fn read_section_shorter_than_cid() {
        // Prefix claims 5 bytes; those 5 bytes are the start of a 36-byte CID
        let mut buf = vec![5u8];
        buf.extend_from_slice(&cid(6).to_bytes()[..5]);
        let result = BlockFrame::read_from(&Bytes::from(buf));
        assert!(matches!(result, Err(WireError::TruncatedIdentifier { .. })));
    }

    #[test]
    fn multiple_frames_sequential() {
        let frame1 = BlockFrame::new(cid(7), &b"first"[..]);
        let frame2 = BlockFrame::new(cid(8), &b"second"[..]);

        let mut buf = Vec::new();
        frame1.write_to(&mut buf).unwrap();
        frame2.write_to(&mut buf).unwrap();
        let buf = Bytes::from(buf);

        let (parsed1, consumed1) = BlockFrame::read_from(&buf).unwrap();
        assert_eq!(parsed1, frame1);

        // Read second frame starting where the first ended
        let rest = buf.slice(consumed1..);
        let (parsed2, consumed2) = BlockFrame::read_from(&rest).unwrap();
        assert_eq!(parsed2, frame2);
        assert_eq!(consumed1 + consumed2, buf.len());
    }

    #[test]
    fn v0_cid_frame() {
        let v0 = Cid::new_v0(Multihash::wrap(0x12, &[9; 32])).unwrap();
        let frame = BlockFrame::new(v0, &b"legacy"[..]);
        let bytes = write(&frame);
        assert_eq!(bytes[0], 34 + 6);
        let (parsed, _) = BlockFrame::read_from(&bytes).unwrap();
        assert_eq!(parsed, frame);
    }
}
