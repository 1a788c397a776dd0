use crate::error::{VarintError, WireError};

/// Maximum number of bytes a u64 varint can occupy.
/// ceil(64 / 7) = 10 bytes.
pub const MAX_VARINT_BYTES: usize = 10;

/// Encode a `u64` value as an unsigned LEB128 varint into the provided buffer.
///
/// # Returns
///
/// The number of bytes written (1–10).
///
/// # Panics
///
/// Panics if `buf` is shorter than the required encoding length.
/// A 10-byte buffer is always sufficient for any `u64`.
///
/// # Wire format examples
///
/// | Value   | Encoded bytes        | Length |
/// |---------|----------------------|--------|
/// | 0       | `[0x00]`             | 1      |
/// | 1       | `[0x01]`             | 1      |
/// | 127     | `[0x7F]`             | 1      |
/// | 128     | `[0x80, 0x01]`       | 2      |
/// | 300     | `[0xAC, 0x02]`       | 2      |
/// | 16383   | `[0xFF, 0x7F]`       | 2      |
/// | 16384   | `[0x80, 0x80, 0x01]` | 3      |
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        // Take the lowest 7 bits
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value > 0 {
            // More bytes to come: set the continuation bit
            byte |= 0x80;
        }

        buf[i] = byte;
        i += 1;

        if value == 0 {
            break;
        }
    }
    i
}

/// Number of bytes [`encode_varint`] will produce for `value`.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encode `value` and append it to `out`.
pub fn push_varint(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let n = encode_varint(value, &mut buf);
    out.extend_from_slice(&buf[..n]);
}

/// Encode `value` and write it to `w`.
///
/// # Returns
///
/// The number of bytes written.
///
/// # Errors
///
/// Returns [`WireError::Io`] if the writer fails.
pub fn write_varint(w: &mut impl std::io::Write, value: u64) -> Result<usize, WireError> {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let n = encode_varint(value, &mut buf);
    w.write_all(&buf[..n])?;
    Ok(n)
}

/// Decode an unsigned LEB128 varint from the provided byte slice.
///
/// Only the canonical (shortest) encoding of a value is accepted. Every
/// length prefix and every CID field in an archive goes through here, and
/// rejecting padded encodings keeps one value mapped to one byte string.
///
/// # Returns
///
/// `(decoded_value, bytes_consumed)` on success.
///
/// # Errors
///
/// [`WireError::MalformedVarint`] wrapping:
/// - [`VarintError::TooLong`] if more than 10 bytes are consumed
///   without finding a terminating byte.
/// - [`VarintError::Overflow`] if the 10th byte carries bits above 2^64.
/// - [`VarintError::NotMinimal`] if the final byte is a redundant zero group.
/// - [`VarintError::Truncated`] if the slice ends mid-varint.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(VarintError::TooLong.into());
        }

        // The 10th byte may only contribute the single top bit of a u64
        if i == MAX_VARINT_BYTES - 1 && byte > 0x01 {
            return Err(if byte & 0x80 == 0 {
                VarintError::Overflow
            } else {
                VarintError::TooLong
            }
            .into());
        }

        // Extract the 7 data bits and shift them into position
        let data = u64::from(byte & 0x7F);
        result |= data << shift;
        shift += 7;

        // If MSB is clear, this is the last byte
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(VarintError::NotMinimal.into());
            }
            return Ok((result, i + 1));
        }
    }

    // We ran out of input bytes while MSB was still set
    Err(VarintError::Truncated { offset: buf.len() }.into())
}
