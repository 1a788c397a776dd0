use bytes::Bytes;
use car_types::{Block, Hasher, codec};
use car_wire::{BlockFrame, CarHeader, Cid};

use crate::error::EncodeError;

/// In-memory archive builder.
///
/// The synchronous counterpart to [`CarWriter`](crate::CarWriter): blocks
/// are collected with chainable `add_*` calls and serialized in one go by
/// [`encode`](Self::encode). Useful for tests, fixtures and small
/// archives that fit in memory.
///
/// ```rust
/// use car_encoder::CarEncoder;
/// use car_types::Sha2_256Hasher;
///
/// let archive = CarEncoder::new(vec![])
///     .add_raw(&Sha2_256Hasher, &b"hello"[..])
///     .add_raw(&Sha2_256Hasher, &b"world"[..])
///     .encode()
///     .unwrap();
/// assert!(!archive.is_empty());
/// ```
///
/// Output layout is identical to what `CarWriter` produces for the same
/// roots and puts:
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────┐
/// │ varint + map │ Header {roots, version: 1}               │
/// │ [N bytes]    │ Block 0 frame (len + cid + data)         │
/// │ [N bytes]    │ Block 1 frame ...                        │
/// └──────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug)]
pub struct CarEncoder {
    header: CarHeader,
    blocks: Vec<Block>,
}

impl CarEncoder {
    #[must_use]
    pub fn new(roots: Vec<Cid>) -> Self {
        Self {
            header: CarHeader::new(roots),
            blocks: Vec::new(),
        }
    }

    /// Append a root to the header.
    pub fn add_root(&mut self, cid: Cid) -> &mut Self {
        self.header.roots.push(cid);
        self
    }

    /// Append a block with a caller-supplied CID.
    pub fn add_block(&mut self, cid: Cid, data: impl Into<Bytes>) -> &mut Self {
        self.blocks.push(Block::new(cid, data));
        self
    }

    pub fn add(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Hash `data` with `hasher` and append it as a raw-codec block.
    pub fn add_raw(&mut self, hasher: &dyn Hasher, data: impl Into<Bytes>) -> &mut Self {
        self.blocks.push(Block::encode(codec::RAW, hasher, data));
        self
    }

    #[must_use]
    pub fn roots(&self) -> &[Cid] {
        &self.header.roots
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Serialize the header and every block into a fresh buffer.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Wire`] if the header cannot be encoded.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_to(&mut out)?;
        Ok(out)
    }

    /// Serialize into any `std::io::Write`.
    ///
    /// # Returns
    ///
    /// Total number of bytes written.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Wire`] if the header cannot be encoded or the writer
    /// fails.
    pub fn encode_to(&self, w: &mut impl std::io::Write) -> Result<usize, EncodeError> {
        let mut written = self.header.write_to(w)?;
        for block in &self.blocks {
            written += BlockFrame::new(block.cid.clone(), block.data.clone()).write_to(w)?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CarWriter;
    use car_decoder::CarReader;
    use car_types::{Blake3Hasher, Sha2_256Hasher};

    #[test]
    fn empty_archive_is_header_only() {
        let bytes = CarEncoder::new(vec![]).encode().unwrap();
        assert_eq!(bytes, CarHeader::new(vec![]).to_bytes().unwrap());
    }

    #[test]
    fn encode_to_reports_length() {
        let mut enc = CarEncoder::new(vec![]);
        enc.add_raw(&Sha2_256Hasher, &b"abc"[..]);

        let mut out = Vec::new();
        let n = enc.encode_to(&mut out).unwrap();
        assert_eq!(n, out.len());
    }

    #[test]
    fn builder_chains() {
        let root = Block::encode(codec::DAG_CBOR, &Blake3Hasher, &b"root"[..]);
        let mut enc = CarEncoder::new(vec![]);
        enc.add_root(root.cid.clone())
            .add(root.clone())
            .add_raw(&Sha2_256Hasher, &b"leaf"[..]);

        assert_eq!(enc.len(), 2);
        assert_eq!(enc.roots(), &[root.cid.clone()]);

        let reader = CarReader::from_bytes(enc.encode().unwrap()).unwrap();
        assert_eq!(reader.get(&root.cid), Some(&root));
    }

    #[tokio::test]
    async fn matches_async_writer_output() {
        let a = Block::encode(codec::RAW, &Sha2_256Hasher, &b"a"[..]);
        let b = Block::encode(codec::RAW, &Sha2_256Hasher, &b"b"[..]);

        let sync_bytes = CarEncoder::new(vec![a.cid.clone()])
            .add(a.clone())
            .add(b.clone())
            .encode()
            .unwrap();

        let mut writer = CarWriter::new(Vec::new(), vec![a.cid.clone()]).unwrap();
        writer.put_block(&a).await.unwrap();
        writer.put_block(&b).await.unwrap();
        let async_bytes = writer.finish().await.unwrap();

        assert_eq!(sync_bytes, async_bytes);
    }
}
