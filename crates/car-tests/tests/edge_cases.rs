//! Edge case integration tests for the CAR readers and writer.
//!
//! - **Truncation**: an archive cut anywhere must fail the indexed reader
//!   outright, while the streaming reader yields every complete frame
//!   before reporting the damage.
//!
//! - **Duplicates**: the same CID framed twice is valid. Lookups return the
//!   first occurrence; iteration returns both.
//!
//! - **Dangling roots**: roots are references, not obligations. A root
//!   without a matching frame reads fine.
//!
//! - **Bad headers**: wrong version, wrong shape, and a v0 identifier
//!   spelled with an explicit version all fail at the header.

use std::path::Path;

use car_decoder::{CarReader, DecodeError, ReaderConfig, StreamingDecoder};
use car_encoder::{CarWriter, EncodeError};
use car_types::{Block, Sha2_256Hasher, TypeError, codec};
use car_wire::varint::push_varint;
use car_wire::{CarHeader, Cid, Multihash, VarintError, WireError};

fn golden(name: &str) -> Vec<u8> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let path = manifest_dir.join("tests/golden").join(format!("{name}.car"));
    std::fs::read(&path)
        .unwrap_or_else(|e| panic!("failed to read golden fixture {}: {e}", path.display()))
}

fn raw(data: &'static [u8]) -> Block {
    Block::encode(codec::RAW, &Sha2_256Hasher, data)
}

/// Hand-assemble a header from an arbitrary DAG-CBOR body.
fn with_header_body(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    push_varint(&mut out, body.len() as u64);
    out.extend_from_slice(body);
    out
}

// ── The canonical example ─────────────────────────────────────────────────────

#[tokio::test]
async fn hello_example() {
    let root = raw(b"hello");
    let block = raw(b"random meaningless bytes");
    assert_eq!(
        root.cid.to_string(),
        "bafkreibm6jg3ux5qumhcn2b3flc3tyu6dmlb4xa7u5bf44yegnrjhc4yeq"
    );
    assert_eq!(
        block.cid.to_string(),
        "bafkreihwkf6mtnjobdqrkiksr7qhp6tiiqywux64aylunbvmfhzeql2coa"
    );

    let mut writer = CarWriter::new(Vec::new(), vec![root.cid.clone()]).unwrap();
    writer.put_block(&block).await.unwrap();
    let bytes = writer.finish().await.unwrap();
    assert_eq!(bytes, golden("hello"));

    let reader = CarReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.roots(), &[root.cid.clone()]);
    assert!(!reader.has(&root.cid));
    assert_eq!(
        reader.get(&block.cid).map(|b| &b.data[..]),
        Some(&b"random meaningless bytes"[..])
    );
}

// ── Truncation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_truncation_point_is_detected() {
    let full = golden("multi_block");
    // Frame boundaries from the multi_block snapshot
    let boundaries = [100usize, 142, 183, 225, 267, 304];

    for cut in 1..full.len() {
        let bytes = &full[..cut];

        let indexed = CarReader::from_bytes(bytes.to_vec());
        let mut stream = StreamingDecoder::new(bytes);
        let mut yielded = 0;
        let mut stream_err = None;
        while let Some(next) = stream.next().await {
            match next {
                Ok(_) => yielded += 1,
                Err(e) => stream_err = Some(e),
            }
        }

        if cut < boundaries[0] {
            assert!(
                matches!(indexed, Err(DecodeError::InvalidHeader(_))),
                "cut {cut}: {indexed:?}"
            );
            assert!(matches!(stream_err, Some(DecodeError::InvalidHeader(_))));
        } else if boundaries.contains(&cut) {
            // A clean cut between frames is a shorter, valid archive
            let complete = boundaries.iter().position(|&b| b == cut).unwrap();
            assert_eq!(indexed.unwrap().len(), complete, "cut {cut}");
            assert_eq!(yielded, complete);
            assert!(stream_err.is_none());
        } else {
            let complete = boundaries.iter().filter(|&&b| b < cut).count() - 1;
            assert!(
                matches!(indexed, Err(DecodeError::MalformedArchive { .. })),
                "cut {cut}: {indexed:?}"
            );
            assert_eq!(yielded, complete, "cut {cut}");
            assert!(
                matches!(stream_err, Some(DecodeError::MalformedArchive { .. })),
                "cut {cut}: {stream_err:?}"
            );
        }
    }
}

#[tokio::test]
async fn streaming_keeps_blocks_yielded_before_damage() {
    let mut bytes = golden("hello");
    bytes.extend_from_slice(&[0x80]); // dangling continuation byte

    let mut stream = StreamingDecoder::new(bytes.as_slice());
    let first = stream.next().await.unwrap().unwrap();
    let err = stream.next().await.unwrap().unwrap_err();

    assert_eq!(&first.data[..], b"random meaningless bytes");
    assert!(matches!(
        err,
        DecodeError::MalformedArchive {
            offset: 120,
            source: WireError::MalformedVarint(VarintError::Truncated { .. }),
        }
    ));
    assert!(stream.next().await.is_none());
}

// ── Duplicates and dangling roots ─────────────────────────────────────────────

#[test]
fn duplicate_cids_first_wins() {
    let bytes = golden("multi_block");
    let reader = CarReader::from_bytes(bytes).unwrap();
    let alpha = raw(b"alpha");

    assert_eq!(reader.len(), 5);
    assert_eq!(reader.cids().filter(|c| **c == alpha.cid).count(), 2);
    assert_eq!(reader.get(&alpha.cid), Some(&alpha));
}

#[tokio::test]
async fn duplicate_with_different_payload() {
    let original = raw(b"original");
    let imposter = Block::new(original.cid.clone(), &b"imposter"[..]);

    let mut writer = CarWriter::new(Vec::new(), vec![]).unwrap();
    writer.put_block(&original).await.unwrap();
    writer.put_block(&imposter).await.unwrap();
    let bytes = writer.finish().await.unwrap();

    let reader = CarReader::from_bytes(bytes.clone()).unwrap();
    assert_eq!(reader.get(&original.cid), Some(&original));
    assert_eq!(reader.blocks().nth(1), Some(&imposter));

    // Re-hashing catches the second frame: 18-byte header, 45-byte first frame
    let strict = ReaderConfig {
        verify_blocks: true,
        ..ReaderConfig::default()
    };
    let err = CarReader::from_bytes_with_config(bytes, &strict).unwrap_err();
    assert_eq!(err.offset(), Some(63));
    assert!(matches!(
        err,
        DecodeError::Type {
            source: TypeError::DigestMismatch { .. },
            ..
        }
    ));
}

#[test]
fn dangling_root() {
    let reader = CarReader::from_bytes(golden("hello")).unwrap();
    let root = &reader.roots()[0];
    assert!(reader.get(root).is_none());
}

// ── Headers ───────────────────────────────────────────────────────────────────

#[test]
fn version_two_header_rejected() {
    // {"roots": [], "version": 2}
    let body = hex::decode("a265726f6f7473806776657273696f6e02").unwrap();
    let result = CarReader::from_bytes(with_header_body(&body));
    assert!(matches!(
        result,
        Err(DecodeError::InvalidHeader(WireError::UnsupportedVersion { version: 2 }))
    ));
}

#[test]
fn header_missing_roots_rejected() {
    // {"version": 1}
    let body = hex::decode("a16776657273696f6e01").unwrap();
    let result = CarReader::from_bytes(with_header_body(&body));
    assert!(matches!(
        result,
        Err(DecodeError::InvalidHeader(WireError::MalformedHeader { .. }))
    ));
}

#[test]
fn header_not_a_map_rejected() {
    // [1]
    let result = CarReader::from_bytes(with_header_body(&[0x81, 0x01]));
    assert!(matches!(
        result,
        Err(DecodeError::InvalidHeader(WireError::MalformedHeader { .. }))
    ));
}

#[test]
fn explicit_version_zero_identifier_rejected() {
    let mut bytes = CarHeader::new(vec![]).to_bytes().unwrap();
    // version 0, then something that looks like a v0 multihash
    let mut section = vec![0x00, 0x12, 0x20];
    section.extend_from_slice(&[0u8; 32]);
    push_varint(&mut bytes, section.len() as u64);
    bytes.extend_from_slice(&section);

    assert!(matches!(
        CarReader::from_bytes(bytes),
        Err(DecodeError::MalformedArchive {
            source: WireError::UnknownVersion { version: 0 },
            ..
        })
    ));
}

#[test]
fn non_minimal_length_prefix_rejected() {
    let mut bytes = CarHeader::new(vec![]).to_bytes().unwrap();
    let offset = bytes.len() as u64;
    bytes.extend_from_slice(&[0x81, 0x00]);

    match CarReader::from_bytes(bytes) {
        Err(DecodeError::MalformedArchive {
            offset: at,
            source: WireError::MalformedVarint(VarintError::NotMinimal),
        }) => assert_eq!(at, offset),
        other => panic!("expected NotMinimal, got {other:?}"),
    }
}

// ── Writer misuse ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn closed_writer_refuses_work() {
    let mut writer = CarWriter::new(Vec::new(), vec![]).unwrap();
    writer.close().await.unwrap();

    assert!(matches!(
        writer.put_block(&raw(b"late")).await,
        Err(EncodeError::WriterClosed)
    ));
    assert!(matches!(writer.close().await, Err(EncodeError::AlreadyClosed)));
}

#[tokio::test]
async fn abandoned_channel_reader() {
    let (mut writer, output) = CarWriter::create(vec![]).unwrap();
    drop(output);
    assert!(matches!(
        writer.put_block(&raw(b"nobody listening")).await,
        Err(EncodeError::Io(_))
    ));
}

#[test]
fn oversized_digest_in_frame_rejected_by_table() {
    let cid = Cid::new_v1(codec::RAW, Multihash::wrap(0x12, &[0; 33]));
    let bytes = car_encoder::CarEncoder::new(vec![])
        .add_block(cid, &b"x"[..])
        .encode()
        .unwrap();

    assert!(matches!(
        CarReader::from_bytes(bytes),
        Err(DecodeError::DigestLength { offset: 18, .. })
    ));
}
