#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use car_decoder::CarReader;
use car_encoder::CarEncoder;
use car_types::{Block, Sha2_256Hasher, codec};

// Fuzz target: encoder → indexed reader roundtrip.
//
// Builds an archive from arbitrary payloads and root picks, then checks
// that roots, order and payloads come back unchanged.
#[derive(Debug, Arbitrary)]
struct Input {
    payloads: Vec<Vec<u8>>,
    roots: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let blocks: Vec<Block> = input
        .payloads
        .into_iter()
        .map(|p| Block::encode(codec::RAW, &Sha2_256Hasher, p))
        .collect();
    if blocks.is_empty() {
        return;
    }
    let roots: Vec<_> = input
        .roots
        .iter()
        .take(16)
        .map(|&i| blocks[usize::from(i) % blocks.len()].cid.clone())
        .collect();

    let mut enc = CarEncoder::new(roots.clone());
    for block in &blocks {
        enc.add(block.clone());
    }
    let bytes = enc.encode().unwrap();

    let reader = CarReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.roots(), roots.as_slice());
    assert_eq!(reader.into_blocks(), blocks);
});
