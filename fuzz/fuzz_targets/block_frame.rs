#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use car_wire::BlockFrame;

// Fuzz target: BlockFrame::read_from frame parsing.
//
// Catches bugs in:
// - Length prefixes larger than the input
// - Sections shorter than their CID
// - Zero-copy slicing bounds
fuzz_target!(|data: &[u8]| {
    let buf = Bytes::copy_from_slice(data);
    if let Ok((frame, consumed)) = BlockFrame::read_from(&buf) {
        assert_eq!(frame.encoded_len(), consumed);
    }
});
