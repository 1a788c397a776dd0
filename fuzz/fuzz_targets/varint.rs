#![no_main]

use libfuzzer_sys::fuzz_target;
use car_wire::varint::{decode_varint, push_varint};

// Fuzz target: varint decoding.
//
// Anything that decodes must re-encode to exactly the bytes consumed,
// since non-minimal encodings are rejected.
fuzz_target!(|data: &[u8]| {
    if let Ok((value, consumed)) = decode_varint(data) {
        let mut out = Vec::new();
        push_varint(&mut out, value);
        assert_eq!(out.as_slice(), &data[..consumed]);
    }
});
