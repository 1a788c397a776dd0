#![no_main]

use libfuzzer_sys::fuzz_target;
use car_wire::Cid;

// Fuzz target: binary and textual CID parsing.
//
// Catches bugs in:
// - v0 shape detection
// - Digest length overruns
// - Base32 / base58 text handling
fuzz_target!(|data: &[u8]| {
    if let Ok((cid, consumed)) = Cid::read_bytes(data) {
        assert_eq!(cid.to_bytes().as_slice(), &data[..consumed]);

        let text = cid.to_string();
        assert_eq!(text.parse::<Cid>().unwrap(), cid);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = text.parse::<Cid>();
    }
});
