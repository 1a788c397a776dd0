#![no_main]

use libfuzzer_sys::fuzz_target;
use car_wire::CarHeader;

// Fuzz target: length-prefixed DAG-CBOR header parsing.
//
// A header that parses must survive a write/read cycle unchanged.
fuzz_target!(|data: &[u8]| {
    if let Ok((header, _)) = CarHeader::read_from(data) {
        let bytes = header.to_bytes().unwrap();
        let (again, consumed) = CarHeader::read_from(&bytes).unwrap();
        assert_eq!(again, header);
        assert_eq!(consumed, bytes.len());
    }
});
