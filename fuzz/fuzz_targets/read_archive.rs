#![no_main]

use libfuzzer_sys::fuzz_target;
use car_decoder::{CarReader, StreamingDecoder};

// Fuzz target: whole-archive parsing with both readers.
//
// The indexed reader succeeds exactly when the streaming reader gets
// through the input without an error, and then both see the same blocks.
fuzz_target!(|data: &[u8]| {
    let indexed = CarReader::from_bytes(data.to_vec());

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let (streamed, failed) = rt.block_on(async {
        let mut stream = StreamingDecoder::new(data);
        let mut blocks = Vec::new();
        while let Some(next) = stream.next().await {
            match next {
                Ok(block) => blocks.push(block),
                Err(_) => return (blocks, true),
            }
        }
        (blocks, false)
    });

    match indexed {
        Ok(reader) => {
            assert!(!failed);
            assert_eq!(reader.into_blocks(), streamed);
        }
        Err(_) => assert!(failed),
    }
});
