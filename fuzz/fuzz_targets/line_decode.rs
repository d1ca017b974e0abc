//! Fuzz test for inbound line decoding
//!
//! Feeds arbitrary bytes to the line reader and checks that every decoded
//! line is within the length limit and free of line breaks.

#![no_main]

use lanchat_core::LineReader;
use libfuzzer_sys::fuzz_target;

const LIMIT: usize = 256;

fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime.block_on(async {
        let mut reader = LineReader::with_max_line_length(data, LIMIT);
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    assert!(!line.as_str().contains(['\n', '\r']));
                    // Lossy decoding may widen each byte to U+FFFD
                    assert!(line.len() <= LIMIT * 3);
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }
    });
});
