//! Fuzz test for directive classification
//!
//! Arbitrary single-line text must classify without panicking, and any
//! accepted port must round-trip through its decimal form.

#![no_main]

use lanchat_core::{Inbound, Message, classify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(line) = Message::new(text) else {
        return;
    };

    match classify(&line) {
        Ok(Inbound::FilePort(port)) => {
            assert_ne!(port, 0);
            assert!(text.starts_with("FILE_PORT:"));
            let digits = &text["FILE_PORT:".len()..];
            assert_eq!(digits.trim_start_matches('0'), port.to_string());
        }
        Ok(Inbound::Chat(_)) => assert!(!text.starts_with("FILE_PORT:")),
        Err(_) => assert!(text.starts_with("FILE_PORT:")),
    }
});
