//! Fuzz target for STUN message decoding
//!
//! Tests that the decoder handles arbitrary datagrams without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use natprobe::Message;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must re-encode without panicking
    if let Ok(message) = Message::decode(data) {
        let _ = message.encode();
    }
});
