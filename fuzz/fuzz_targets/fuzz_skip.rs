#![no_main]

use libfuzzer_sys::fuzz_target;
use protowire::core::cursor::{DecodeContext, Reader};
use protowire::core::skip::skip_tagged_field;

fuzz_target!(|data: &[u8]| {
    // Skipping walks forward or fails; it never reads past the input
    let mut reader = Reader::new(data);
    while !reader.is_empty() {
        let before = reader.position();
        match skip_tagged_field(&mut reader, DecodeContext::default()) {
            Ok(span) => assert_eq!(span.len(), reader.position() - before),
            Err(_) => break,
        }
    }
});
