#![no_main]

use libfuzzer_sys::fuzz_target;
use protowire::message::types::{HttpRequest, HttpResponse, IntOrString};
use protowire::Message;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic; whatever decodes must re-encode to its size
    if let Ok(request) = HttpRequest::unmarshal(data) {
        let bytes = request.marshal().expect("decoded message re-encodes");
        assert_eq!(bytes.len(), request.encoded_len());
    }
    let _ = HttpResponse::unmarshal(data);
    let _ = IntOrString::unmarshal(data);
});
