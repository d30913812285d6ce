//! Example: Walking Through the Wire Format
//!
//! This example encodes a request, prints every field record it produced, and then decodes
//! the bytes with an older schema that only knows some of the fields.
//!
//! Run with: `cargo run --example wire_walkthrough`

#![allow(clippy::uninlined_format_args)]

use protowire::config::LoggingConfig;
use protowire::core::cursor::{DecodeContext, Reader};
use protowire::core::skip::skip_tagged_field;
use protowire::message::field::{FieldDescriptor, Presence, Singular};
use protowire::message::scalar::Str;
use protowire::message::types::{Header, HttpRequest};
use protowire::utils::logging::init_logging;
use protowire::{Message, UnknownFields};

/// An older view of `HttpRequest` that only knows the URL
#[derive(Debug, Default)]
struct UrlOnly {
    url: String,
    unknown: UnknownFields,
}

impl Message for UrlOnly {
    const NAME: &'static str = "UrlOnly";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor {
        number: 2,
        name: "url",
        access: &Singular::<Str, Self> {
            get: |m| &m.url,
            get_mut: |m| &mut m.url,
            presence: Presence::Implicit,
        },
    }];

    fn unknown_fields(&self) -> Option<&UnknownFields> {
        Some(&self.unknown)
    }

    fn unknown_fields_mut(&mut self) -> Option<&mut UnknownFields> {
        Some(&mut self.unknown)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::default())?;

    println!("=== Wire Format Walkthrough ===\n");

    let request = HttpRequest {
        method: "GET".to_string(),
        url: "/x".to_string(),
        headers: vec![Header::new("Accept", ["*/*"])],
        body: vec![0x01, 0x02],
    };
    println!("Message: {:?}", request);
    println!("Size:    {} bytes", request.encoded_len());

    let bytes = request.marshal()?;
    println!("Hex:     {:02x?}\n", bytes);

    println!("Records:");
    let mut reader = Reader::new(&bytes);
    while !reader.is_empty() {
        let offset = reader.position();
        let tag = reader.clone().read_tag()?;
        let record = skip_tagged_field(&mut reader, DecodeContext::default())?;
        println!(
            "  @{:<3} field {:<2} {:<16} {:02x?}",
            offset,
            tag.field_number,
            tag.wire_type.to_string(),
            record
        );
    }
    println!();

    let decoded = HttpRequest::unmarshal(&bytes)?;
    println!(
        "Full decode:    {}",
        if decoded == request { "matches" } else { "differs" }
    );

    let partial = UrlOnly::unmarshal(&bytes)?;
    println!("Partial decode: url = {:?}", partial.url);
    println!(
        "                {} unknown bytes kept for re-encoding",
        partial.unknown.encoded_len()
    );

    let reencoded = partial.marshal()?;
    let restored = HttpRequest::unmarshal(&reencoded)?;
    println!(
        "Re-encoded through the old schema: {}",
        if restored == request {
            "nothing lost"
        } else {
            "fields lost"
        }
    );

    Ok(())
}
