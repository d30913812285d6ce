//! Property-based tests using proptest
//!
//! These tests validate codec invariants across a wide range of randomly
//! generated messages and byte strings.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use protowire::core::varint::{
    decode_varint, encode_varint, encoded_len_varint, encoded_len_zigzag64, zigzag_decode32,
    zigzag_decode64, zigzag_encode32, zigzag_encode64, MAX_VARINT_LEN,
};
use protowire::message::field::{
    FieldDescriptor, Nested, Optional, Presence, Repeated, RepeatedMessage, Singular,
};
use protowire::message::scalar::{
    Bool, Bytes, Double, Fixed32, Fixed64, Int32, SInt32, SInt64, Str, UInt32, UInt64,
};
use protowire::message::types::{Header, HttpRequest};
use protowire::Message;

#[derive(Debug, Clone, Default, PartialEq)]
struct Sample {
    id: i32,
    delta: i64,
    flag: bool,
    checksum: u32,
    ratio: f64,
    name: String,
    payload: Vec<u8>,
    readings: Vec<i32>,
    ids: Vec<u64>,
    limit: Option<u32>,
    request: Option<HttpRequest>,
    history: Vec<HttpRequest>,
    trailer: u64,
}

impl Message for Sample {
    const NAME: &'static str = "Sample";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            number: 1,
            name: "id",
            access: &Singular::<Int32, Self> {
                get: |m| &m.id,
                get_mut: |m| &mut m.id,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 2,
            name: "delta",
            access: &Singular::<SInt64, Self> {
                get: |m| &m.delta,
                get_mut: |m| &mut m.delta,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 3,
            name: "flag",
            access: &Singular::<Bool, Self> {
                get: |m| &m.flag,
                get_mut: |m| &mut m.flag,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 4,
            name: "checksum",
            access: &Singular::<Fixed32, Self> {
                get: |m| &m.checksum,
                get_mut: |m| &mut m.checksum,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 5,
            name: "ratio",
            access: &Singular::<Double, Self> {
                get: |m| &m.ratio,
                get_mut: |m| &mut m.ratio,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 6,
            name: "name",
            access: &Singular::<Str, Self> {
                get: |m| &m.name,
                get_mut: |m| &mut m.name,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 7,
            name: "payload",
            access: &Singular::<Bytes, Self> {
                get: |m| &m.payload,
                get_mut: |m| &mut m.payload,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 8,
            name: "readings",
            access: &Repeated::<SInt32, Self> {
                get: |m| &m.readings,
                get_mut: |m| &mut m.readings,
                packed: true,
            },
        },
        FieldDescriptor {
            number: 9,
            name: "ids",
            access: &Repeated::<UInt64, Self> {
                get: |m| &m.ids,
                get_mut: |m| &mut m.ids,
                packed: false,
            },
        },
        FieldDescriptor {
            number: 10,
            name: "limit",
            access: &Optional::<UInt32, Self> {
                get: |m| &m.limit,
                get_mut: |m| &mut m.limit,
            },
        },
        FieldDescriptor {
            number: 16,
            name: "request",
            access: &Nested::<HttpRequest, Self> {
                get: |m| &m.request,
                get_mut: |m| &mut m.request,
            },
        },
        FieldDescriptor {
            number: 2048,
            name: "history",
            access: &RepeatedMessage::<HttpRequest, Self> {
                get: |m| &m.history,
                get_mut: |m| &mut m.history,
            },
        },
        FieldDescriptor {
            number: 536_870_911,
            name: "trailer",
            access: &Singular::<Fixed64, Self> {
                get: |m| &m.trailer,
                get_mut: |m| &mut m.trailer,
                presence: Presence::Implicit,
            },
        },
    ];
}

prop_compose! {
    fn arb_header()(
        key in "[A-Za-z-]{0,12}",
        values in prop::collection::vec(".{0,8}", 0..3),
    ) -> Header {
        Header { key, values }
    }
}

prop_compose! {
    fn arb_request()(
        method in "[A-Z]{0,7}",
        url in "/[a-z0-9/]{0,20}",
        headers in prop::collection::vec(arb_header(), 0..3),
        body in prop::collection::vec(any::<u8>(), 0..64),
    ) -> HttpRequest {
        HttpRequest { method, url, headers, body }
    }
}

prop_compose! {
    fn arb_scalars()(
        id in any::<i32>(),
        delta in any::<i64>(),
        flag in any::<bool>(),
        checksum in any::<u32>(),
        ratio in -1.0e12..1.0e12f64,
        name in ".{0,24}",
        payload in prop::collection::vec(any::<u8>(), 0..128),
    ) -> Sample {
        Sample { id, delta, flag, checksum, ratio, name, payload, ..Sample::default() }
    }
}

prop_compose! {
    fn arb_sample()(
        base in arb_scalars(),
        readings in prop::collection::vec(any::<i32>(), 0..16),
        ids in prop::collection::vec(any::<u64>(), 0..8),
        limit in prop::option::of(any::<u32>()),
        request in prop::option::of(arb_request()),
        history in prop::collection::vec(arb_request(), 0..3),
        trailer in any::<u64>(),
    ) -> Sample {
        Sample { readings, ids, limit, request, history, trailer, ..base }
    }
}

// Property: Any message survives marshal then unmarshal unchanged
proptest! {
    #[test]
    fn prop_message_roundtrip(sample in arb_sample()) {
        let bytes = sample.marshal().expect("Marshal should not fail");
        let decoded = Sample::unmarshal(&bytes).expect("Unmarshal should not fail");
        prop_assert_eq!(decoded, sample);
    }
}

// Property: Size is exact
proptest! {
    #[test]
    fn prop_size_is_exact(sample in arb_sample()) {
        let size = sample.encoded_len();
        let mut buf = vec![0u8; size];
        let written = sample.marshal_to(&mut buf).expect("Exact buffer should be enough");
        prop_assert_eq!(written, size);

        if size > 0 {
            let mut short = vec![0u8; size - 1];
            prop_assert!(sample.marshal_to(&mut short).is_err());
        }
    }
}

// Property: Encoding is deterministic
proptest! {
    #[test]
    fn prop_encoding_deterministic(sample in arb_sample()) {
        let first = sample.marshal().expect("marshal");
        let second = sample.clone().marshal().expect("marshal");
        prop_assert_eq!(first, second);
    }
}

/// Every field of `partial` is either unset or what `full` holds; repeated fields are a prefix
fn holds_subset_of(partial: &Sample, full: &Sample) -> bool {
    fn same_or_default<T: PartialEq + Default>(got: &T, want: &T) -> bool {
        *got == T::default() || got == want
    }

    same_or_default(&partial.id, &full.id)
        && same_or_default(&partial.delta, &full.delta)
        && same_or_default(&partial.flag, &full.flag)
        && same_or_default(&partial.checksum, &full.checksum)
        && same_or_default(&partial.ratio, &full.ratio)
        && same_or_default(&partial.name, &full.name)
        && same_or_default(&partial.payload, &full.payload)
        && full.readings.starts_with(&partial.readings)
        && full.ids.starts_with(&partial.ids)
        && same_or_default(&partial.limit, &full.limit)
        && same_or_default(&partial.request, &full.request)
        && full.history.starts_with(&partial.history)
        && same_or_default(&partial.trailer, &full.trailer)
}

// Property: Every prefix of a valid encoding decodes to a subset of the fields or fails
// cleanly with a truncation error
proptest! {
    #[test]
    fn prop_truncation_is_safe(sample in arb_sample(), cut in any::<prop::sample::Index>()) {
        let bytes = sample.marshal().expect("marshal");
        prop_assume!(!bytes.is_empty());
        let cut = cut.index(bytes.len());
        match Sample::unmarshal(&bytes[..cut]) {
            Ok(partial) => prop_assert!(
                holds_subset_of(&partial, &sample),
                "cut {} decoded {:?}", cut, partial
            ),
            Err(e) => prop_assert!(e.is_truncation(), "cut {} gave {:?}", cut, e),
        }
    }
}

// Property: Arbitrary input never panics
proptest! {
    #[test]
    fn prop_arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Sample::unmarshal(&data);
        let _ = HttpRequest::unmarshal(&data);
    }
}

// Property: Varint encode/decode is a bijection with the predicted length
proptest! {
    #[test]
    fn prop_varint_roundtrip(value in any::<u64>()) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let end = encode_varint(value, &mut buf, 0).expect("10 bytes always fit");
        prop_assert_eq!(end, encoded_len_varint(value));
        prop_assert_eq!(decode_varint(&buf[..end], 0).expect("decode"), (value, end));
    }
}

// Property: Zigzag is a bijection and keeps small magnitudes small
proptest! {
    #[test]
    fn prop_zigzag_roundtrip(v64 in any::<i64>(), v32 in any::<i32>()) {
        prop_assert_eq!(zigzag_decode64(zigzag_encode64(v64)), v64);
        prop_assert_eq!(zigzag_decode32(zigzag_encode32(v32)), v32);
        prop_assert_eq!(encoded_len_zigzag64(v64), encoded_len_varint(zigzag_encode64(v64)));
        prop_assert!(zigzag_encode64(v64) <= v64.unsigned_abs().saturating_mul(2));
    }
}

// Property: Concatenated encodings merge (repeated fields append, scalars take the last)
proptest! {
    #[test]
    fn prop_concatenation_merges(a in arb_sample(), b in arb_sample()) {
        let mut bytes = a.marshal().expect("marshal a");
        bytes.extend(b.marshal().expect("marshal b"));
        let merged = Sample::unmarshal(&bytes).expect("unmarshal");

        let mut readings = a.readings.clone();
        readings.extend(&b.readings);
        let mut history = a.history.clone();
        history.extend(b.history.iter().cloned());

        prop_assert_eq!(merged.readings, readings);
        prop_assert_eq!(merged.history, history);
        prop_assert_eq!(merged.limit, b.limit.or(a.limit));
        prop_assert_eq!(merged.trailer, if b.trailer != 0 { b.trailer } else { a.trailer });
    }
}
