//! # Reference Message Types
//!
//! Ready-made messages for an HTTP-over-RPC envelope and the int-or-string union used by
//! resource schemas. They double as worked examples of field tables.
//!
//! ```text
//! HttpRequest  { 1: method string, 2: url string, 3: headers [Header], 4: body bytes }
//! HttpResponse { 1: code int32, 2: headers [Header], 3: body bytes }
//! Header       { 1: key string, 2: values [string] }
//! IntOrString  { 1: type int64, 2: int_val int32, 3: str_val string }
//! ```
//!
//! The HTTP types leave zero values off the wire. `IntOrString` writes all three fields
//! every time, so a zero integer and an empty string are still encoded.

use crate::message::field::{FieldDescriptor, Presence, Repeated, RepeatedMessage, Singular};
use crate::message::scalar::{Bytes, Int32, Int64, Str};
use crate::message::Message;

/// HTTP request carried as a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Message for HttpRequest {
    const NAME: &'static str = "HttpRequest";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            number: 1,
            name: "method",
            access: &Singular::<Str, Self> {
                get: |m| &m.method,
                get_mut: |m| &mut m.method,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 2,
            name: "url",
            access: &Singular::<Str, Self> {
                get: |m| &m.url,
                get_mut: |m| &mut m.url,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 3,
            name: "headers",
            access: &RepeatedMessage::<Header, Self> {
                get: |m| &m.headers,
                get_mut: |m| &mut m.headers,
            },
        },
        FieldDescriptor {
            number: 4,
            name: "body",
            access: &Singular::<Bytes, Self> {
                get: |m| &m.body,
                get_mut: |m| &mut m.body,
                presence: Presence::Implicit,
            },
        },
    ];
}

/// HTTP response carried as a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub code: i32,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Message for HttpResponse {
    const NAME: &'static str = "HttpResponse";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            number: 1,
            name: "code",
            access: &Singular::<Int32, Self> {
                get: |m| &m.code,
                get_mut: |m| &mut m.code,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 2,
            name: "headers",
            access: &RepeatedMessage::<Header, Self> {
                get: |m| &m.headers,
                get_mut: |m| &mut m.headers,
            },
        },
        FieldDescriptor {
            number: 3,
            name: "body",
            access: &Singular::<Bytes, Self> {
                get: |m| &m.body,
                get_mut: |m| &mut m.body,
                presence: Presence::Implicit,
            },
        },
    ];
}

/// One header name with all of its values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub values: Vec<String>,
}

impl Header {
    pub fn new(key: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Message for Header {
    const NAME: &'static str = "Header";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            number: 1,
            name: "key",
            access: &Singular::<Str, Self> {
                get: |m| &m.key,
                get_mut: |m| &mut m.key,
                presence: Presence::Implicit,
            },
        },
        FieldDescriptor {
            number: 2,
            name: "values",
            access: &Repeated::<Str, Self> {
                get: |m| &m.values,
                get_mut: |m| &mut m.values,
                packed: false,
            },
        },
    ];
}

/// Which arm of an [`IntOrString`] is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntOrStringKind {
    Int,
    String,
}

/// A value that is either an `int32` or a string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntOrString {
    /// 0 for int, 1 for string
    pub kind: i64,
    pub int_val: i32,
    pub str_val: String,
}

impl IntOrString {
    pub const INT: i64 = 0;
    pub const STRING: i64 = 1;

    pub fn from_int(value: i32) -> Self {
        Self {
            kind: Self::INT,
            int_val: value,
            str_val: String::new(),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: Self::STRING,
            int_val: 0,
            str_val: value.into(),
        }
    }

    /// Set arm, or `None` for an unrecognized type value
    pub fn kind(&self) -> Option<IntOrStringKind> {
        match self.kind {
            Self::INT => Some(IntOrStringKind::Int),
            Self::STRING => Some(IntOrStringKind::String),
            _ => None,
        }
    }
}

impl Message for IntOrString {
    const NAME: &'static str = "IntOrString";
    const FIELDS: &'static [FieldDescriptor<Self>] = &[
        FieldDescriptor {
            number: 1,
            name: "type",
            access: &Singular::<Int64, Self> {
                get: |m| &m.kind,
                get_mut: |m| &mut m.kind,
                presence: Presence::Always,
            },
        },
        FieldDescriptor {
            number: 2,
            name: "int_val",
            access: &Singular::<Int32, Self> {
                get: |m| &m.int_val,
                get_mut: |m| &mut m.int_val,
                presence: Presence::Always,
            },
        },
        FieldDescriptor {
            number: 3,
            name: "str_val",
            access: &Singular::<Str, Self> {
                get: |m| &m.str_val,
                get_mut: |m| &mut m.str_val,
                presence: Presence::Always,
            },
        },
    ];
}
