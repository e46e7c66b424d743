//! LiteVector (LTV): a compact, self-describing binary serialization
//! format with typed numeric vectors and natural alignment.
//!
//! Every element is framed as a tag byte (a 4-bit type code and a 4-bit
//! size code), an optional little-endian length field, and a little-endian
//! payload. Vector payloads of 2/4/8-byte element types are padded onto
//! naturally aligned offsets with no-op bytes, so decoders on aligned
//! architectures can cast payloads in place.
//!
//! The crate provides:
//! - [Encoder] / [StreamEncoder]: one-pass encoders sharing the [LtvWrite]
//!   surface, with goldilocks numeric width selection and alignment
//!   padding.
//! - [Decoder] / [StreamDecoder]: incremental, validating decoders; the
//!   streaming variant annotates each element with its structural role.
//! - [serialize] / [deserialize]: a serde data format binding host values
//!   to LTV containers.
//! - [LtvValue] / [LtvStruct]: generic values for schema-less data, with
//!   struct keys kept in insertion order.

pub mod consts;

mod de;
mod decoder;
mod encoder;
mod err;
mod ser;
mod stack;
mod stream_dec;
mod stream_enc;
mod struct_enc;
mod value;
mod write;

pub use consts::{decode_tag, encode_tag, SizeCode, TypeCode, MAX_NESTING_DEPTH, NOP_TAG};
pub use de::{deserialize, LtvDeserializer};
pub use decoder::{valid, validate, Decoder, Desc};
pub use encoder::Encoder;
pub use err::{LtvError, LtvResult};
pub use ser::{serialize, to_writer, LtvSerializer};
pub use stack::{NestingTracker, Role};
pub use stream_dec::{ElementDesc, StreamDecoder, DEFAULT_MAX_VALUE_LEN};
pub use stream_enc::StreamEncoder;
pub use struct_enc::StructWriter;
pub use value::{LtvStruct, LtvValue};
pub use write::LtvWrite;

use serde::{Deserialize, Serialize};

/// A pre-encoded LTV element, spliced verbatim on serialization and handed
/// back as the raw byte span of one element on deserialization.
///
/// On serialization the bytes are validated first; a buffer that is not a
/// single well-formed element is an error. Alignment inside the splice is
/// relative to the buffer it was encoded into, not the output it lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawLtv<'a> {
    pub bytes: &'a [u8],
}

impl Serialize for RawLtv<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Bytes<'a>(&'a [u8]);

        impl Serialize for Bytes<'_> {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(self.0)
            }
        }

        serializer.serialize_newtype_struct(value::RAW_TOKEN, &Bytes(self.bytes))
    }
}

impl<'de> Deserialize<'de> for RawLtv<'de> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawVisitor;

        impl<'de> serde::de::Visitor<'de> for RawVisitor {
            type Value = RawLtv<'de>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a raw LTV element")
            }

            fn visit_borrowed_bytes<E>(self, v: &'de [u8]) -> Result<Self::Value, E> {
                Ok(RawLtv { bytes: v })
            }
        }

        deserializer.deserialize_newtype_struct(value::RAW_TOKEN, RawVisitor)
    }
}
