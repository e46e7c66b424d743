//! Generic values: the untyped element sum type and the ordered struct
//! container used for generic struct decoding.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::err::{LtvError, LtvResult};
use crate::write::LtvWrite;

/// Newtype token recognized by the mapper: the inner bytes are validated
/// and spliced into the output verbatim.
pub(crate) const RAW_TOKEN: &str = "$ltv_core::private::Raw";

/// Newtype token recognized by the mapper: the inner map is emitted in
/// iteration order instead of being key-sorted.
pub(crate) const ORDERED_TOKEN: &str = "$ltv_core::private::Ordered";

/// Newtype token recognized by the mapper: the inner integer keeps its
/// declared width instead of taking the goldilocks fit.
pub(crate) const EXACT_TOKEN: &str = "$ltv_core::private::Exact";

/// Any decoded LTV element.
///
/// Typed vectors are distinct from [List](Self::List): a `U16` vector and a
/// list of `U16` scalars are different wire forms and round-trip as such.
#[derive(Clone, Debug, PartialEq)]
pub enum LtvValue {
    Nil,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    BoolVec(Vec<bool>),
    U8Vec(Vec<u8>),
    U16Vec(Vec<u16>),
    U32Vec(Vec<u32>),
    U64Vec(Vec<u64>),
    I8Vec(Vec<i8>),
    I16Vec(Vec<i16>),
    I32Vec(Vec<i32>),
    I64Vec(Vec<i64>),
    F32Vec(Vec<f32>),
    F64Vec(Vec<f64>),
    List(Vec<LtvValue>),
    Struct(LtvStruct),
}

impl LtvValue {
    /// Encode this value on its own into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        e.write_value(self);
        e.into_bytes()
    }

    /// Decode a single value from `buf`.
    pub fn decode(buf: &[u8]) -> LtvResult<Self> {
        let mut d = Decoder::new(buf);
        match d.value()? {
            Some(v) => Ok(v),
            None => Err(LtvError::UnexpectedEof),
        }
    }
}

macro_rules! value_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for LtvValue {
            fn from(v: $ty) -> Self {
                Self::$variant(v)
            }
        }
    };
}

value_from! {bool, Bool}
value_from! {u8, U8}
value_from! {u16, U16}
value_from! {u32, U32}
value_from! {u64, U64}
value_from! {i8, I8}
value_from! {i16, I16}
value_from! {i32, I32}
value_from! {i64, I64}
value_from! {f32, F32}
value_from! {f64, F64}
value_from! {String, String}
value_from! {Vec<u8>, U8Vec}
value_from! {Vec<u16>, U16Vec}
value_from! {Vec<u32>, U32Vec}
value_from! {Vec<u64>, U64Vec}
value_from! {Vec<i8>, I8Vec}
value_from! {Vec<i16>, I16Vec}
value_from! {Vec<i32>, I32Vec}
value_from! {Vec<i64>, I64Vec}
value_from! {Vec<f32>, F32Vec}
value_from! {Vec<f64>, F64Vec}
value_from! {Vec<bool>, BoolVec}
value_from! {Vec<LtvValue>, List}
value_from! {LtvStruct, Struct}

impl From<&str> for LtvValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

fn fmt_slice<T: fmt::Display>(f: &mut fmt::Formatter<'_>, v: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in v.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for LtvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::BoolVec(v) => fmt_slice(f, v),
            Self::U8Vec(v) => fmt_slice(f, v),
            Self::U16Vec(v) => fmt_slice(f, v),
            Self::U32Vec(v) => fmt_slice(f, v),
            Self::U64Vec(v) => fmt_slice(f, v),
            Self::I8Vec(v) => fmt_slice(f, v),
            Self::I16Vec(v) => fmt_slice(f, v),
            Self::I32Vec(v) => fmt_slice(f, v),
            Self::I64Vec(v) => fmt_slice(f, v),
            Self::F32Vec(v) => fmt_slice(f, v),
            Self::F64Vec(v) => fmt_slice(f, v),
            Self::List(v) => fmt_slice(f, v),
            Self::Struct(s) => write!(f, "{s}"),
        }
    }
}

/// Collapse a run of decoded elements into a typed vector when every
/// element is a scalar of one kind, or keep them as a generic list.
pub(crate) fn vectorize(elements: Vec<LtvValue>) -> LtvValue {
    macro_rules! commit {
        ($variant:ident, $vec_variant:ident, $ty:ty) => {{
            let v: Vec<$ty> = elements
                .iter()
                .filter_map(|e| match e {
                    LtvValue::$variant(x) => Some(*x),
                    _ => None,
                })
                .collect();
            if v.len() == elements.len() {
                return LtvValue::$vec_variant(v);
            }
        }};
    }

    match elements.first() {
        Some(LtvValue::Bool(_)) => commit! {Bool, BoolVec, bool},
        Some(LtvValue::U8(_)) => commit! {U8, U8Vec, u8},
        Some(LtvValue::U16(_)) => commit! {U16, U16Vec, u16},
        Some(LtvValue::U32(_)) => commit! {U32, U32Vec, u32},
        Some(LtvValue::U64(_)) => commit! {U64, U64Vec, u64},
        Some(LtvValue::I8(_)) => commit! {I8, I8Vec, i8},
        Some(LtvValue::I16(_)) => commit! {I16, I16Vec, i16},
        Some(LtvValue::I32(_)) => commit! {I32, I32Vec, i32},
        Some(LtvValue::I64(_)) => commit! {I64, I64Vec, i64},
        Some(LtvValue::F32(_)) => commit! {F32, F32Vec, f32},
        Some(LtvValue::F64(_)) => commit! {F64, F64Vec, f64},
        _ => (),
    }

    LtvValue::List(elements)
}

/// A container for generic LTV struct values.
///
/// A lightweight wrapper around a map that records key insertion order, so
/// generic decoding preserves wire order and re-encoding walks fields in
/// that same order. Keys may only be set once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LtvStruct {
    entries: Vec<(String, LtvValue)>,
    index: HashMap<String, usize>,
}

impl LtvStruct {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a value, recording its insertion order.
    ///
    /// Keys must be non-empty and may not repeat.
    pub fn set(&mut self, key: impl Into<String>, value: LtvValue) -> LtvResult<()> {
        let key = key.into();

        if key.is_empty() {
            return Err(LtvError::BadKey);
        }

        if self.index.contains_key(&key) {
            return Err(LtvError::DuplicateKey(key));
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&LtvValue> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LtvValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Encode with keys in insertion order.
    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        e.write_value(&LtvValue::Struct(self.clone()));
        e.into_bytes()
    }

    /// Decode a struct element from `buf`.
    pub fn decode(buf: &[u8]) -> LtvResult<Self> {
        match LtvValue::decode(buf)? {
            LtvValue::Struct(s) => Ok(s),
            _ => Err(LtvError::ExpectedStruct),
        }
    }
}

impl fmt::Display for LtvStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key:?}:{value}")?;
        }
        write!(f, "}}")
    }
}

// Serialization goes through the ordered-map token so the mapper keeps the
// insertion order instead of applying its key-sorting rule for maps.
// Foreign serde formats see a plain map in insertion order.
impl Serialize for LtvStruct {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Entries<'a>(&'a LtvStruct);

        impl Serialize for Entries<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (k, v) in self.0.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }

        serializer.serialize_newtype_struct(ORDERED_TOKEN, &Entries(self))
    }
}

impl<'de> Deserialize<'de> for LtvStruct {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StructVisitor;

        impl<'de> Visitor<'de> for StructVisitor {
            type Value = LtvStruct;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an LTV struct")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut s = LtvStruct::new();
                while let Some((key, value)) = map.next_entry::<String, LtvValue>()? {
                    s.set(key, value).map_err(de::Error::custom)?;
                }
                Ok(s)
            }
        }

        deserializer.deserialize_map(StructVisitor)
    }
}

impl Serialize for LtvValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Nil => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            // Integers go through the exact-width token: a generic value
            // re-encodes with the width it decoded at, not the goldilocks
            // fit the mapper applies to plain host integers.
            Self::U8(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::U16(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::U32(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::U64(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::I8(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::I16(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::I32(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::I64(v) => serializer.serialize_newtype_struct(EXACT_TOKEN, v),
            Self::F32(v) => serializer.serialize_f32(*v),
            Self::F64(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::U8Vec(v) => serializer.serialize_bytes(v),
            Self::BoolVec(v) => serializer.collect_seq(v),
            Self::U16Vec(v) => serializer.collect_seq(v),
            Self::U32Vec(v) => serializer.collect_seq(v),
            Self::U64Vec(v) => serializer.collect_seq(v),
            Self::I8Vec(v) => serializer.collect_seq(v),
            Self::I16Vec(v) => serializer.collect_seq(v),
            Self::I32Vec(v) => serializer.collect_seq(v),
            Self::I64Vec(v) => serializer.collect_seq(v),
            Self::F32Vec(v) => serializer.collect_seq(v),
            Self::F64Vec(v) => serializer.collect_seq(v),
            Self::List(v) => serializer.collect_seq(v),
            Self::Struct(s) => s.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LtvValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = LtvValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("any LTV value")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
                Ok(LtvValue::Bool(v))
            }

            fn visit_u8<E>(self, v: u8) -> Result<Self::Value, E> {
                Ok(LtvValue::U8(v))
            }

            fn visit_u16<E>(self, v: u16) -> Result<Self::Value, E> {
                Ok(LtvValue::U16(v))
            }

            fn visit_u32<E>(self, v: u32) -> Result<Self::Value, E> {
                Ok(LtvValue::U32(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
                Ok(LtvValue::U64(v))
            }

            fn visit_i8<E>(self, v: i8) -> Result<Self::Value, E> {
                Ok(LtvValue::I8(v))
            }

            fn visit_i16<E>(self, v: i16) -> Result<Self::Value, E> {
                Ok(LtvValue::I16(v))
            }

            fn visit_i32<E>(self, v: i32) -> Result<Self::Value, E> {
                Ok(LtvValue::I32(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(LtvValue::I64(v))
            }

            fn visit_f32<E>(self, v: f32) -> Result<Self::Value, E> {
                Ok(LtvValue::F32(v))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
                Ok(LtvValue::F64(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
                Ok(LtvValue::String(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
                Ok(LtvValue::String(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(LtvValue::U8Vec(v.to_vec()))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(LtvValue::U8Vec(v))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(LtvValue::Nil)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(LtvValue::Nil)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                LtvValue::deserialize(d)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut elements = Vec::new();
                while let Some(e) = seq.next_element::<LtvValue>()? {
                    elements.push(e);
                }
                Ok(vectorize(elements))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut s = LtvStruct::new();
                while let Some((key, value)) = map.next_entry::<String, LtvValue>()? {
                    s.set(key, value).map_err(de::Error::custom)?;
                }
                Ok(LtvValue::Struct(s))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
