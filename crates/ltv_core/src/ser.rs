//! Implementation of [serde::ser::Serializer]: the marshal half of the
//! generic mapper.
//!
//! Scalars map directly (signed integers take the goldilocks fit, as do
//! unsigned ones). Structs stream field-by-field in declaration order.
//! Sequences are collected through a vector-candidacy pass: a run of
//! same-kind scalars commits as a typed vector, anything else collapses to
//! a generic list. Maps buffer their entries as generic values and emit
//! them sorted by key.

use serde::ser::{self, Serialize};

use crate::consts::{fits_signed, I16_MASK, I32_MASK, I8_MASK, U16_MASK, U32_MASK, U8_MASK};
use crate::decoder::{validate, Decoder};
use crate::encoder::Encoder;
use crate::err::{LtvError, LtvResult};
use crate::stream_enc::StreamEncoder;
use crate::value::{vectorize, LtvStruct, LtvValue, EXACT_TOKEN, ORDERED_TOKEN, RAW_TOKEN};
use crate::write::LtvWrite;

/// Recursion bound for the mapper. Deterministic cycle policy: no value may
/// nest deeper than this, so reference cycles cannot run away.
const MAX_MARSHAL_DEPTH: usize = 1_000;

/// Serialize a value to a vector of bytes.
pub fn serialize<T>(value: &T) -> LtvResult<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let mut enc = Encoder::new();
    value.serialize(&mut LtvSerializer::new(&mut enc))?;
    Ok(enc.into_bytes())
}

/// Serialize a value into a byte sink through the streaming encoder.
pub fn to_writer<W, T>(w: W, value: &T) -> LtvResult<()>
where
    W: std::io::Write,
    T: Serialize + ?Sized,
{
    let mut enc = StreamEncoder::new(w);
    value.serialize(&mut LtvSerializer::new(&mut enc))?;

    match enc.take_error() {
        None => Ok(()),
        Some(e) => Err(LtvError::Io(e)),
    }
}

/// One-shot marker consumed by the next write.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Normal,
    /// Splice the next byte sequence verbatim after validation.
    Raw,
    /// Emit the next map in iteration order instead of sorting.
    Ordered,
    /// Keep the next integer at its declared width.
    Exact,
}

/// Streams any [Serialize] value through an encoder.
pub struct LtvSerializer<'e, E: LtvWrite> {
    enc: &'e mut E,
    depth: usize,
    mode: Mode,
}

impl<'e, E: LtvWrite> LtvSerializer<'e, E> {
    pub fn new(enc: &'e mut E) -> Self {
        Self {
            enc,
            depth: 0,
            mode: Mode::Normal,
        }
    }

    fn take_mode(&mut self) -> Mode {
        std::mem::replace(&mut self.mode, Mode::Normal)
    }

    fn enter(&mut self) -> LtvResult<()> {
        self.depth += 1;
        match self.depth > MAX_MARSHAL_DEPTH {
            true => Err(LtvError::UnsupportedValue(format!(
                "value nests deeper than {MAX_MARSHAL_DEPTH} levels"
            ))),
            false => Ok(()),
        }
    }
}

macro_rules! serialize_signed {
    ($fn_name:ident, $write:ident, $ty:ty) => {
        fn $fn_name(self, v: $ty) -> LtvResult<()> {
            match self.take_mode() {
                Mode::Exact => self.enc.$write(v),
                _ => self.enc.write_int(v as i64),
            }
            Ok(())
        }
    };
}

macro_rules! serialize_unsigned {
    ($fn_name:ident, $write:ident, $ty:ty) => {
        fn $fn_name(self, v: $ty) -> LtvResult<()> {
            match self.take_mode() {
                Mode::Exact => self.enc.$write(v),
                _ => self.enc.write_uint(v as u64),
            }
            Ok(())
        }
    };
}

impl<'a, 'e, E: LtvWrite> ser::Serializer for &'a mut LtvSerializer<'e, E> {
    type Ok = ();
    type Error = LtvError;

    type SerializeSeq = SeqSerializer<'a, 'e, E>;
    type SerializeTuple = ListSerializer<'a, 'e, E>;
    type SerializeTupleStruct = ListSerializer<'a, 'e, E>;
    type SerializeTupleVariant = ListSerializer<'a, 'e, E>;
    type SerializeMap = MapSerializer<'a, 'e, E>;
    type SerializeStruct = StructSerializer<'a, 'e, E>;
    type SerializeStructVariant = StructSerializer<'a, 'e, E>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> LtvResult<()> {
        self.enc.write_bool(v);
        Ok(())
    }

    serialize_signed! {serialize_i8, write_i8, i8}
    serialize_signed! {serialize_i16, write_i16, i16}
    serialize_signed! {serialize_i32, write_i32, i32}
    serialize_signed! {serialize_i64, write_i64, i64}

    serialize_unsigned! {serialize_u8, write_u8, u8}
    serialize_unsigned! {serialize_u16, write_u16, u16}
    serialize_unsigned! {serialize_u32, write_u32, u32}
    serialize_unsigned! {serialize_u64, write_u64, u64}

    fn serialize_f32(self, v: f32) -> LtvResult<()> {
        self.enc.write_f32(v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> LtvResult<()> {
        self.enc.write_f64(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> LtvResult<()> {
        let mut buf = [0u8; 4];
        self.enc.write_string(v.encode_utf8(&mut buf));
        Ok(())
    }

    fn serialize_str(self, v: &str) -> LtvResult<()> {
        self.enc.write_string(v);
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> LtvResult<()> {
        match self.take_mode() {
            Mode::Raw => {
                validate(v).map_err(|e| {
                    LtvError::Message(format!("pre-encoded value failed validation: {e}"))
                })?;
                self.enc.raw_write(v);
            }
            _ => self.enc.write_bytes(v),
        }
        Ok(())
    }

    fn serialize_none(self) -> LtvResult<()> {
        self.enc.write_nil();
        Ok(())
    }

    fn serialize_some<T>(self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> LtvResult<()> {
        self.enc.write_nil();
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> LtvResult<()> {
        self.serialize_unit()
    }

    // A bare enum variant is its name on the wire.
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> LtvResult<()> {
        self.enc.write_string(variant);
        Ok(())
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        if name == RAW_TOKEN {
            self.mode = Mode::Raw;
        } else if name == ORDERED_TOKEN {
            self.mode = Mode::Ordered;
        } else if name == EXACT_TOKEN {
            self.mode = Mode::Exact;
        }

        let result = value.serialize(&mut *self);
        self.mode = Mode::Normal;
        result
    }

    // A payload-carrying variant becomes a single-key struct.
    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.enc.write_struct_start();
        self.enc.write_string(variant);
        value.serialize(&mut *self)?;
        self.enc.write_struct_end();
        Ok(())
    }

    fn serialize_seq(self, len: Option<usize>) -> LtvResult<Self::SerializeSeq> {
        self.enter()?;
        Ok(SeqSerializer {
            elements: Vec::with_capacity(len.unwrap_or(0)),
            ser: self,
        })
    }

    fn serialize_tuple(self, _len: usize) -> LtvResult<Self::SerializeTuple> {
        self.enter()?;
        self.enc.write_list_start();
        Ok(ListSerializer {
            ser: self,
            in_variant: false,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> LtvResult<Self::SerializeTupleStruct> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeTupleVariant> {
        self.enter()?;
        self.enc.write_struct_start();
        self.enc.write_string(variant);
        self.enc.write_list_start();
        Ok(ListSerializer {
            ser: self,
            in_variant: true,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> LtvResult<Self::SerializeMap> {
        self.enter()?;
        let ordered = self.take_mode() == Mode::Ordered;
        Ok(MapSerializer {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending: None,
            ordered,
            ser: self,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeStruct> {
        self.enter()?;
        self.enc.write_struct_start();
        Ok(StructSerializer {
            ser: self,
            in_variant: false,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeStructVariant> {
        self.enter()?;
        self.enc.write_struct_start();
        self.enc.write_string(variant);
        self.enc.write_struct_start();
        Ok(StructSerializer {
            ser: self,
            in_variant: true,
        })
    }
}

/// Collects sequence elements as generic values, then commits the run as a
/// typed vector or a generic list.
pub struct SeqSerializer<'a, 'e, E: LtvWrite> {
    ser: &'a mut LtvSerializer<'e, E>,
    elements: Vec<LtvValue>,
}

impl<E: LtvWrite> ser::SerializeSeq for SeqSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_element<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        // Elements keep their declared width: a `Vec<i64>` of small values
        // is still an I64 vector.
        let v = value.serialize(ValueSerializer {
            keep_width: true,
            depth: self.ser.depth,
            ..ValueSerializer::default()
        })?;
        self.elements.push(v);
        Ok(())
    }

    fn end(self) -> LtvResult<()> {
        self.ser.depth -= 1;
        let value = vectorize(self.elements);
        self.ser.enc.write_value(&value);
        Ok(())
    }
}

/// Streams tuple (and tuple-variant) elements as a generic list.
pub struct ListSerializer<'a, 'e, E: LtvWrite> {
    ser: &'a mut LtvSerializer<'e, E>,
    in_variant: bool,
}

impl<E: LtvWrite> ListSerializer<'_, '_, E> {
    fn element<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(&mut *self.ser)
    }

    fn finish(self) -> LtvResult<()> {
        self.ser.enc.write_list_end();
        if self.in_variant {
            self.ser.enc.write_struct_end();
        }
        self.ser.depth -= 1;
        Ok(())
    }
}

impl<E: LtvWrite> ser::SerializeTuple for ListSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_element<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.element(value)
    }

    fn end(self) -> LtvResult<()> {
        self.finish()
    }
}

impl<E: LtvWrite> ser::SerializeTupleStruct for ListSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_field<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.element(value)
    }

    fn end(self) -> LtvResult<()> {
        self.finish()
    }
}

impl<E: LtvWrite> ser::SerializeTupleVariant for ListSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_field<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.element(value)
    }

    fn end(self) -> LtvResult<()> {
        self.finish()
    }
}

/// Buffers map entries as generic values so they can be emitted in sorted
/// key order at the true output offsets.
pub struct MapSerializer<'a, 'e, E: LtvWrite> {
    ser: &'a mut LtvSerializer<'e, E>,
    entries: Vec<(String, LtvValue)>,
    pending: Option<String>,
    ordered: bool,
}

impl<E: LtvWrite> ser::SerializeMap for MapSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_key<T>(&mut self, key: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.pending = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        let key = match self.pending.take() {
            Some(key) => key,
            None => return Err(LtvError::Message("map value before key".into())),
        };

        let v = value.serialize(ValueSerializer {
            depth: self.ser.depth,
            ..ValueSerializer::default()
        })?;
        self.entries.push((key, v));
        Ok(())
    }

    fn end(mut self) -> LtvResult<()> {
        // Deterministic output: entries sort lexicographically by key,
        // unless the ordered-struct container asked for insertion order.
        if !self.ordered {
            self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        }

        self.ser.enc.write_struct_start();
        for (key, value) in &self.entries {
            self.ser.enc.write_string(key);
            self.ser.enc.write_value(value);
        }
        self.ser.enc.write_struct_end();
        self.ser.depth -= 1;
        Ok(())
    }
}

/// Streams struct fields in declaration order.
pub struct StructSerializer<'a, 'e, E: LtvWrite> {
    ser: &'a mut LtvSerializer<'e, E>,
    in_variant: bool,
}

impl<E: LtvWrite> ser::SerializeStruct for StructSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.ser.enc.write_string(key);
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> LtvResult<()> {
        self.ser.enc.write_struct_end();
        if self.in_variant {
            self.ser.enc.write_struct_end();
        }
        self.ser.depth -= 1;
        Ok(())
    }
}

impl<E: LtvWrite> ser::SerializeStructVariant for StructSerializer<'_, '_, E> {
    type Ok = ();
    type Error = LtvError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> LtvResult<()> {
        ser::SerializeStruct::end(self)
    }
}

fn goldi_int(v: i64) -> LtvValue {
    let bits = v as u64;
    if fits_signed(bits, I8_MASK) {
        LtvValue::I8(v as i8)
    } else if fits_signed(bits, I16_MASK) {
        LtvValue::I16(v as i16)
    } else if fits_signed(bits, I32_MASK) {
        LtvValue::I32(v as i32)
    } else {
        LtvValue::I64(v)
    }
}

fn goldi_uint(v: u64) -> LtvValue {
    if v & U8_MASK == 0 {
        LtvValue::U8(v as u8)
    } else if v & U16_MASK == 0 {
        LtvValue::U16(v as u16)
    } else if v & U32_MASK == 0 {
        LtvValue::U32(v as u32)
    } else {
        LtvValue::U64(v)
    }
}

/// Decode exactly one element out of a pre-encoded buffer.
fn decode_single(bytes: &[u8]) -> LtvResult<LtvValue> {
    let mut d = Decoder::new(bytes);
    let value = match d.value()? {
        Some(v) => v,
        None => return Err(LtvError::UnexpectedEof),
    };

    match d.next()? {
        None => Ok(value),
        Some(_) => Err(LtvError::Message(
            "pre-encoded value must be a single element".into(),
        )),
    }
}

/// Converts any [Serialize] value into a generic [LtvValue], applying the
/// same mapping rules as the streaming path. Used wherever emission has to
/// be deferred: map entries (sorted before writing) and sequence elements
/// (vector candidacy).
#[derive(Clone, Copy, Default)]
struct ValueSerializer {
    /// Keep integer widths as declared instead of the goldilocks fit.
    keep_width: bool,
    /// Interpret the next byte sequence as pre-encoded LTV.
    raw: bool,
    /// Keep the next map in iteration order.
    ordered: bool,
    depth: usize,
}

impl ValueSerializer {
    fn nested(&self) -> LtvResult<Self> {
        if self.depth + 1 > MAX_MARSHAL_DEPTH {
            return Err(LtvError::UnsupportedValue(format!(
                "value nests deeper than {MAX_MARSHAL_DEPTH} levels"
            )));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..Self::default()
        })
    }
}

macro_rules! value_signed {
    ($fn_name:ident, $ty:ty, $variant:ident) => {
        fn $fn_name(self, v: $ty) -> LtvResult<LtvValue> {
            match self.keep_width {
                true => Ok(LtvValue::$variant(v)),
                false => Ok(goldi_int(v as i64)),
            }
        }
    };
}

macro_rules! value_unsigned {
    ($fn_name:ident, $ty:ty, $variant:ident) => {
        fn $fn_name(self, v: $ty) -> LtvResult<LtvValue> {
            match self.keep_width {
                true => Ok(LtvValue::$variant(v)),
                false => Ok(goldi_uint(v as u64)),
            }
        }
    };
}

impl ser::Serializer for ValueSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    type SerializeSeq = ValueSeqSerializer;
    type SerializeTuple = ValueListSerializer;
    type SerializeTupleStruct = ValueListSerializer;
    type SerializeTupleVariant = ValueListSerializer;
    type SerializeMap = ValueMapSerializer;
    type SerializeStruct = ValueStructSerializer;
    type SerializeStructVariant = ValueStructSerializer;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> LtvResult<LtvValue> {
        Ok(LtvValue::Bool(v))
    }

    value_signed! {serialize_i8, i8, I8}
    value_signed! {serialize_i16, i16, I16}
    value_signed! {serialize_i32, i32, I32}
    value_signed! {serialize_i64, i64, I64}

    value_unsigned! {serialize_u8, u8, U8}
    value_unsigned! {serialize_u16, u16, U16}
    value_unsigned! {serialize_u32, u32, U32}
    value_unsigned! {serialize_u64, u64, U64}

    fn serialize_f32(self, v: f32) -> LtvResult<LtvValue> {
        Ok(LtvValue::F32(v))
    }

    fn serialize_f64(self, v: f64) -> LtvResult<LtvValue> {
        Ok(LtvValue::F64(v))
    }

    fn serialize_char(self, v: char) -> LtvResult<LtvValue> {
        Ok(LtvValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> LtvResult<LtvValue> {
        Ok(LtvValue::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> LtvResult<LtvValue> {
        match self.raw {
            true => decode_single(v),
            false => Ok(LtvValue::U8Vec(v.to_vec())),
        }
    }

    fn serialize_none(self) -> LtvResult<LtvValue> {
        Ok(LtvValue::Nil)
    }

    fn serialize_some<T>(self, value: &T) -> LtvResult<LtvValue>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> LtvResult<LtvValue> {
        Ok(LtvValue::Nil)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> LtvResult<LtvValue> {
        Ok(LtvValue::Nil)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> LtvResult<LtvValue> {
        Ok(LtvValue::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(mut self, name: &'static str, value: &T) -> LtvResult<LtvValue>
    where
        T: Serialize + ?Sized,
    {
        if name == RAW_TOKEN {
            self.raw = true;
        } else if name == ORDERED_TOKEN {
            self.ordered = true;
        } else if name == EXACT_TOKEN {
            self.keep_width = true;
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> LtvResult<LtvValue>
    where
        T: Serialize + ?Sized,
    {
        let inner = value.serialize(self.nested()?)?;
        let mut s = LtvStruct::new();
        s.set(variant, inner)?;
        Ok(LtvValue::Struct(s))
    }

    fn serialize_seq(self, len: Option<usize>) -> LtvResult<Self::SerializeSeq> {
        Ok(ValueSeqSerializer {
            element: ValueSerializer {
                keep_width: true,
                ..self.nested()?
            },
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> LtvResult<Self::SerializeTuple> {
        Ok(ValueListSerializer {
            element: self.nested()?,
            items: Vec::with_capacity(len),
            variant: None,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> LtvResult<Self::SerializeTupleStruct> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> LtvResult<Self::SerializeTupleVariant> {
        Ok(ValueListSerializer {
            element: self.nested()?,
            items: Vec::with_capacity(len),
            variant: Some(variant),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> LtvResult<Self::SerializeMap> {
        Ok(ValueMapSerializer {
            element: ValueSerializer {
                ordered: false,
                ..self.nested()?
            },
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending: None,
            ordered: self.ordered,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeStruct> {
        Ok(ValueStructSerializer {
            element: self.nested()?,
            s: LtvStruct::new(),
            variant: None,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeStructVariant> {
        Ok(ValueStructSerializer {
            element: self.nested()?,
            s: LtvStruct::new(),
            variant: Some(variant),
        })
    }
}

struct ValueSeqSerializer {
    element: ValueSerializer,
    elements: Vec<LtvValue>,
}

impl ser::SerializeSeq for ValueSeqSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_element<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.elements.push(value.serialize(self.element)?);
        Ok(())
    }

    fn end(self) -> LtvResult<LtvValue> {
        Ok(vectorize(self.elements))
    }
}

struct ValueListSerializer {
    element: ValueSerializer,
    items: Vec<LtvValue>,
    variant: Option<&'static str>,
}

impl ValueListSerializer {
    fn push<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(self.element)?);
        Ok(())
    }

    fn finish(self) -> LtvResult<LtvValue> {
        let list = LtvValue::List(self.items);
        match self.variant {
            None => Ok(list),
            Some(variant) => {
                let mut s = LtvStruct::new();
                s.set(variant, list)?;
                Ok(LtvValue::Struct(s))
            }
        }
    }
}

impl ser::SerializeTuple for ValueListSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_element<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> LtvResult<LtvValue> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for ValueListSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_field<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> LtvResult<LtvValue> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for ValueListSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_field<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> LtvResult<LtvValue> {
        self.finish()
    }
}

struct ValueMapSerializer {
    element: ValueSerializer,
    entries: Vec<(String, LtvValue)>,
    pending: Option<String>,
    ordered: bool,
}

impl ser::SerializeMap for ValueMapSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_key<T>(&mut self, key: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.pending = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        let key = match self.pending.take() {
            Some(key) => key,
            None => return Err(LtvError::Message("map value before key".into())),
        };
        self.entries.push((key, value.serialize(self.element)?));
        Ok(())
    }

    fn end(mut self) -> LtvResult<LtvValue> {
        if !self.ordered {
            self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let mut s = LtvStruct::new();
        for (key, value) in self.entries {
            s.set(key, value)?;
        }
        Ok(LtvValue::Struct(s))
    }
}

struct ValueStructSerializer {
    element: ValueSerializer,
    s: LtvStruct,
    variant: Option<&'static str>,
}

impl ValueStructSerializer {
    fn field<T>(&mut self, key: &'static str, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        let v = value.serialize(self.element)?;
        self.s.set(key, v)
    }

    fn finish(self) -> LtvResult<LtvValue> {
        let inner = LtvValue::Struct(self.s);
        match self.variant {
            None => Ok(inner),
            Some(variant) => {
                let mut outer = LtvStruct::new();
                outer.set(variant, inner)?;
                Ok(LtvValue::Struct(outer))
            }
        }
    }
}

impl ser::SerializeStruct for ValueStructSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.field(key, value)
    }

    fn end(self) -> LtvResult<LtvValue> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for ValueStructSerializer {
    type Ok = LtvValue;
    type Error = LtvError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> LtvResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.field(key, value)
    }

    fn end(self) -> LtvResult<LtvValue> {
        self.finish()
    }
}

/// Resolves map keys to strings: string and character keys pass through,
/// integer keys format in decimal, everything else is unsupported. Empty
/// keys are rejected up front.
struct MapKeySerializer;

macro_rules! key_display {
    ($fn_name:ident, $ty:ty) => {
        fn $fn_name(self, v: $ty) -> LtvResult<String> {
            Ok(v.to_string())
        }
    };
}

macro_rules! key_unsupported {
    ($fn_name:ident $(, $ty:ty)?) => {
        fn $fn_name(self $(, _v: $ty)?) -> LtvResult<String> {
            Err(LtvError::UnsupportedType("map key"))
        }
    };
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = LtvError;

    type SerializeSeq = ser::Impossible<String, LtvError>;
    type SerializeTuple = ser::Impossible<String, LtvError>;
    type SerializeTupleStruct = ser::Impossible<String, LtvError>;
    type SerializeTupleVariant = ser::Impossible<String, LtvError>;
    type SerializeMap = ser::Impossible<String, LtvError>;
    type SerializeStruct = ser::Impossible<String, LtvError>;
    type SerializeStructVariant = ser::Impossible<String, LtvError>;

    fn serialize_str(self, v: &str) -> LtvResult<String> {
        match v.is_empty() {
            true => Err(LtvError::BadKey),
            false => Ok(v.to_owned()),
        }
    }

    fn serialize_char(self, v: char) -> LtvResult<String> {
        Ok(v.to_string())
    }

    key_display! {serialize_i8, i8}
    key_display! {serialize_i16, i16}
    key_display! {serialize_i32, i32}
    key_display! {serialize_i64, i64}
    key_display! {serialize_u8, u8}
    key_display! {serialize_u16, u16}
    key_display! {serialize_u32, u32}
    key_display! {serialize_u64, u64}

    key_unsupported! {serialize_bool, bool}
    key_unsupported! {serialize_f32, f32}
    key_unsupported! {serialize_f64, f64}
    key_unsupported! {serialize_bytes, &[u8]}
    key_unsupported! {serialize_none}
    key_unsupported! {serialize_unit}

    fn serialize_some<T>(self, _value: &T) -> LtvResult<String>
    where
        T: Serialize + ?Sized,
    {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> LtvResult<String> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> LtvResult<String> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> LtvResult<String>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> LtvResult<String>
    where
        T: Serialize + ?Sized,
    {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> LtvResult<Self::SerializeSeq> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_tuple(self, _len: usize) -> LtvResult<Self::SerializeTuple> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeTupleStruct> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeTupleVariant> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_map(self, _len: Option<usize>) -> LtvResult<Self::SerializeMap> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeStruct> {
        Err(LtvError::UnsupportedType("map key"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> LtvResult<Self::SerializeStructVariant> {
        Err(LtvError::UnsupportedType("map key"))
    }
}
