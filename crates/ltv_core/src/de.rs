//! Implementation of [serde::de::Deserializer]: the unmarshal half of the
//! generic mapper, over the buffered decoder.
//!
//! The format is self-describing, so most entry points dispatch on the next
//! element's descriptor. Strings and byte vectors deserialize zero-copy
//! into borrowing targets; typed vectors feed their elements through
//! serde's checked numeric conversions, which provide the width/sign
//! overflow rules (a signed source fits an unsigned target iff
//! non-negative, an unsigned source fits a signed target iff at most its
//! positive maximum).

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, Deserialize, Visitor};
use serde::forward_to_deserialize_any;

use crate::consts::{SizeCode, TypeCode};
use crate::decoder::{materialize, Decoder, Desc};
use crate::err::{LtvError, LtvResult};
use crate::value::{LtvValue, RAW_TOKEN};

/// Deserialize a value from a slice of bytes.
///
/// The slice must hold exactly one element (trailing no-ops aside).
pub fn deserialize<'a, T>(bytes: &'a [u8]) -> LtvResult<T>
where
    T: Deserialize<'a>,
{
    let mut de = LtvDeserializer::from_slice(bytes);
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Drives any [Deserialize] target from a buffered decoder.
pub struct LtvDeserializer<'de> {
    decoder: Decoder<'de>,
}

impl<'de> LtvDeserializer<'de> {
    pub fn from_slice(bytes: &'de [u8]) -> Self {
        Self {
            decoder: Decoder::new(bytes),
        }
    }

    /// Check that no element follows the one just deserialized.
    pub fn end(&mut self) -> LtvResult<()> {
        match self.decoder.next()? {
            None => Ok(()),
            Some(_) => Err(LtvError::Message("trailing data after value".into())),
        }
    }

    fn next_desc(&mut self) -> LtvResult<Desc> {
        match self.decoder.next()? {
            Some(desc) => Ok(desc),
            None => Err(LtvError::UnexpectedEof),
        }
    }

    /// Look at the next descriptor without consuming it.
    fn peek(&self) -> LtvResult<Option<Desc>> {
        self.decoder.clone().next()
    }

    fn peek_is(&self, code: TypeCode) -> LtvResult<bool> {
        Ok(matches!(self.peek()?, Some(d) if d.type_code == code))
    }

    fn dispatch<V>(&mut self, desc: Desc, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        match desc.type_code {
            TypeCode::Nil => visitor.visit_unit(),
            TypeCode::End => Err(LtvError::ExpectedValue),
            TypeCode::Struct => visitor.visit_map(StructAccess { de: self }),
            TypeCode::List => visitor.visit_seq(ListAccess { de: self }),
            TypeCode::String => visitor.visit_borrowed_str(self.decoder.take_str(&desc)?),
            _ if desc.size_code == SizeCode::Single => {
                let payload = self.decoder.take_bytes(&desc);
                match materialize(desc.type_code, desc.size_code, payload)? {
                    LtvValue::Bool(v) => visitor.visit_bool(v),
                    LtvValue::U8(v) => visitor.visit_u8(v),
                    LtvValue::U16(v) => visitor.visit_u16(v),
                    LtvValue::U32(v) => visitor.visit_u32(v),
                    LtvValue::U64(v) => visitor.visit_u64(v),
                    LtvValue::I8(v) => visitor.visit_i8(v),
                    LtvValue::I16(v) => visitor.visit_i16(v),
                    LtvValue::I32(v) => visitor.visit_i32(v),
                    LtvValue::I64(v) => visitor.visit_i64(v),
                    LtvValue::F32(v) => visitor.visit_f32(v),
                    LtvValue::F64(v) => visitor.visit_f64(v),
                    _ => Err(LtvError::ExpectedValue),
                }
            }
            _ => {
                let payload = self.decoder.take_bytes(&desc);
                visitor.visit_seq(VectorAccess {
                    type_code: desc.type_code,
                    payload,
                    pos: 0,
                })
            }
        }
    }
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut LtvDeserializer<'de> {
    type Error = LtvError;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        let desc = self.next_desc()?;
        self.dispatch(desc, visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        match self.peek_is(TypeCode::Nil)? {
            true => {
                self.next_desc()?;
                visitor.visit_none()
            }
            false => visitor.visit_some(self),
        }
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        // Nil reads as the empty sequence.
        match self.peek_is(TypeCode::Nil)? {
            true => {
                self.next_desc()?;
                visitor.visit_seq(EmptyAccess)
            }
            false => self.deserialize_any(visitor),
        }
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        // Nil reads as the empty map.
        match self.peek_is(TypeCode::Nil)? {
            true => {
                self.next_desc()?;
                visitor.visit_map(EmptyAccess)
            }
            false => self.deserialize_any(visitor),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        // U8 vectors hand back a borrowed slice of the input.
        match self.peek()? {
            Some(d) if d.type_code == TypeCode::U8 && d.size_code != SizeCode::Single => {
                let desc = self.next_desc()?;
                visitor.visit_borrowed_bytes(self.decoder.take_bytes(&desc))
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        if name == RAW_TOKEN {
            // Hand over the raw byte span of the next element, tag through
            // post-skip position.
            let desc = self.next_desc()?;
            let start = desc.offset;
            self.decoder.skip(&desc)?;
            let end = self.decoder.position();
            return visitor.visit_borrowed_bytes(&self.decoder.input()[start..end]);
        }

        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        let desc = self.next_desc()?;

        match desc.type_code {
            // A unit variant is its name on the wire.
            TypeCode::String => {
                let variant = self.decoder.take_str(&desc)?;
                visitor.visit_enum(EnumAccess {
                    de: self,
                    variant,
                    tagged: false,
                })
            }
            // A payload-carrying variant is a single-key struct.
            TypeCode::Struct => {
                let key_desc = self.next_desc()?;
                if key_desc.type_code != TypeCode::String {
                    return Err(LtvError::BadKey);
                }
                let variant = self.decoder.take_str(&key_desc)?;
                visitor.visit_enum(EnumAccess {
                    de: self,
                    variant,
                    tagged: true,
                })
            }
            found => Err(LtvError::UnmarshalType {
                found,
                target: "enum",
            }),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        let desc = self.next_desc()?;
        self.decoder.skip(&desc)?;
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct tuple tuple_struct struct identifier
    }
}

/// Sequence access over a typed vector payload: elements are read
/// little-endian on demand.
struct VectorAccess<'de> {
    type_code: TypeCode,
    payload: &'de [u8],
    pos: usize,
}

impl<'de> de::SeqAccess<'de> for VectorAccess<'de> {
    type Error = LtvError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, LtvError>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.pos >= self.payload.len() {
            return Ok(None);
        }

        let size = self.type_code.size();
        let chunk = &self.payload[self.pos..self.pos + size];
        self.pos += size;

        seed.deserialize(VectorElement {
            type_code: self.type_code,
            chunk,
        })
        .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some((self.payload.len() - self.pos) / self.type_code.size())
    }
}

/// Deserializer for one element of a typed vector.
struct VectorElement<'de> {
    type_code: TypeCode,
    chunk: &'de [u8],
}

impl<'de> de::Deserializer<'de> for VectorElement<'de> {
    type Error = LtvError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        match materialize(self.type_code, SizeCode::Single, self.chunk)? {
            LtvValue::Bool(v) => visitor.visit_bool(v),
            LtvValue::U8(v) => visitor.visit_u8(v),
            LtvValue::U16(v) => visitor.visit_u16(v),
            LtvValue::U32(v) => visitor.visit_u32(v),
            LtvValue::U64(v) => visitor.visit_u64(v),
            LtvValue::I8(v) => visitor.visit_i8(v),
            LtvValue::I16(v) => visitor.visit_i16(v),
            LtvValue::I32(v) => visitor.visit_i32(v),
            LtvValue::I64(v) => visitor.visit_i64(v),
            LtvValue::F32(v) => visitor.visit_f32(v),
            LtvValue::F64(v) => visitor.visit_f64(v),
            _ => Err(LtvError::ExpectedValue),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

/// Map access over a struct body: keys and values alternate until the end
/// tag.
struct StructAccess<'a, 'de> {
    de: &'a mut LtvDeserializer<'de>,
}

impl<'de> de::MapAccess<'de> for StructAccess<'_, 'de> {
    type Error = LtvError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, LtvError>
    where
        K: de::DeserializeSeed<'de>,
    {
        let desc = self.de.next_desc()?;
        if desc.type_code == TypeCode::End {
            return Ok(None);
        }

        // The structural validator admits only strings here.
        let key = self.de.decoder.take_str(&desc)?;
        seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, LtvError>
    where
        V: de::DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }
}

/// Sequence access over a list body.
struct ListAccess<'a, 'de> {
    de: &'a mut LtvDeserializer<'de>,
}

impl<'de> de::SeqAccess<'de> for ListAccess<'_, 'de> {
    type Error = LtvError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, LtvError>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.de.peek()? {
            Some(d) if d.type_code == TypeCode::End => {
                self.de.next_desc()?;
                Ok(None)
            }
            Some(_) => seed.deserialize(&mut *self.de).map(Some),
            None => Err(LtvError::UnexpectedEof),
        }
    }
}

/// Access for targets reading Nil as their empty form.
struct EmptyAccess;

impl<'de> de::SeqAccess<'de> for EmptyAccess {
    type Error = LtvError;

    fn next_element_seed<T>(&mut self, _seed: T) -> Result<Option<T::Value>, LtvError>
    where
        T: de::DeserializeSeed<'de>,
    {
        Ok(None)
    }
}

impl<'de> de::MapAccess<'de> for EmptyAccess {
    type Error = LtvError;

    fn next_key_seed<K>(&mut self, _seed: K) -> Result<Option<K::Value>, LtvError>
    where
        K: de::DeserializeSeed<'de>,
    {
        Ok(None)
    }

    fn next_value_seed<V>(&mut self, _seed: V) -> Result<V::Value, LtvError>
    where
        V: de::DeserializeSeed<'de>,
    {
        Err(LtvError::Message("value requested from empty map".into()))
    }
}

struct EnumAccess<'a, 'de> {
    de: &'a mut LtvDeserializer<'de>,
    variant: &'de str,
    /// True when the variant came from a single-key struct and a value
    /// (plus the closing end tag) is still pending.
    tagged: bool,
}

impl<'de, 'a> de::EnumAccess<'de> for EnumAccess<'a, 'de> {
    type Error = LtvError;
    type Variant = VariantAccess<'a, 'de>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), LtvError>
    where
        V: de::DeserializeSeed<'de>,
    {
        let value = seed.deserialize(de::value::StrDeserializer::<LtvError>::new(self.variant))?;
        Ok((
            value,
            VariantAccess {
                de: self.de,
                tagged: self.tagged,
            },
        ))
    }
}

struct VariantAccess<'a, 'de> {
    de: &'a mut LtvDeserializer<'de>,
    tagged: bool,
}

impl<'de> VariantAccess<'_, 'de> {
    /// Consume the end tag that closes the single-key variant struct.
    fn expect_end(&mut self) -> LtvResult<()> {
        let desc = self.de.next_desc()?;
        match desc.type_code {
            TypeCode::End => Ok(()),
            _ => Err(LtvError::Message(
                "enum variant struct holds more than one key".into(),
            )),
        }
    }
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'_, 'de> {
    type Error = LtvError;

    fn unit_variant(self) -> Result<(), LtvError> {
        match self.tagged {
            true => Err(LtvError::Message(
                "unexpected payload for unit enum variant".into(),
            )),
            false => Ok(()),
        }
    }

    fn newtype_variant_seed<T>(mut self, seed: T) -> Result<T::Value, LtvError>
    where
        T: de::DeserializeSeed<'de>,
    {
        if !self.tagged {
            return Err(LtvError::Message(
                "missing payload for newtype enum variant".into(),
            ));
        }

        let value = seed.deserialize(&mut *self.de)?;
        self.expect_end()?;
        Ok(value)
    }

    fn tuple_variant<V>(mut self, _len: usize, visitor: V) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        if !self.tagged {
            return Err(LtvError::Message(
                "missing payload for tuple enum variant".into(),
            ));
        }

        let value = de::Deserializer::deserialize_any(&mut *self.de, visitor)?;
        self.expect_end()?;
        Ok(value)
    }

    fn struct_variant<V>(
        mut self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, LtvError>
    where
        V: Visitor<'de>,
    {
        if !self.tagged {
            return Err(LtvError::Message(
                "missing payload for struct enum variant".into(),
            ));
        }

        let value = de::Deserializer::deserialize_any(&mut *self.de, visitor)?;
        self.expect_end()?;
        Ok(value)
    }
}
