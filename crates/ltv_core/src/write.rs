//! The write surface shared by the buffered and streaming encoders.

use crate::consts::{
    encode_tag, fit_storage_exponent, fits_signed, SizeCode, TypeCode, I16_MASK, I32_MASK,
    I8_MASK, NOP_TAG, U16_MASK, U32_MASK, U8_MASK,
};
use crate::value::LtvValue;

/// Generate a tag-plus-little-endian-payload scalar writer.
macro_rules! write_scalar {
    ($(#[$doc:meta])* $fn_name:ident, $ty:ty, $code:expr) => {
        $(#[$doc])*
        fn $fn_name(&mut self, v: $ty) {
            self.write_tag($code, SizeCode::Single);
            self.raw_write(&v.to_le_bytes());
        }
    };
}

/// Generate a vector writer: prefix, then per-element little-endian payload.
macro_rules! write_vec {
    ($fn_name:ident, $ty:ty, $code:expr) => {
        fn $fn_name(&mut self, v: &[$ty]) {
            self.write_vector_prefix($code, v.len());
            for val in v {
                self.raw_write(&val.to_le_bytes());
            }
        }
    };
}

/// Everything an LTV encoder can emit.
///
/// Implementors supply the two primitive operations ([raw_write](Self::raw_write)
/// and [offset](Self::offset)); the rest of the surface is provided. The
/// buffered [Encoder](crate::Encoder) appends to an owned buffer, the
/// [StreamEncoder](crate::StreamEncoder) forwards to a byte sink with sticky
/// error latching.
pub trait LtvWrite {
    /// Append raw, trusted, preformed bytes to the output.
    fn raw_write(&mut self, bytes: &[u8]);

    /// Number of bytes emitted so far. Alignment padding is computed from
    /// this running offset, never from any underlying stream position.
    fn offset(&self) -> usize;

    /// Passthrough write, little-endian.
    fn raw_write_u16(&mut self, v: u16) {
        self.raw_write(&v.to_le_bytes());
    }

    /// Passthrough write, little-endian.
    fn raw_write_u32(&mut self, v: u32) {
        self.raw_write(&v.to_le_bytes());
    }

    /// Passthrough write, little-endian.
    fn raw_write_u64(&mut self, v: u64) {
        self.raw_write(&v.to_le_bytes());
    }

    fn write_tag(&mut self, t: TypeCode, s: SizeCode) {
        self.raw_write(&[encode_tag(t, s)]);
    }

    /// Write the tag and length field for a typed vector of `count`
    /// elements, preceded by however many no-op bytes it takes to land the
    /// first payload byte on a multiple of the element size.
    ///
    /// The length field is the smallest of 1/2/4/8 bytes that fits the
    /// payload byte length. Panics if `t` is a payload-less type.
    fn write_vector_prefix(&mut self, t: TypeCode, count: usize) {
        let type_size = t.size();
        assert!(type_size > 0, "vector prefix for payload-less type");

        let payload_len = (count as u64) * (type_size as u64);
        let exp = fit_storage_exponent(payload_len);
        let len_size = 1usize << exp;

        // Alignment padding. For single-byte element types the mask is
        // zero and no padding is ever emitted.
        let misalign = (self.offset() + 1 + len_size) & (type_size - 1);
        if misalign != 0 {
            for _ in 0..(type_size - misalign) {
                self.write_nop();
            }
        }

        self.write_tag(t, SizeCode::from_exponent(exp));
        self.raw_write(&payload_len.to_le_bytes()[..len_size]);
    }

    fn write_nop(&mut self) {
        self.raw_write(&[NOP_TAG]);
    }

    fn write_nil(&mut self) {
        self.write_tag(TypeCode::Nil, SizeCode::Single);
    }

    fn write_struct_start(&mut self) {
        self.write_tag(TypeCode::Struct, SizeCode::Single);
    }

    fn write_struct_end(&mut self) {
        self.write_tag(TypeCode::End, SizeCode::Single);
    }

    fn write_list_start(&mut self) {
        self.write_tag(TypeCode::List, SizeCode::Single);
    }

    fn write_list_end(&mut self) {
        self.write_tag(TypeCode::End, SizeCode::Single);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_tag(TypeCode::Bool, SizeCode::Single);
        self.raw_write(&[u8::from(v)]);
    }

    write_scalar! {write_u8, u8, TypeCode::U8}
    write_scalar! {write_u16, u16, TypeCode::U16}
    write_scalar! {write_u32, u32, TypeCode::U32}
    write_scalar! {write_u64, u64, TypeCode::U64}

    write_scalar! {write_i8, i8, TypeCode::I8}
    write_scalar! {write_i16, i16, TypeCode::I16}
    write_scalar! {write_i32, i32, TypeCode::I32}
    write_scalar! {write_i64, i64, TypeCode::I64}

    write_scalar! {write_f32, f32, TypeCode::F32}
    write_scalar! {write_f64, f64, TypeCode::F64}

    /// Goldilocks fit: emit `v` in the narrowest signed form that holds it.
    fn write_int(&mut self, v: i64) {
        let bits = v as u64;
        if fits_signed(bits, I8_MASK) {
            self.write_i8(v as i8);
        } else if fits_signed(bits, I16_MASK) {
            self.write_i16(v as i16);
        } else if fits_signed(bits, I32_MASK) {
            self.write_i32(v as i32);
        } else {
            self.write_i64(v);
        }
    }

    /// Goldilocks fit: emit `v` in the narrowest unsigned form that holds it.
    fn write_uint(&mut self, v: u64) {
        if v & U8_MASK == 0 {
            self.write_u8(v as u8);
        } else if v & U16_MASK == 0 {
            self.write_u16(v as u16);
        } else if v & U32_MASK == 0 {
            self.write_u32(v as u32);
        } else {
            self.write_u64(v);
        }
    }

    /// Write a string element. Strings of exactly one byte use the single
    /// form; everything else is the vector form.
    fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        if bytes.len() == 1 {
            self.write_tag(TypeCode::String, SizeCode::Single);
            self.raw_write(bytes);
        } else {
            self.write_vector_prefix(TypeCode::String, bytes.len());
            self.raw_write(bytes);
        }
    }

    /// Write a byte sequence as a `U8` vector.
    fn write_bytes(&mut self, v: &[u8]) {
        self.write_vec_u8(v);
    }

    fn write_vec_bool(&mut self, v: &[bool]) {
        self.write_vector_prefix(TypeCode::Bool, v.len());
        for val in v {
            self.raw_write(&[u8::from(*val)]);
        }
    }

    fn write_vec_u8(&mut self, v: &[u8]) {
        self.write_vector_prefix(TypeCode::U8, v.len());
        self.raw_write(v);
    }

    write_vec! {write_vec_u16, u16, TypeCode::U16}
    write_vec! {write_vec_u32, u32, TypeCode::U32}
    write_vec! {write_vec_u64, u64, TypeCode::U64}

    write_vec! {write_vec_i8, i8, TypeCode::I8}
    write_vec! {write_vec_i16, i16, TypeCode::I16}
    write_vec! {write_vec_i32, i32, TypeCode::I32}
    write_vec! {write_vec_i64, i64, TypeCode::I64}

    write_vec! {write_vec_f32, f32, TypeCode::F32}
    write_vec! {write_vec_f64, f64, TypeCode::F64}

    /// Write a generic value. Struct keys are emitted in insertion order.
    fn write_value(&mut self, v: &LtvValue) {
        match v {
            LtvValue::Nil => self.write_nil(),
            LtvValue::Bool(b) => self.write_bool(*b),
            LtvValue::U8(n) => self.write_u8(*n),
            LtvValue::U16(n) => self.write_u16(*n),
            LtvValue::U32(n) => self.write_u32(*n),
            LtvValue::U64(n) => self.write_u64(*n),
            LtvValue::I8(n) => self.write_i8(*n),
            LtvValue::I16(n) => self.write_i16(*n),
            LtvValue::I32(n) => self.write_i32(*n),
            LtvValue::I64(n) => self.write_i64(*n),
            LtvValue::F32(n) => self.write_f32(*n),
            LtvValue::F64(n) => self.write_f64(*n),
            LtvValue::String(s) => self.write_string(s),
            LtvValue::BoolVec(v) => self.write_vec_bool(v),
            LtvValue::U8Vec(v) => self.write_vec_u8(v),
            LtvValue::U16Vec(v) => self.write_vec_u16(v),
            LtvValue::U32Vec(v) => self.write_vec_u32(v),
            LtvValue::U64Vec(v) => self.write_vec_u64(v),
            LtvValue::I8Vec(v) => self.write_vec_i8(v),
            LtvValue::I16Vec(v) => self.write_vec_i16(v),
            LtvValue::I32Vec(v) => self.write_vec_i32(v),
            LtvValue::I64Vec(v) => self.write_vec_i64(v),
            LtvValue::F32Vec(v) => self.write_vec_f32(v),
            LtvValue::F64Vec(v) => self.write_vec_f64(v),
            LtvValue::List(items) => {
                self.write_list_start();
                for item in items {
                    self.write_value(item);
                }
                self.write_list_end();
            }
            LtvValue::Struct(s) => {
                self.write_struct_start();
                for (key, val) in s.iter() {
                    self.write_string(key);
                    self.write_value(val);
                }
                self.write_struct_end();
            }
        }
    }
}
