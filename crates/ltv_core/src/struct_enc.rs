//! Convenience writer for hand-rolled struct encoding: key/value pairs
//! over any encoder.

use crate::write::LtvWrite;

/// Generate a `key + value` helper for one write form.
macro_rules! kv {
    ($fn_name:ident, $ty:ty, $write:ident) => {
        pub fn $fn_name(&mut self, key: &str, v: $ty) {
            self.enc.write_string(key);
            self.enc.$write(v);
        }
    };
}

/// Writes struct fields as `key, value` pairs through a borrowed encoder.
///
/// The caller brackets the fields with [start](Self::start) and
/// [end](Self::end) (or emits them through the encoder directly).
pub struct StructWriter<'a, E: LtvWrite + ?Sized> {
    enc: &'a mut E,
}

impl<'a, E: LtvWrite + ?Sized> StructWriter<'a, E> {
    pub fn new(enc: &'a mut E) -> Self {
        Self { enc }
    }

    pub fn start(&mut self) {
        self.enc.write_struct_start();
    }

    pub fn end(&mut self) {
        self.enc.write_struct_end();
    }

    pub fn nil(&mut self, key: &str) {
        self.enc.write_string(key);
        self.enc.write_nil();
    }

    kv! {bool, bool, write_bool}

    kv! {u8, u8, write_u8}
    kv! {u16, u16, write_u16}
    kv! {u32, u32, write_u32}
    kv! {u64, u64, write_u64}

    kv! {i8, i8, write_i8}
    kv! {i16, i16, write_i16}
    kv! {i32, i32, write_i32}
    kv! {i64, i64, write_i64}

    kv! {f32, f32, write_f32}
    kv! {f64, f64, write_f64}

    kv! {int, i64, write_int}
    kv! {uint, u64, write_uint}

    kv! {string, &str, write_string}
    kv! {bytes, &[u8], write_bytes}

    kv! {vec_bool, &[bool], write_vec_bool}
    kv! {vec_u8, &[u8], write_vec_u8}
    kv! {vec_u16, &[u16], write_vec_u16}
    kv! {vec_u32, &[u32], write_vec_u32}
    kv! {vec_u64, &[u64], write_vec_u64}
    kv! {vec_i8, &[i8], write_vec_i8}
    kv! {vec_i16, &[i16], write_vec_i16}
    kv! {vec_i32, &[i32], write_vec_i32}
    kv! {vec_i64, &[i64], write_vec_i64}
    kv! {vec_f32, &[f32], write_vec_f32}
    kv! {vec_f64, &[f64], write_vec_f64}
}
