//! The buffered encoder: appends elements to an owned, growable buffer.

use crate::write::LtvWrite;

/// An encoder that accumulates LTV elements in an in-memory buffer.
///
/// All of the write surface lives on the [LtvWrite] trait. The borrowed
/// view returned by [bytes](Self::bytes) is valid until the next mutation;
/// callers that want to keep the data copy it or take ownership with
/// [into_bytes](Self::into_bytes).
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// The encoded bytes so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Clear the buffer for reuse.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Pre-grow the buffer by `additional` zeroed bytes and return the
    /// index of the reserved span, so the caller can fill it in place via
    /// [bytes_mut](Self::bytes_mut).
    pub fn grow(&mut self, additional: usize) -> usize {
        let at = self.buf.len();
        self.buf.resize(at + additional, 0);
        at
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl LtvWrite for Encoder {
    fn raw_write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn offset(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_scalars() {
        let mut e = Encoder::new();
        e.write_u8(123);
        assert_eq!(e.bytes(), [0x60, 0x7B]);

        e.reset();
        e.write_bool(true);
        assert_eq!(e.bytes(), [0x50, 0x01]);

        e.reset();
        e.write_i16(-1234);
        assert_eq!(e.bytes(), [0xB0, 0x2E, 0xFB]);

        e.reset();
        e.write_f32(123.456);
        assert_eq!(e.bytes(), [0xE0, 0x79, 0xE9, 0xF6, 0x42]);
    }

    #[test]
    fn test_single_char_string() {
        let mut e = Encoder::new();
        e.write_string("A");
        assert_eq!(e.bytes(), [0x40, 0x41]);
    }

    #[test]
    fn test_empty_string_is_vector_form() {
        let mut e = Encoder::new();
        e.write_string("");
        assert_eq!(e.bytes(), [0x41, 0x00]);
    }

    #[test]
    fn test_goldilocks_int() {
        let cases: [(i64, &[u8]); 7] = [
            (127, &[0xA0, 0x7F]),
            (128, &[0xB0, 0x80, 0x00]),
            (-1, &[0xA0, 0xFF]),
            (-128, &[0xA0, 0x80]),
            (-129, &[0xB0, 0x7F, 0xFF]),
            (i64::from(i32::MAX), &[0xC0, 0xFF, 0xFF, 0xFF, 0x7F]),
            (
                i64::from(i32::MAX) + 1,
                &[0xD0, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00],
            ),
        ];

        for (v, expect) in cases {
            let mut e = Encoder::new();
            e.write_int(v);
            assert_eq!(e.bytes(), expect, "write_int({v})");
        }
    }

    #[test]
    fn test_goldilocks_uint() {
        let cases: [(u64, &[u8]); 4] = [
            (255, &[0x60, 0xFF]),
            (256, &[0x70, 0x00, 0x01]),
            (65536, &[0x80, 0x00, 0x00, 0x01, 0x00]),
            (
                u64::MAX,
                &[0x90, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
            ),
        ];

        for (v, expect) in cases {
            let mut e = Encoder::new();
            e.write_uint(v);
            assert_eq!(e.bytes(), expect, "write_uint({v})");
        }
    }

    #[test]
    fn test_vector_alignment() {
        // f32 vector at offset 0: tag + 1-byte length would put the payload
        // at offset 2, so two no-ops push it to offset 4.
        let mut e = Encoder::new();
        e.write_vec_f32(&[1.0, 2.0]);
        assert_eq!(
            &e.bytes()[..4],
            [0xFF, 0xFF, 0xE1, 0x08],
            "padding, tag, length"
        );
        assert_eq!(&e.bytes()[4..8], 1.0f32.to_le_bytes());
        assert_eq!(&e.bytes()[8..12], 2.0f32.to_le_bytes());

        // u16 vector after one byte of output: payload would start at 3,
        // one no-op moves it to 4.
        let mut e = Encoder::new();
        e.write_nil();
        e.write_vec_u16(&[7]);
        assert_eq!(e.bytes(), [0x00, 0xFF, 0x71, 0x02, 0x07, 0x00]);

        // u8 vectors never need padding.
        let mut e = Encoder::new();
        e.write_nil();
        e.write_bytes(&[1, 2, 3]);
        assert_eq!(e.bytes(), [0x00, 0x61, 0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_length_field_widths() {
        let mut e = Encoder::new();
        e.write_bytes(&[0xAA; 255]);
        assert_eq!(&e.bytes()[..2], [0x61, 0xFF]);

        let mut e = Encoder::new();
        e.write_bytes(&[0xAA; 256]);
        assert_eq!(&e.bytes()[..3], [0x62, 0x00, 0x01]);

        let mut e = Encoder::new();
        e.write_bytes(&[0xAA; 65536]);
        assert_eq!(&e.bytes()[..5], [0x63, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_containers() {
        let mut e = Encoder::new();
        e.write_struct_start();
        e.write_string("id");
        e.write_uint(1);
        e.write_struct_end();
        assert_eq!(
            e.bytes(),
            [0x10, 0x41, 0x02, b'i', b'd', 0x60, 0x01, 0x30]
        );

        e.reset();
        e.write_list_start();
        e.write_list_end();
        assert_eq!(e.bytes(), [0x20, 0x30]);
    }

    #[test]
    fn test_grow_returns_span_index() {
        let mut e = Encoder::new();
        e.write_nil();
        let at = e.grow(4);
        assert_eq!(at, 1);
        e.bytes_mut()[at..at + 4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(e.bytes(), [0x00, 1, 2, 3, 4]);
    }
}
