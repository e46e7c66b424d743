//! Heuristics for recovering typed values out of JSON strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// What a JSON string value turned out to hold.
pub(crate) enum Sniffed {
    F64(f64),
    I64(i64),
    U64(u64),
    Bytes(Vec<u8>),
    Str,
}

/// Try to decode a string as a base64 binary payload.
///
/// Anything under 32 bytes or not a multiple of 4 is left alone, and a
/// quick whitespace scan rejects ordinary prose before attempting a strict
/// decode.
fn try_base64(s: &str) -> Option<Vec<u8>> {
    if s.len() < 32 || s.len() % 4 != 0 {
        return None;
    }

    if s.as_bytes()[..32].contains(&b' ') {
        return None;
    }

    STANDARD.decode(s).ok()
}

/// Inspect a JSON string value for data types that were stringified on the
/// way in: the special float names, integers outside the JSON/JavaScript
/// safe range, and base64 binary.
pub(crate) fn sniff_string(s: &str) -> Sniffed {
    match s {
        "NaN" => return Sniffed::F64(f64::NAN),
        "Infinity" => return Sniffed::F64(f64::INFINITY),
        "-Infinity" => return Sniffed::F64(f64::NEG_INFINITY),
        _ => (),
    }

    if let Ok(v) = s.parse::<i64>() {
        return Sniffed::I64(v);
    }

    if let Ok(v) = s.parse::<u64>() {
        return Sniffed::U64(v);
    }

    if let Some(bytes) = try_base64(s) {
        return Sniffed::Bytes(bytes);
    }

    Sniffed::Str
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_floats() {
        assert!(matches!(sniff_string("NaN"), Sniffed::F64(v) if v.is_nan()));
        assert!(matches!(sniff_string("Infinity"), Sniffed::F64(v) if v == f64::INFINITY));
        assert!(matches!(
            sniff_string("-Infinity"),
            Sniffed::F64(v) if v == f64::NEG_INFINITY
        ));
    }

    #[test]
    fn test_integers() {
        assert!(matches!(
            sniff_string("-9223372036854775808"),
            Sniffed::I64(i64::MIN)
        ));
        assert!(matches!(
            sniff_string("18446744073709551615"),
            Sniffed::U64(u64::MAX)
        ));
        assert!(matches!(sniff_string("12.5"), Sniffed::Str));
    }

    #[test]
    fn test_base64() {
        let data = vec![0xA5u8; 33];
        let encoded = STANDARD.encode(&data);
        assert!(encoded.len() >= 32 && encoded.len() % 4 == 0);
        match sniff_string(&encoded) {
            Sniffed::Bytes(b) => assert_eq!(b, data),
            _ => panic!("expected bytes"),
        }

        // short strings and prose are left alone
        assert!(matches!(sniff_string("QUJD"), Sniffed::Str));
        assert!(matches!(
            sniff_string("this is a plain sentence of thirty-six."),
            Sniffed::Str
        ));
    }
}
