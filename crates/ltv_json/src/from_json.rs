//! JSON to LTV transcoder.

use std::io::{Read, Write};

use ltv_core::{LtvError, LtvWrite, StreamEncoder, TypeCode};
use serde_json::Value;

use crate::sniff::{sniff_string, Sniffed};
use crate::TranscodeResult;

// Integer range representable exactly in JSON/JavaScript numbers.
const JS_MAX_SAFE_INT: i64 = 9_007_199_254_740_991;
const JS_MIN_SAFE_INT: i64 = -9_007_199_254_740_991;

/// Transcode a JSON document to LTV.
///
/// Arrays holding one numeric or boolean kind become typed vectors at the
/// narrowest width that fits every element; everything else becomes a
/// generic list. Objects become structs (keys must be non-empty). String
/// values are sniffed for stringified numbers and base64 binary.
pub fn json_to_ltv<R: Read, W: Write>(reader: R, writer: W) -> TranscodeResult<()> {
    let value: Value = serde_json::from_reader(reader)?;

    let mut e = StreamEncoder::new(writer);
    write_json_value(&mut e, &value)?;

    match e.take_error() {
        None => Ok(()),
        Some(err) => Err(LtvError::Io(err).into()),
    }
}

fn write_json_value<E: LtvWrite>(e: &mut E, value: &Value) -> TranscodeResult<()> {
    match value {
        Value::Null => e.write_nil(),
        Value::Bool(b) => e.write_bool(*b),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                e.write_int(v);
            } else if let Some(v) = n.as_u64() {
                e.write_uint(v);
            } else if let Some(v) = n.as_f64() {
                e.write_f64(v);
            }
        }
        Value::String(s) => match sniff_string(s) {
            Sniffed::F64(v) => e.write_f64(v),
            Sniffed::I64(v) => e.write_int(v),
            Sniffed::U64(v) => e.write_uint(v),
            Sniffed::Bytes(b) => e.write_bytes(&b),
            Sniffed::Str => e.write_string(s),
        },
        Value::Array(items) => write_json_array(e, items)?,
        Value::Object(entries) => {
            e.write_struct_start();
            for (key, val) in entries {
                if key.is_empty() {
                    return Err(LtvError::BadKey.into());
                }
                e.write_string(key);
                write_json_value(e, val)?;
            }
            e.write_struct_end();
        }
    }

    Ok(())
}

/// The element kind a homogeneous array has settled on. The numeric kinds
/// upgrade along unsigned → signed → float while every element stays
/// representable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ArrayKind {
    Empty,
    Bool,
    Uint,
    Int,
    Float,
    /// Not a vector candidate: mixed kinds, strings, nulls or nesting.
    Collapsed,
}

struct ArrayScan {
    kind: ArrayKind,
    u_max: u64,
    i_min: i64,
    i_max: i64,
    /// An unsigned element exceeded the signed range.
    u_overflow: bool,
}

/// Decide whether `items` can commit as a typed vector, tracking bounds
/// for the narrowest-width fit.
fn scan_array(items: &[Value]) -> ArrayScan {
    let mut scan = ArrayScan {
        kind: ArrayKind::Empty,
        u_max: 0,
        i_min: i64::MAX,
        i_max: i64::MIN,
        u_overflow: false,
    };

    for item in items {
        let item_kind = match item {
            Value::Bool(_) => ArrayKind::Bool,
            Value::Number(n) => {
                if n.as_u64().is_some() {
                    ArrayKind::Uint
                } else if n.as_i64().is_some() {
                    ArrayKind::Int
                } else {
                    ArrayKind::Float
                }
            }
            // Stringified numbers keep array candidacy, plain strings and
            // everything else collapse it.
            Value::String(s) => match sniff_string(s) {
                Sniffed::F64(_) => ArrayKind::Float,
                Sniffed::I64(_) => ArrayKind::Int,
                Sniffed::U64(_) => ArrayKind::Uint,
                _ => ArrayKind::Collapsed,
            },
            _ => ArrayKind::Collapsed,
        };

        scan.kind = merge_kinds(scan.kind, item_kind);
        if scan.kind == ArrayKind::Collapsed {
            break;
        }

        // Track bounds in the merged kind's terms.
        match numeric_of(item) {
            Some(Numeric::Uint(v)) => {
                scan.u_max = scan.u_max.max(v);
                match i64::try_from(v) {
                    Ok(signed) => {
                        scan.i_min = scan.i_min.min(signed);
                        scan.i_max = scan.i_max.max(signed);
                    }
                    Err(_) => scan.u_overflow = true,
                }
            }
            Some(Numeric::Int(v)) => {
                scan.i_min = scan.i_min.min(v);
                scan.i_max = scan.i_max.max(v);
            }
            Some(Numeric::Float(_)) | None => (),
        }
    }

    // A signed commit cannot hold an unsigned element beyond i64.
    if scan.kind == ArrayKind::Int && scan.u_overflow {
        scan.kind = ArrayKind::Collapsed;
    }

    // A float commit folds integers in, which is only exact within the
    // JSON safe-integer range.
    if scan.kind == ArrayKind::Float
        && items.iter().any(|i| {
            matches!(numeric_of(i), Some(Numeric::Int(v)) if !(JS_MIN_SAFE_INT..=JS_MAX_SAFE_INT).contains(&v))
                || matches!(numeric_of(i), Some(Numeric::Uint(v)) if v > JS_MAX_SAFE_INT as u64)
        })
    {
        scan.kind = ArrayKind::Collapsed;
    }

    scan
}

enum Numeric {
    Uint(u64),
    Int(i64),
    Float(f64),
}

fn numeric_of(value: &Value) -> Option<Numeric> {
    let sniffed = match value {
        Value::Number(n) => {
            return if let Some(v) = n.as_u64() {
                Some(Numeric::Uint(v))
            } else if let Some(v) = n.as_i64() {
                Some(Numeric::Int(v))
            } else {
                n.as_f64().map(Numeric::Float)
            };
        }
        Value::String(s) => sniff_string(s),
        _ => return None,
    };

    match sniffed {
        Sniffed::U64(v) => Some(Numeric::Uint(v)),
        Sniffed::I64(v) => Some(Numeric::Int(v)),
        Sniffed::F64(v) => Some(Numeric::Float(v)),
        _ => None,
    }
}

fn merge_kinds(current: ArrayKind, item: ArrayKind) -> ArrayKind {
    use ArrayKind::*;

    match (current, item) {
        (Collapsed, _) | (_, Collapsed) => Collapsed,
        (Empty, k) => k,
        (k, i) if k == i => k,
        // unsigned upgrades to signed, and either upgrades to float
        (Uint, Int) | (Int, Uint) => Int,
        (Uint, Float) | (Float, Uint) => Float,
        (Int, Float) | (Float, Int) => Float,
        _ => Collapsed,
    }
}

fn write_json_array<E: LtvWrite>(e: &mut E, items: &[Value]) -> TranscodeResult<()> {
    let scan = scan_array(items);

    match scan.kind {
        ArrayKind::Bool => {
            let v: Vec<bool> = items.iter().filter_map(Value::as_bool).collect();
            e.write_vec_bool(&v);
        }
        ArrayKind::Uint => {
            let v: Vec<u64> = items
                .iter()
                .filter_map(|i| match numeric_of(i) {
                    Some(Numeric::Uint(v)) => Some(v),
                    _ => None,
                })
                .collect();
            write_uint_vector(e, &v, scan.u_max);
        }
        ArrayKind::Int => {
            let v: Vec<i64> = items
                .iter()
                .filter_map(|i| match numeric_of(i) {
                    Some(Numeric::Int(v)) => Some(v),
                    Some(Numeric::Uint(v)) => i64::try_from(v).ok(),
                    _ => None,
                })
                .collect();
            write_int_vector(e, &v, scan.i_min, scan.i_max);
        }
        ArrayKind::Float => {
            let v: Vec<f64> = items
                .iter()
                .filter_map(|i| match numeric_of(i) {
                    Some(Numeric::Float(v)) => Some(v),
                    Some(Numeric::Int(v)) => Some(v as f64),
                    Some(Numeric::Uint(v)) => Some(v as f64),
                    None => None,
                })
                .collect();
            e.write_vec_f64(&v);
        }
        ArrayKind::Empty | ArrayKind::Collapsed => {
            e.write_list_start();
            for item in items {
                write_json_value(e, item)?;
            }
            e.write_list_end();
        }
    }

    Ok(())
}

/// Commit an unsigned vector at the narrowest width holding its maximum.
fn write_uint_vector<E: LtvWrite>(e: &mut E, data: &[u64], max: u64) {
    if max <= u64::from(u8::MAX) {
        e.write_vector_prefix(TypeCode::U8, data.len());
        for &v in data {
            e.raw_write(&[v as u8]);
        }
    } else if max <= u64::from(u16::MAX) {
        e.write_vector_prefix(TypeCode::U16, data.len());
        for &v in data {
            e.raw_write_u16(v as u16);
        }
    } else if max <= u64::from(u32::MAX) {
        e.write_vector_prefix(TypeCode::U32, data.len());
        for &v in data {
            e.raw_write_u32(v as u32);
        }
    } else {
        e.write_vec_u64(data);
    }
}

/// Commit a signed vector at the narrowest width holding its bounds.
fn write_int_vector<E: LtvWrite>(e: &mut E, data: &[i64], min: i64, max: i64) {
    if min >= i64::from(i8::MIN) && max <= i64::from(i8::MAX) {
        e.write_vector_prefix(TypeCode::I8, data.len());
        for &v in data {
            e.raw_write(&[(v as i8) as u8]);
        }
    } else if min >= i64::from(i16::MIN) && max <= i64::from(i16::MAX) {
        e.write_vector_prefix(TypeCode::I16, data.len());
        for &v in data {
            e.raw_write_u16(v as i16 as u16);
        }
    } else if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
        e.write_vector_prefix(TypeCode::I32, data.len());
        for &v in data {
            e.raw_write_u32(v as i32 as u32);
        }
    } else {
        e.write_vec_i64(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltv_core::{Decoder, LtvValue};

    fn transcode(json: &str) -> Vec<u8> {
        let mut out = Vec::new();
        json_to_ltv(json.as_bytes(), &mut out).unwrap();
        out
    }

    fn decode(json: &str) -> LtvValue {
        Decoder::new(&transcode(json)).value().unwrap().unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(decode("null"), LtvValue::Nil);
        assert_eq!(decode("true"), LtvValue::Bool(true));
        assert_eq!(decode("5"), LtvValue::I8(5));
        assert_eq!(decode("300"), LtvValue::I16(300));
        assert_eq!(decode("-2.5"), LtvValue::F64(-2.5));
        assert_eq!(decode("\"hello\""), LtvValue::from("hello"));
    }

    #[test]
    fn test_stringified_values_sniffed() {
        assert_eq!(
            decode("\"18446744073709551615\""),
            LtvValue::U64(u64::MAX)
        );
        assert!(matches!(decode("\"NaN\""), LtvValue::F64(v) if v.is_nan()));
    }

    #[test]
    fn test_uint_array_narrows() {
        assert_eq!(decode("[1, 2, 3]"), LtvValue::U8Vec(vec![1, 2, 3]));
        assert_eq!(decode("[1, 300]"), LtvValue::U16Vec(vec![1, 300]));
        assert_eq!(
            decode("[1, 70000]"),
            LtvValue::U32Vec(vec![1, 70000])
        );
    }

    #[test]
    fn test_signed_array_narrows() {
        assert_eq!(decode("[-1, 2]"), LtvValue::I8Vec(vec![-1, 2]));
        assert_eq!(decode("[-1, 300]"), LtvValue::I16Vec(vec![-1, 300]));
    }

    #[test]
    fn test_float_array_folds_integers() {
        assert_eq!(decode("[1, 2.5]"), LtvValue::F64Vec(vec![1.0, 2.5]));
    }

    #[test]
    fn test_bool_array() {
        assert_eq!(
            decode("[true, false]"),
            LtvValue::BoolVec(vec![true, false])
        );
    }

    #[test]
    fn test_mixed_arrays_collapse_to_lists() {
        assert_eq!(
            decode("[1, \"two\"]"),
            LtvValue::List(vec![LtvValue::I8(1), LtvValue::from("two")])
        );

        assert_eq!(
            decode("[1, null]"),
            LtvValue::List(vec![LtvValue::I8(1), LtvValue::Nil])
        );

        // nested arrays are not multi-dimensional vectors
        assert_eq!(
            decode("[[1], [2]]"),
            LtvValue::List(vec![
                LtvValue::U8Vec(vec![1]),
                LtvValue::U8Vec(vec![2]),
            ])
        );
    }

    #[test]
    fn test_objects() {
        let v = decode(r#"{"id": 1, "name": "Reds"}"#);
        match v {
            LtvValue::Struct(s) => {
                assert_eq!(s.get("id"), Some(&LtvValue::I8(1)));
                assert_eq!(s.get("name"), Some(&LtvValue::from("Reds")));
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_object_key_rejected() {
        let mut out = Vec::new();
        assert!(json_to_ltv(br#"{"": 1}"#.as_slice(), &mut out).is_err());
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut e = ltv_core::Encoder::new();
        e.write_struct_start();
        e.write_string("xs");
        e.write_vec_u16(&[7, 300]);
        e.write_string("label");
        e.write_string("demo");
        e.write_struct_end();

        let mut json = Vec::new();
        crate::ltv_to_json(e.bytes(), &mut json, false).unwrap();

        let mut back = Vec::new();
        json_to_ltv(json.as_slice(), &mut back).unwrap();

        let v = Decoder::new(&back).value().unwrap().unwrap();
        match v {
            LtvValue::Struct(s) => {
                assert_eq!(s.get("xs"), Some(&LtvValue::U16Vec(vec![7, 300])));
                assert_eq!(s.get("label"), Some(&LtvValue::from("demo")));
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
