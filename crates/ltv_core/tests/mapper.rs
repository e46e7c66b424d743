//! Round-trip and mapping-rule tests for the serde data format.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use ltv_core::{
    deserialize, serialize, to_writer, Decoder, LtvError, LtvStruct, LtvValue, RawLtv,
};

#[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
struct Team {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Colors")]
    colors: Vec<String>,
}

#[test]
fn test_small_struct_round_trip() {
    let team = Team {
        id: 1,
        name: "Reds".to_string(),
        colors: ["Crimson", "Red", "Ruby", "Maroon"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };

    let bytes = serialize(&team).unwrap();
    assert_eq!(
        hex::encode(&bytes),
        "1041024944a00141044e616d654104526564734106436f6c6f7273\
         2041074372696d736f6e410352656441045275627941064d61726f6f6e3030",
    );

    let back: Team = deserialize(&bytes).unwrap();
    assert_eq!(back, team);
}

#[test]
fn test_goldilocks_struct_field() {
    #[derive(Serialize)]
    struct S {
        n: i64,
    }

    // i64 field with a small value emits as I8.
    let bytes = serialize(&S { n: 5 }).unwrap();
    assert_eq!(bytes, [0x10, 0x40, b'n', 0xA0, 0x05, 0x30]);

    let bytes = serialize(&S { n: 300 }).unwrap();
    assert_eq!(bytes, [0x10, 0x40, b'n', 0xB0, 0x2C, 0x01, 0x30]);
}

#[test]
fn test_typed_vector_marshal() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Samples {
        xs: Vec<u16>,
    }

    let s = Samples { xs: vec![1, 2, 3] };
    let bytes = serialize(&s).unwrap();

    // The sequence commits as a U16 vector, padded onto an even offset:
    // struct, "xs", nop, tag 0x71, length 6, payload.
    assert_eq!(
        bytes,
        [
            0x10, 0x41, 0x02, b'x', b's', 0xFF, 0x71, 0x06, 1, 0, 2, 0, 3, 0, 0x30
        ]
    );

    assert_eq!(deserialize::<Samples>(&bytes).unwrap(), s);
}

#[test]
fn test_declared_width_wins_in_vectors() {
    // Small values in a Vec<i64> still emit as an I64 vector.
    let bytes = serialize(&vec![1i64, 2]).unwrap();
    let v = LtvValue::decode(&bytes).unwrap();
    assert_eq!(v, LtvValue::I64Vec(vec![1, 2]));
}

#[test]
fn test_string_sequences_stay_lists() {
    let bytes = serialize(&vec!["a".to_string(), "bc".to_string()]).unwrap();
    let v = LtvValue::decode(&bytes).unwrap();
    assert_eq!(
        v,
        LtvValue::List(vec![LtvValue::from("a"), LtvValue::from("bc")])
    );
}

#[test]
fn test_bytes_and_bool_vectors() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct S {
        flags: Vec<bool>,
        blob: Vec<u8>,
    }

    let s = S {
        flags: vec![true, false, true],
        blob: vec![9, 8, 7],
    };

    let bytes = serialize(&s).unwrap();
    let back: S = deserialize(&bytes).unwrap();
    assert_eq!(back, s);

    match LtvValue::decode(&bytes).unwrap() {
        LtvValue::Struct(st) => {
            assert_eq!(st.get("flags"), Some(&LtvValue::BoolVec(vec![true, false, true])));
            assert_eq!(st.get("blob"), Some(&LtvValue::U8Vec(vec![9, 8, 7])));
        }
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn test_map_keys_sorted() {
    let mut m = HashMap::new();
    m.insert("zeta".to_string(), 1u8);
    m.insert("alpha".to_string(), 2u8);
    m.insert("mid".to_string(), 3u8);

    let bytes = serialize(&m).unwrap();

    match LtvValue::decode(&bytes).unwrap() {
        LtvValue::Struct(s) => {
            assert_eq!(s.keys().collect::<Vec<_>>(), ["alpha", "mid", "zeta"]);
        }
        other => panic!("expected struct, got {other:?}"),
    }

    // Deterministic: a BTreeMap with the same contents encodes identically.
    let b: BTreeMap<String, u8> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
    assert_eq!(serialize(&b).unwrap(), bytes);
}

#[test]
fn test_integer_map_keys_stringified() {
    let mut m = BTreeMap::new();
    m.insert(7u32, true);
    m.insert(11u32, false);

    let bytes = serialize(&m).unwrap();
    match LtvValue::decode(&bytes).unwrap() {
        LtvValue::Struct(s) => {
            // lexicographic order on the stringified keys
            assert_eq!(s.keys().collect::<Vec<_>>(), ["11", "7"]);
        }
        other => panic!("expected struct, got {other:?}"),
    }

    let back: BTreeMap<u32, bool> = deserialize(&bytes).unwrap();
    assert_eq!(back, m);
}

#[test]
fn test_unsupported_map_key() {
    let mut m = HashMap::new();
    m.insert(1.5f64.to_bits(), 1u8); // fine: u64 key
    serialize(&m).unwrap();

    let mut m = HashMap::new();
    m.insert(vec![1u8], 1u8);
    assert!(matches!(
        serialize(&m),
        Err(LtvError::UnsupportedType("map key"))
    ));
}

#[test]
fn test_omitempty_and_defaults() {
    #[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
    struct S {
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        xs: Vec<u32>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        note: Option<String>,
        n: u8,
    }

    let s = S {
        xs: vec![],
        note: None,
        n: 3,
    };

    let bytes = serialize(&s).unwrap();
    // only "n" makes it onto the wire
    assert_eq!(bytes, [0x10, 0x40, b'n', 0x60, 0x03, 0x30]);
    assert_eq!(deserialize::<S>(&bytes).unwrap(), s);
}

#[test]
fn test_option_nil_round_trip() {
    let bytes = serialize(&Option::<u8>::None).unwrap();
    assert_eq!(bytes, [0x00]);
    assert_eq!(deserialize::<Option<u8>>(&bytes).unwrap(), None);

    let bytes = serialize(&Some(5u8)).unwrap();
    assert_eq!(bytes, [0x60, 0x05]);
    assert_eq!(deserialize::<Option<u8>>(&bytes).unwrap(), Some(5));
}

#[test]
fn test_nil_reads_as_empty_sequence_and_map() {
    let nil = [0x00];
    assert_eq!(deserialize::<Vec<u32>>(&nil).unwrap(), Vec::<u32>::new());
    assert_eq!(
        deserialize::<HashMap<String, u8>>(&nil).unwrap(),
        HashMap::new()
    );
}

#[test]
fn test_enum_forms() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Shape {
        Point,
        Circle(f64),
        Rect { w: u32, h: u32 },
        Pair(u8, u8),
    }

    for shape in [
        Shape::Point,
        Shape::Circle(2.5),
        Shape::Rect { w: 3, h: 4 },
        Shape::Pair(1, 2),
    ] {
        let bytes = serialize(&shape).unwrap();
        assert_eq!(deserialize::<Shape>(&bytes).unwrap(), shape);
    }

    // A unit variant is just its name on the wire.
    let bytes = serialize(&Shape::Point).unwrap();
    assert_eq!(LtvValue::decode(&bytes).unwrap(), LtvValue::from("Point"));
}

#[test]
fn test_scalar_overflow_checks() {
    // I16 300 does not fit a u8 target.
    let bytes = serialize(&300i64).unwrap();
    assert!(deserialize::<u8>(&bytes).is_err());

    // negative signed value into an unsigned target
    let bytes = serialize(&-1i64).unwrap();
    assert!(deserialize::<u32>(&bytes).is_err());

    // unsigned over the signed max
    let bytes = serialize(&u64::MAX).unwrap();
    assert!(deserialize::<i64>(&bytes).is_err());

    // in-range cross-sign conversions are fine
    let bytes = serialize(&42i64).unwrap();
    assert_eq!(deserialize::<u8>(&bytes).unwrap(), 42);
}

#[test]
fn test_vector_element_conversions() {
    // widening: U8 vector into Vec<u16>
    let bytes = serialize(&vec![1u8, 2, 3]).unwrap();
    assert_eq!(deserialize::<Vec<u16>>(&bytes).unwrap(), vec![1, 2, 3]);

    // narrowing with an out-of-range element fails
    let bytes = serialize(&vec![1i16, 400]).unwrap();
    assert!(deserialize::<Vec<i8>>(&bytes).is_err());

    // float width conversions are element-wise
    let bytes = serialize(&vec![0.5f64, 1.5]).unwrap();
    assert_eq!(deserialize::<Vec<f32>>(&bytes).unwrap(), vec![0.5, 1.5]);
}

#[test]
fn test_borrowed_strings_and_bytes() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct S<'a> {
        name: &'a str,
        #[serde(with = "serde_bytes_shim")]
        blob: &'a [u8],
    }

    // A tiny stand-in for serde_bytes: serialize as bytes, deserialize
    // borrowed.
    mod serde_bytes_shim {
        use serde::de::{Deserializer, Error, Visitor};
        use serde::Serializer;

        pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
            s.serialize_bytes(v)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<&'de [u8], D::Error> {
            struct V;
            impl<'de> Visitor<'de> for V {
                type Value = &'de [u8];
                fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str("borrowed bytes")
                }
                fn visit_borrowed_bytes<E: Error>(self, v: &'de [u8]) -> Result<&'de [u8], E> {
                    Ok(v)
                }
            }
            d.deserialize_bytes(V)
        }
    }

    let s = S {
        name: "zero-copy",
        blob: &[1, 2, 3, 4],
    };

    let bytes = serialize(&s).unwrap();
    let back: S = deserialize(&bytes).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_ltv_value_round_trip_through_serde() {
    let mut s = LtvStruct::new();
    s.set("width", LtvValue::U16(7)).unwrap();
    s.set("xs", LtvValue::U16Vec(vec![1, 2])).unwrap();
    s.set("zz", LtvValue::from("last")).unwrap();
    s.set("aa", LtvValue::from("first-inserted-late")).unwrap();

    let value = LtvValue::Struct(s);
    let bytes = serialize(&value).unwrap();

    // Exact round trip: widths kept, insertion order kept.
    let back: LtvValue = deserialize(&bytes).unwrap();
    assert_eq!(back, value);

    // And the serde encoding matches the native one.
    assert_eq!(bytes, value.encode());
}

#[test]
fn test_raw_ltv_splice_and_span() {
    #[derive(Serialize, Deserialize)]
    struct S<'a> {
        n: u8,
        #[serde(borrow, bound(deserialize = "'a: 'de"))]
        raw: RawLtv<'a>,
    }

    let inner = serialize(&vec![5u32, 6]).unwrap();
    let s = S {
        n: 1,
        raw: RawLtv { bytes: &inner },
    };

    let bytes = serialize(&s).unwrap();

    // The spliced element decodes as a normal value.
    match LtvValue::decode(&bytes).unwrap() {
        LtvValue::Struct(st) => {
            assert_eq!(st.get("raw"), Some(&LtvValue::U32Vec(vec![5, 6])));
        }
        other => panic!("expected struct, got {other:?}"),
    }

    // Deserializing hands back the raw span of the element: the tag
    // through the end of the payload. The splice's own leading alignment
    // no-ops sit before the tag, so they are not part of the span.
    let back: S = deserialize(&bytes).unwrap();
    let tag_at = inner.iter().position(|&b| b != 0xFF).unwrap();
    assert_eq!(back.raw.bytes, &inner[tag_at..]);

    // Invalid pre-encoded bytes are refused.
    let bad = S {
        n: 1,
        raw: RawLtv { bytes: &[0x13] },
    };
    assert!(serialize(&bad).is_err());
}

#[test]
fn test_marshal_depth_cap() {
    let mut v = LtvValue::List(vec![]);
    for _ in 0..1_100 {
        v = LtvValue::List(vec![v]);
    }

    assert!(matches!(
        serialize(&v),
        Err(LtvError::UnsupportedValue(_))
    ));
}

#[test]
fn test_to_writer_matches_serialize() {
    let team = Team {
        id: 42,
        name: "Blues".into(),
        colors: vec!["Azure".into()],
    };

    let mut out = Vec::new();
    to_writer(&mut out, &team).unwrap();
    assert_eq!(out, serialize(&team).unwrap());
}

#[test]
fn test_alignment_of_marshaled_vectors() {
    #[derive(Serialize)]
    struct S {
        pad: String,
        xs: Vec<f64>,
        ys: Vec<u32>,
    }

    let s = S {
        pad: "x".into(),
        xs: vec![1.0, 2.0, 3.0],
        ys: vec![7, 8],
    };

    let bytes = serialize(&s).unwrap();

    // Walk the buffer and check every vector payload offset. Containers
    // are walked into rather than skipped over.
    let mut d = Decoder::new(&bytes);
    let mut seen = 0;
    while let Some(desc) = d.next().unwrap() {
        let type_size = desc.type_code.size();
        if type_size == 0 {
            continue;
        }

        if desc.size_code != ltv_core::SizeCode::Single && type_size > 1 {
            let value_offset = desc.offset + 1 + desc.size_code.len_size();
            assert_eq!(value_offset % type_size, 0, "misaligned {desc:?}");
            seen += 1;
        }
        d.skip(&desc).unwrap();
    }
    assert_eq!(seen, 2);
}

#[test]
fn test_trailing_data_rejected() {
    let mut bytes = serialize(&1u8).unwrap();
    bytes.extend_from_slice(&[0x60, 0x02]);
    assert!(deserialize::<u8>(&bytes).is_err());
}

#[test]
fn test_tuples_are_lists() {
    let bytes = serialize(&(1u8, "two", true)).unwrap();
    let v = LtvValue::decode(&bytes).unwrap();
    assert_eq!(
        v,
        LtvValue::List(vec![
            LtvValue::U8(1),
            LtvValue::from("two"),
            LtvValue::Bool(true),
        ])
    );
}
