//! End-to-end transcoding tests between JSON text and LTV buffers.

use ltv_core::{serialize, Encoder, LtvValue, LtvWrite};
use ltv_json::{json_to_ltv, ltv_to_json};

fn to_json(bytes: &[u8], pretty: bool) -> String {
    let mut out = Vec::new();
    ltv_to_json(bytes, &mut out, pretty).unwrap();
    String::from_utf8(out).unwrap()
}

fn to_ltv(json: &str) -> Vec<u8> {
    let mut out = Vec::new();
    json_to_ltv(json.as_bytes(), &mut out).unwrap();
    out
}

#[test]
fn test_marshaled_struct_to_json() {
    #[derive(serde::Serialize)]
    struct Team {
        #[serde(rename = "ID")]
        id: i64,
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Colors")]
        colors: Vec<String>,
    }

    let bytes = serialize(&Team {
        id: 1,
        name: "Reds".into(),
        colors: vec!["Crimson".into(), "Red".into()],
    })
    .unwrap();

    assert_eq!(
        to_json(&bytes, false),
        r#"{"ID":1,"Name":"Reds","Colors":["Crimson","Red"]}"#
    );
}

#[test]
fn test_json_ltv_json_stability() {
    // Once through json -> ltv -> json, further round trips are stable.
    let original = r#"{"counts":[1,2,300],"label":"demo","nested":{"ok":true}}"#;

    let first = to_json(&to_ltv(original), false);
    let second = to_json(&to_ltv(&first), false);
    assert_eq!(first, second);

    let third = to_ltv(&second);
    assert_eq!(third, to_ltv(&first));
}

#[test]
fn test_big_integers_survive_the_json_detour() {
    let mut e = Encoder::new();
    e.write_u64(u64::MAX);
    let json = to_json(e.bytes(), false);
    assert_eq!(json, "\"18446744073709551615\"");

    let back = to_ltv(&json);
    assert_eq!(LtvValue::decode(&back).unwrap(), LtvValue::U64(u64::MAX));
}

#[test]
fn test_special_floats_survive_the_json_detour() {
    let mut e = Encoder::new();
    e.write_f64(f64::NEG_INFINITY);
    let json = to_json(e.bytes(), false);
    assert_eq!(json, "\"-Infinity\"");

    let back = to_ltv(&json);
    assert!(matches!(
        LtvValue::decode(&back).unwrap(),
        LtvValue::F64(v) if v == f64::NEG_INFINITY
    ));
}

#[test]
fn test_typed_vector_detour() {
    let mut e = Encoder::new();
    e.write_vec_i16(&[-300, 5, 300]);
    let json = to_json(e.bytes(), false);
    assert_eq!(json, "[-300, 5, 300]");

    let back = to_ltv(&json);
    assert_eq!(
        LtvValue::decode(&back).unwrap(),
        LtvValue::I16Vec(vec![-300, 5, 300])
    );
}

#[test]
fn test_pretty_nested_output() {
    let mut e = Encoder::new();
    e.write_struct_start();
    e.write_string("xs");
    e.write_list_start();
    e.write_u8(1);
    e.write_list_end();
    e.write_struct_end();

    let pretty = to_json(e.bytes(), true);
    assert_eq!(pretty, "{\n    \"xs\":[\n        1\n    ]\n}");
}

#[test]
fn test_depth_limit_errors_cleanly() {
    let mut json = String::new();
    for _ in 0..20_000 {
        json.push('[');
    }
    for _ in 0..20_000 {
        json.push(']');
    }

    let mut out = Vec::new();
    assert!(json_to_ltv(json.as_bytes(), &mut out).is_err());
}
