use std::borrow::Cow;

use crate::{Amf0Decoder, Amf0Encoder, Amf0Value};

fn round_trip(value: &Amf0Value<'_>) -> Amf0Value<'static> {
    let mut buf = Vec::new();
    Amf0Encoder::encode(&mut buf, value).unwrap();
    let mut decoder = Amf0Decoder::new(&buf);
    decoder.decode_any().unwrap().into_owned()
}

#[test]
fn round_trips_number() {
    let v = Amf0Value::Number(123.5);
    assert_eq!(round_trip(&v), v.clone().into_owned());
}

#[test]
fn round_trips_string() {
    let v = Amf0Value::String(Cow::Borrowed("cam1"));
    assert_eq!(round_trip(&v), v.into_owned());
}

#[test]
fn round_trips_booleans() {
    for b in [true, false] {
        let v = Amf0Value::Boolean(b);
        assert_eq!(round_trip(&v), v);
    }
}

#[test]
fn round_trips_null_and_undefined() {
    assert_eq!(round_trip(&Amf0Value::Null), Amf0Value::Null);
    assert_eq!(round_trip(&Amf0Value::Undefined), Amf0Value::Undefined);
}

#[test]
fn object_preserves_key_insertion_order() {
    let pairs: Vec<(Cow<str>, Amf0Value)> = vec![
        (Cow::Borrowed("level"), Amf0Value::String(Cow::Borrowed("status"))),
        (Cow::Borrowed("code"), Amf0Value::String(Cow::Borrowed("NetStream.Play.Start"))),
        (Cow::Borrowed("description"), Amf0Value::String(Cow::Borrowed("Start publishing"))),
    ];
    let v = Amf0Value::Object(Cow::Owned(pairs.clone()));

    let decoded = round_trip(&v);
    let Amf0Value::Object(decoded_pairs) = decoded else {
        panic!("expected object");
    };

    let keys: Vec<&str> = decoded_pairs.iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(keys, vec!["level", "code", "description"]);
}

#[test]
fn ecma_array_round_trips_like_object() {
    let pairs: Vec<(Cow<str>, Amf0Value)> = vec![(Cow::Borrowed("width"), Amf0Value::Number(1280.0))];
    let v = Amf0Value::EcmaArray(Cow::Owned(pairs));
    let decoded = round_trip(&v);
    assert_eq!(decoded.get("width").and_then(|v| v.as_f64()), Some(1280.0));
}

#[test]
fn strict_array_round_trips() {
    let v = Amf0Value::StrictArray(Cow::Owned(vec![Amf0Value::Number(1.0), Amf0Value::Boolean(true)]));
    let decoded = round_trip(&v);
    let Amf0Value::StrictArray(values) = decoded else {
        panic!("expected array");
    };
    assert_eq!(values.len(), 2);
}

#[test]
fn date_round_trips_ignoring_timezone_semantics() {
    let v = Amf0Value::Date { unix_ms: 1000.0, timezone: 0 };
    assert_eq!(round_trip(&v), v);
}

#[test]
fn long_string_round_trips() {
    let long = "x".repeat(100_000);
    let v = Amf0Value::LongString(Cow::Owned(long.clone()));
    let decoded = round_trip(&v);
    assert_eq!(decoded.as_str(), Some(long.as_str()));
}

#[test]
fn decode_all_consumes_a_full_command_sequence() {
    let mut buf = Vec::new();
    Amf0Encoder::encode_string(&mut buf, "connect").unwrap();
    Amf0Encoder::encode_number(&mut buf, 1.0).unwrap();
    Amf0Encoder::encode_object(&mut buf, &[(Cow::Borrowed("app"), Amf0Value::String(Cow::Borrowed("live")))]).unwrap();

    let mut decoder = Amf0Decoder::new(&buf);
    let values = decoder.decode_all().unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].as_str(), Some("connect"));
    assert_eq!(values[1].as_f64(), Some(1.0));
    assert_eq!(values[2].get("app").and_then(|v| v.as_str()), Some("live"));
}

#[test]
fn nested_object_in_ecma_array_round_trips() {
    let mut buf = Vec::new();
    let nested: Vec<(Cow<str>, Amf0Value)> = vec![(Cow::Borrowed("fmsVer"), Amf0Value::String(Cow::Borrowed("FMS/3,0,1,123")))];
    Amf0Encoder::encode_object(&mut buf, &nested).unwrap();

    let mut decoder = Amf0Decoder::new(&buf);
    let decoded = decoder.decode_any().unwrap();
    assert_eq!(decoded.get("fmsVer").and_then(|v| v.as_str()), Some("FMS/3,0,1,123"));
}
