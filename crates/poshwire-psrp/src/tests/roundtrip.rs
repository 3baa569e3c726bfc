//! Structural round-trip coverage: `deserialize(serialize(v)) == v` for
//! the whole primitive set and representative object shapes, plus
//! model-level idempotence for decoder output.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsDateTime, PsDuration, PsEnum,
    PsPrimitiveValue, PsString, PsType, PsValue,
};
use crate::registry::TypeRegistry;
use crate::{deserialize_clixml, deserialize_clixml_with, serialize_clixml};

fn assert_round_trip(value: &PsValue) {
    let xml = serialize_clixml(std::slice::from_ref(value)).unwrap();
    let decoded = deserialize_clixml(&xml).unwrap();
    assert_eq!(decoded.as_slice(), std::slice::from_ref(value), "xml was: {xml}");
}

#[test]
fn primitives_round_trip() {
    let naive = NaiveDate::from_ymd_opt(2023, 6, 15)
        .unwrap()
        .and_hms_opt(10, 20, 30)
        .unwrap();

    let values = [
        PsValue::from("plain text"),
        PsValue::from(PsPrimitiveValue::Char('Ω')),
        PsValue::from(true),
        PsValue::from(false),
        PsValue::from(PsPrimitiveValue::SByte(-5)),
        PsValue::from(PsPrimitiveValue::Byte(200)),
        PsValue::from(PsPrimitiveValue::I16(-1234)),
        PsValue::from(PsPrimitiveValue::U16(65535)),
        PsValue::from(i32::MIN),
        PsValue::from(u32::MAX),
        PsValue::from(i64::MAX),
        PsValue::from(u64::MAX),
        PsValue::from(1.5f32),
        PsValue::from(-2.25f64),
        PsValue::from(PsPrimitiveValue::Decimal("79228162514264337593543950335".to_string())),
        PsValue::from(PsDateTime::Utc(DateTime::from_naive_utc_and_offset(naive, Utc))),
        PsValue::from(PsDuration::from_nanos(90_061_000_000_500)),
        PsValue::from(vec![0u8, 1, 2, 254, 255]),
        PsValue::from(Uuid::new_v4()),
        PsValue::from(PsPrimitiveValue::Uri("https://example.com/a?b=c".to_string())),
        PsValue::from(PsPrimitiveValue::Version("1.2.3.4".to_string())),
        PsValue::from(PsPrimitiveValue::ScriptBlock("Get-Date".to_string())),
        PsValue::NULL,
    ];

    for value in &values {
        assert_round_trip(value);
    }
}

#[test]
fn special_floats_round_trip() {
    for value in [
        PsValue::from(f64::INFINITY),
        PsValue::from(f64::NEG_INFINITY),
        PsValue::from(f32::INFINITY),
    ] {
        assert_round_trip(&value);
    }

    // NaN never compares equal; check the tag survives instead
    let xml = serialize_clixml(&[PsValue::from(f64::NAN)]).unwrap();
    assert_eq!(xml, "<Db>NaN</Db>");
    let decoded = deserialize_clixml(&xml).unwrap();
    match &decoded[0] {
        PsValue::Primitive(PsPrimitiveValue::Double(v)) => assert!(v.is_nan()),
        other => panic!("expected Double, got {other:?}"),
    }
}

#[test]
fn control_characters_round_trip() {
    assert_round_trip(&PsValue::from("tab\there\nnewline\rreturn"));
    assert_round_trip(&PsValue::from(PsPrimitiveValue::Str(PsString::from_units(
        vec![0x0000, 0x001F, 0x007F],
    ))));
}

#[test]
fn containers_round_trip() {
    assert_round_trip(&PsValue::list([1, 2, 3]));
    assert_round_trip(&PsValue::dict([
        (PsValue::from("one"), PsValue::from(1)),
        (PsValue::from(2), PsValue::list(["nested"])),
    ]));

    let queue = PsValue::Object(ComplexObject {
        type_def: Some(PsType::queue()),
        content: ComplexObjectContent::Container(Container::Queue(vec![
            PsValue::from("first"),
            PsValue::from("second"),
        ])),
        ..ComplexObject::default()
    });
    assert_round_trip(&queue);
}

#[test]
fn object_with_both_property_surfaces_round_trips() {
    let mut obj = ComplexObject::new();
    obj.to_string = Some("display".to_string());
    obj.insert_adapted("Native", 10);
    obj.insert_extended("Added", "later");
    obj.insert_extended("Nested", PsValue::list(["x"]));
    assert_round_trip(&PsValue::Object(obj));
}

#[test]
fn registered_type_rehydrates() {
    let ps_type = PsType::new(["Contoso.Widget", "System.Object"]);
    let mut obj = ComplexObject::with_type(ps_type.clone());
    obj.insert_extended("Id", 7);
    let value = PsValue::Object(obj);

    let xml = serialize_clixml(std::slice::from_ref(&value)).unwrap();

    let mut registry = TypeRegistry::default();
    registry.register(ps_type, true);
    let decoded = deserialize_clixml_with(&xml, &registry, None).unwrap();
    assert_eq!(decoded, vec![value]);
}

#[test]
fn unregistered_type_deserializes_generically() {
    let mut obj = ComplexObject::with_type(PsType::new(["Contoso.Widget", "System.Object"]));
    obj.to_string = Some("a widget".to_string());
    obj.insert_extended("Id", 7);

    let xml = serialize_clixml(&[PsValue::Object(obj)]).unwrap();
    let decoded = deserialize_clixml(&xml).unwrap();
    let decoded_obj = decoded[0].as_object().unwrap();

    assert_eq!(
        decoded_obj.type_def.as_ref().unwrap().leading(),
        Some("Deserialized.Contoso.Widget")
    );
    // ToString and properties are preserved on the generic path
    assert_eq!(decoded_obj.to_string.as_deref(), Some("a widget"));
    assert_eq!(decoded_obj.property("Id"), Some(&PsValue::from(7)));
}

#[test]
fn enum_round_trips_through_registry() {
    let value = PsValue::Object(ComplexObject {
        type_def: Some(PsType::pipeline_result_types()),
        to_string: Some("Error".to_string()),
        content: ComplexObjectContent::Enum(PsEnum::new(2)),
        ..ComplexObject::default()
    });
    assert_round_trip(&value);
}

#[test]
fn oracle_clixml_is_model_level_idempotent() {
    // shaped like PowerShell 5.1 output for `Get-Date | Select ...`
    let oracle = concat!(
        "<Obj RefId=\"0\"><TN RefId=\"0\">",
        "<T>System.Management.Automation.PSCustomObject</T><T>System.Object</T></TN>",
        "<MS><S N=\"Name\">pwsh</S><I32 N=\"Count\">3</I32>",
        "<Obj N=\"Items\" RefId=\"1\"><TN RefId=\"1\">",
        "<T>System.Collections.ArrayList</T><T>System.Object</T></TN>",
        "<LST><S>a</S><S>b</S></LST></Obj></MS></Obj>",
    );

    let first = deserialize_clixml(oracle).unwrap();
    let re_encoded = serialize_clixml(&first).unwrap();
    let second = deserialize_clixml(&re_encoded).unwrap();
    assert_eq!(first, second);
}

#[test]
fn multiple_documents_round_trip() {
    let values = vec![
        PsValue::from("first"),
        PsValue::list([1, 2]),
        PsValue::NULL,
    ];
    let xml = serialize_clixml(&values).unwrap();
    assert_eq!(deserialize_clixml(&xml).unwrap(), values);
}
