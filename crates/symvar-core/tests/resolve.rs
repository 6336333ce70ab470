//! Tests for type resolution edge cases

mod support;

use gimli::constants;
use gimli::write::AttributeValue;
use support::{types_image, FixtureBuilder, AVR_DATA_BASE, UNIT_NAME};
use symvar_core::prelude::*;

#[test]
fn test_pointer_is_unsupported()
{
    let debug = types_image();
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    match globals.variable("vv0") {
        Err(SymvarError::UnsupportedType(message)) => assert!(message.contains("pointer")),
        other => panic!("Expected UnsupportedType, got {other:?}"),
    }
}

#[test]
fn test_wide_integer_is_unsupported()
{
    let debug = types_image();
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    assert!(matches!(globals.variable("big"), Err(SymvarError::UnsupportedType(_))));
}

#[test]
fn test_union_is_unsupported()
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    let root = builder.root();
    let either_type = builder.add(root, constants::DW_TAG_union_type, vec![(
        constants::DW_AT_byte_size,
        AttributeValue::Data1(4),
    )]);
    builder.variable("either", either_type, 100);
    let debug = builder.build(Architecture::Avr);
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    assert!(matches!(globals.variable("either"), Err(SymvarError::UnsupportedType(_))));
}

#[test]
fn test_base_type_attribute_forms_are_checked()
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    let root = builder.root();
    let odd = builder.add(root, constants::DW_TAG_base_type, vec![
        (constants::DW_AT_name, AttributeValue::String(b"odd".to_vec())),
        (constants::DW_AT_byte_size, AttributeValue::Udata(1)),
        (constants::DW_AT_encoding, AttributeValue::Encoding(constants::DW_ATE_unsigned_char)),
    ]);
    let nameless = builder.add(root, constants::DW_TAG_base_type, vec![
        (constants::DW_AT_byte_size, AttributeValue::Data1(1)),
        (constants::DW_AT_encoding, AttributeValue::Data1(constants::DW_ATE_unsigned_char.0)),
    ]);
    builder.variable("odd_var", odd, 100);
    builder.variable("nameless_var", nameless, 101);
    let debug = builder.build(Architecture::Avr);
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    assert!(matches!(globals.variable("odd_var"), Err(SymvarError::MalformedDebugInfo(_))));
    assert!(matches!(globals.variable("nameless_var"), Err(SymvarError::MalformedDebugInfo(_))));
}

#[test]
fn test_udata_encoding_is_rejected()
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    let root = builder.root();
    // `AttributeValue::Encoding` is written as DW_FORM_udata
    let wide_form = builder.add(root, constants::DW_TAG_base_type, vec![
        (constants::DW_AT_name, AttributeValue::String(b"unsigned char".to_vec())),
        (constants::DW_AT_byte_size, AttributeValue::Data1(1)),
        (constants::DW_AT_encoding, AttributeValue::Encoding(constants::DW_ATE_unsigned_char)),
    ]);
    let data1_form = builder.base_type("unsigned char", constants::DW_ATE_unsigned_char, 1);
    builder.variable("udata_encoded", wide_form, 100);
    builder.variable("data1_encoded", data1_form, 101);
    let debug = builder.build(Architecture::Avr);
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    match globals.variable("udata_encoded") {
        Err(SymvarError::MalformedDebugInfo(message)) => assert!(message.contains("DW_AT_encoding")),
        other => panic!("Expected MalformedDebugInfo, got {other:?}"),
    }
    let accepted = globals.variable("data1_encoded").unwrap().into_primitive().unwrap();
    assert_eq!(accepted.kind(), PrimitiveKind::UInt8);
}

#[test]
fn test_missing_type_reference()
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    let root = builder.root();
    builder.add(root, constants::DW_TAG_variable, vec![(
        constants::DW_AT_name,
        AttributeValue::String(b"untyped".to_vec()),
    )]);
    let debug = builder.build(Architecture::Avr);
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    assert!(matches!(globals.variable("untyped"), Err(SymvarError::MalformedDebugInfo(_))));
}

#[test]
fn test_typedef_chain_depth_is_bounded()
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    let uchar = builder.base_type("unsigned char", constants::DW_ATE_unsigned_char, 1);

    let mut shallow = uchar;
    for level in 0..8 {
        shallow = builder.typedef(&format!("shallow{level}"), shallow);
    }
    let mut deep = uchar;
    for level in 0..40 {
        deep = builder.typedef(&format!("deep{level}"), deep);
    }
    builder.variable("shallow", shallow, 100);
    builder.variable("deep", deep, 101);
    let debug = builder.build(Architecture::Avr);
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    let shallow = globals.variable("shallow").unwrap().into_primitive().unwrap();
    assert_eq!(shallow.kind(), PrimitiveKind::UInt8);
    assert!(matches!(globals.variable("deep"), Err(SymvarError::MalformedDebugInfo(_))));
}

#[test]
fn test_class_type_is_a_struct()
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    let uchar = builder.base_type("unsigned char", constants::DW_ATE_unsigned_char, 1);
    let root = builder.root();
    let class = builder.add(root, constants::DW_TAG_class_type, vec![(
        constants::DW_AT_byte_size,
        AttributeValue::Data1(2),
    )]);
    builder.member(class, "first", uchar, 0);
    builder.member(class, "second", uchar, 1);
    builder.variable("object", class, 200);
    let debug = builder.build(Architecture::Avr);
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    let object = globals.variable("object").unwrap().into_struct().unwrap();
    assert_eq!(object.member("second").unwrap().location().unwrap(), Address::new(201));
}
