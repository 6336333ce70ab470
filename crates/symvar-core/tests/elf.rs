//! Tests for loading debug info from ELF images

mod support;

use object::write::Object;
use object::{BinaryFormat, Endianness, SectionKind};
use support::{addr, populate_types, FixtureBuilder, UNIT_NAME};
use symvar_core::prelude::*;

/// An ARM ELF carrying the types sketch, linked flat at address 0
fn arm_elf() -> Vec<u8>
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, 0);
    populate_types(&mut builder);

    let mut elf = Object::new(BinaryFormat::Elf, object::Architecture::Arm, Endianness::Little);
    for (name, data) in builder.into_sections() {
        let section = elf.add_section(Vec::new(), name.as_bytes().to_vec(), SectionKind::Debug);
        elf.set_section_data(section, data, 1);
    }
    elf.write().unwrap()
}

fn empty_elf() -> Vec<u8>
{
    let mut elf = Object::new(BinaryFormat::Elf, object::Architecture::Arm, Endianness::Little);
    let text = elf.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    elf.set_section_data(text, vec![0u8; 4], 4);
    elf.write().unwrap()
}

#[test]
fn test_parse_elf()
{
    let debug = DebugInfo::parse(&arm_elf()).unwrap();
    assert_eq!(debug.architecture(), Architecture::Arm);
    assert_eq!(debug.memory_map(), MemoryMap::flat());
    assert_eq!(debug.compile_unit_names().unwrap(), [UNIT_NAME]);
}

#[test]
fn test_flat_map_uses_absolute_addresses()
{
    let debug = DebugInfo::parse(&arm_elf()).unwrap();
    let memory = SparseMemory::new();
    let globals = Globals::new(&debug, &memory, UNIT_NAME).unwrap();

    let v5 = globals.variable("v5").unwrap().into_primitive().unwrap();
    assert_eq!(v5.location().unwrap(), Address::new(addr::V5));
    v5.write(Value::Float(-1.25)).unwrap();
    assert_eq!(v5.read().unwrap(), Value::Float(-1.25));
}

#[test]
fn test_no_debug_info()
{
    assert!(matches!(DebugInfo::parse(&empty_elf()), Err(SymvarError::NoDebugInfo(_))));
}

#[test]
fn test_not_an_object_file()
{
    assert!(matches!(DebugInfo::parse(b"definitely not an ELF"), Err(SymvarError::Object(_))));
}

#[test]
fn test_open_from_disk()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("firmware.elf");
    std::fs::write(&path, arm_elf()).unwrap();

    let debug = DebugInfo::open(&path).unwrap();
    assert_eq!(debug.origin(), path.display().to_string());
    assert!(debug.compile_unit(UNIT_NAME).is_ok());
    assert!(matches!(debug.compile_unit("missing.c"), Err(SymvarError::UnknownCompileUnit(_))));
}

#[test]
fn test_open_missing_file()
{
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DebugInfo::open(dir.path().join("missing.elf")),
        Err(SymvarError::Io(_))
    ));
}
