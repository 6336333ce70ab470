//! DWARF fixtures built in memory with `gimli::write`.
//!
//! The layout of `types_image()` mirrors a small AVR sketch: a handful of
//! scalar globals, arrays, a struct, bit-fields, constants, and some globals
//! the resolver must refuse.

#![allow(dead_code)]

use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Expression, Sections, UnitEntryId};
use gimli::{constants, DwAte, DwTag, Encoding, Format, LittleEndian, RunTimeEndian};
use symvar_core::dwarf::DebugInfo;
use symvar_core::types::Architecture;

pub const UNIT_NAME: &str = "src/types.ino.cpp";
pub const AVR_DATA_BASE: u64 = 0x80_0000;

/// Memory-relative addresses of the globals in `types_image()`
pub mod addr
{
    pub const V1: u64 = 645;
    pub const V3: u64 = 643;
    pub const V4: u64 = 642;
    pub const V5: u64 = 638;
    pub const V7: u64 = 632;
    pub const V8: u64 = 628;
    pub const V10: u64 = 624;
    pub const V13: u64 = 617;
    pub const AV3: u64 = 608;
    pub const AV5: u64 = 591;
    pub const AV7: u64 = 585;
    pub const SV1: u64 = 522;
    pub const BITS: u64 = 700;
    pub const PACKED: u64 = 702;
    pub const BAD_BITS: u64 = 704;
    pub const TAIL: u64 = 8702;
}

pub struct FixtureBuilder
{
    dwarf: DwarfUnit,
    data_base: u64,
}

impl FixtureBuilder
{
    pub fn new(unit_name: &str, data_base: u64) -> Self
    {
        let encoding = Encoding {
            format: Format::Dwarf32,
            version: 4,
            address_size: 4,
        };
        let mut dwarf = DwarfUnit::new(encoding);
        let root = dwarf.unit.root();
        dwarf
            .unit
            .get_mut(root)
            .set(constants::DW_AT_name, AttributeValue::String(unit_name.as_bytes().to_vec()));
        Self { dwarf, data_base }
    }

    pub fn root(&self) -> UnitEntryId
    {
        self.dwarf.unit.root()
    }

    pub fn add(&mut self, parent: UnitEntryId, tag: DwTag, attrs: Vec<(gimli::DwAt, AttributeValue)>) -> UnitEntryId
    {
        let id = self.dwarf.unit.add(parent, tag);
        let entry = self.dwarf.unit.get_mut(id);
        for (name, value) in attrs {
            entry.set(name, value);
        }
        id
    }

    /// A base type whose name lives in `.debug_str`, like gcc emits it
    pub fn base_type(&mut self, name: &str, encoding: DwAte, byte_size: u8) -> UnitEntryId
    {
        let name = self.dwarf.strings.add(name);
        let root = self.root();
        self.add(root, constants::DW_TAG_base_type, vec![
            (constants::DW_AT_name, AttributeValue::StringRef(name)),
            (constants::DW_AT_byte_size, AttributeValue::Data1(byte_size)),
            (constants::DW_AT_encoding, AttributeValue::Data1(encoding.0)),
        ])
    }

    pub fn typedef(&mut self, name: &str, ty: UnitEntryId) -> UnitEntryId
    {
        let root = self.root();
        self.add(root, constants::DW_TAG_typedef, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
        ])
    }

    /// `const`, `volatile` or pointer wrapper around `ty`
    pub fn wrap(&mut self, tag: DwTag, ty: UnitEntryId) -> UnitEntryId
    {
        let root = self.root();
        self.add(root, tag, vec![(constants::DW_AT_type, AttributeValue::UnitRef(ty))])
    }

    pub fn structure(&mut self, name: &str, byte_size: u8) -> UnitEntryId
    {
        let root = self.root();
        self.add(root, constants::DW_TAG_structure_type, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_byte_size, AttributeValue::Data1(byte_size)),
        ])
    }

    /// A member located with `DW_OP_plus_uconst offset`
    pub fn member(&mut self, parent: UnitEntryId, name: &str, ty: UnitEntryId, offset: u64) -> UnitEntryId
    {
        let mut location = Expression::new();
        location.op_plus_uconst(offset);
        self.add(parent, constants::DW_TAG_member, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
            (constants::DW_AT_data_member_location, AttributeValue::Exprloc(location)),
        ])
    }

    /// A DWARF 2/3 style bit-field (`DW_AT_bit_offset` from the MSB)
    pub fn bit_member(
        &mut self,
        parent: UnitEntryId,
        name: &str,
        ty: UnitEntryId,
        offset: u64,
        bit_size: u8,
        bit_offset: u8,
    ) -> UnitEntryId
    {
        self.add(parent, constants::DW_TAG_member, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
            (constants::DW_AT_byte_size, AttributeValue::Data1(1)),
            (constants::DW_AT_bit_size, AttributeValue::Data1(bit_size)),
            (constants::DW_AT_bit_offset, AttributeValue::Data1(bit_offset)),
            (constants::DW_AT_data_member_location, AttributeValue::Udata(offset)),
        ])
    }

    /// A DWARF 4 style bit-field (`DW_AT_data_bit_offset` from the struct start)
    pub fn data_bit_member(
        &mut self,
        parent: UnitEntryId,
        name: &str,
        ty: UnitEntryId,
        bit_size: u8,
        data_bit_offset: u64,
    ) -> UnitEntryId
    {
        self.add(parent, constants::DW_TAG_member, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
            (constants::DW_AT_bit_size, AttributeValue::Data1(bit_size)),
            (constants::DW_AT_data_bit_offset, AttributeValue::Udata(data_bit_offset)),
        ])
    }

    /// One-dimensional array bounded by `DW_AT_upper_bound`
    pub fn array(&mut self, element: UnitEntryId, upper_bound: u64) -> UnitEntryId
    {
        self.array_with(element, &[(constants::DW_AT_upper_bound, upper_bound)])
    }

    /// One-dimensional array bounded by `DW_AT_count`
    pub fn counted_array(&mut self, element: UnitEntryId, count: u64) -> UnitEntryId
    {
        self.array_with(element, &[(constants::DW_AT_count, count)])
    }

    /// Array with one subrange per entry of `upper_bounds`
    pub fn matrix(&mut self, element: UnitEntryId, upper_bounds: &[u64]) -> UnitEntryId
    {
        let root = self.root();
        let array = self.add(root, constants::DW_TAG_array_type, vec![(
            constants::DW_AT_type,
            AttributeValue::UnitRef(element),
        )]);
        for bound in upper_bounds {
            self.add(array, constants::DW_TAG_subrange_type, vec![(
                constants::DW_AT_upper_bound,
                AttributeValue::Udata(*bound),
            )]);
        }
        array
    }

    fn array_with(&mut self, element: UnitEntryId, bound: &[(gimli::DwAt, u64)]) -> UnitEntryId
    {
        let root = self.root();
        let array = self.add(root, constants::DW_TAG_array_type, vec![(
            constants::DW_AT_type,
            AttributeValue::UnitRef(element),
        )]);
        let attrs = bound
            .iter()
            .map(|(name, value)| (*name, AttributeValue::Udata(*value)))
            .collect();
        self.add(array, constants::DW_TAG_subrange_type, attrs);
        array
    }

    /// A global at `data_base + offset`
    pub fn variable(&mut self, name: &str, ty: UnitEntryId, offset: u64) -> UnitEntryId
    {
        self.variable_at_absolute(name, ty, self.data_base + offset)
    }

    pub fn variable_at_absolute(&mut self, name: &str, ty: UnitEntryId, absolute: u64) -> UnitEntryId
    {
        let mut location = Expression::new();
        location.op_addr(Address::Constant(absolute));
        let root = self.root();
        self.add(root, constants::DW_TAG_variable, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
            (constants::DW_AT_external, AttributeValue::Flag(true)),
            (constants::DW_AT_location, AttributeValue::Exprloc(location)),
        ])
    }

    /// An `extern` global: a named declaration plus an unnamed definition
    /// pointing back at it through `DW_AT_specification`
    pub fn extern_variable(&mut self, name: &str, ty: UnitEntryId, offset: u64) -> UnitEntryId
    {
        let declaration = self.extern_declaration(name, ty);
        let mut location = Expression::new();
        location.op_addr(Address::Constant(self.data_base + offset));
        let root = self.root();
        self.add(root, constants::DW_TAG_variable, vec![
            (constants::DW_AT_specification, AttributeValue::UnitRef(declaration)),
            (constants::DW_AT_location, AttributeValue::Exprloc(location)),
        ])
    }

    /// A declaration without any definition in this unit
    pub fn extern_declaration(&mut self, name: &str, ty: UnitEntryId) -> UnitEntryId
    {
        let root = self.root();
        self.add(root, constants::DW_TAG_variable, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
            (constants::DW_AT_external, AttributeValue::Flag(true)),
            (constants::DW_AT_declaration, AttributeValue::Flag(true)),
        ])
    }

    /// A global folded into `DW_AT_const_value`
    pub fn constant(&mut self, name: &str, ty: UnitEntryId, value: AttributeValue) -> UnitEntryId
    {
        let root = self.root();
        self.add(root, constants::DW_TAG_variable, vec![
            (constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec())),
            (constants::DW_AT_type, AttributeValue::UnitRef(ty)),
            (constants::DW_AT_const_value, value),
        ])
    }

    /// Serialize every section, skipping empty ones
    pub fn into_sections(mut self) -> Vec<(&'static str, Vec<u8>)>
    {
        let mut sections = Sections::new(EndianVec::new(LittleEndian));
        self.dwarf.write(&mut sections).expect("DWARF should serialize");

        let mut out = Vec::new();
        sections
            .for_each(|id, data| {
                if !data.slice().is_empty() {
                    out.push((id.name(), data.slice().to_vec()));
                }
                Ok::<(), gimli::write::Error>(())
            })
            .expect("sections should be collected");
        out
    }

    pub fn build(self, architecture: Architecture) -> DebugInfo
    {
        DebugInfo::from_sections(architecture, RunTimeEndian::Little, self.into_sections())
            .expect("fixture should load")
    }
}

/// Populate `builder` with the globals of the types sketch
pub fn populate_types(builder: &mut FixtureBuilder)
{
    let boolean = builder.base_type("bool", constants::DW_ATE_boolean, 1);
    let uchar = builder.base_type("unsigned char", constants::DW_ATE_unsigned_char, 1);
    let schar = builder.base_type("char", constants::DW_ATE_signed_char, 1);
    let float = builder.base_type("float", constants::DW_ATE_float, 4);
    let int = builder.base_type("int", constants::DW_ATE_signed, 2);
    let long = builder.base_type("long int", constants::DW_ATE_signed, 4);
    let uint = builder.base_type("unsigned int", constants::DW_ATE_unsigned, 2);
    let ulong = builder.base_type("long unsigned int", constants::DW_ATE_unsigned, 4);
    let long_long = builder.base_type("long long int", constants::DW_ATE_signed, 8);

    let uint8_t = builder.typedef("uint8_t", uchar);
    let int16_t = builder.typedef("int16_t", int);
    let size_t = builder.typedef("size_t", uint);
    let byte = builder.typedef("byte", uchar);
    let volatile_uint8 = builder.wrap(constants::DW_TAG_volatile_type, uint8_t);
    let const_byte = builder.wrap(constants::DW_TAG_const_type, byte);
    let const_int = builder.wrap(constants::DW_TAG_const_type, int);
    let const_uchar = builder.wrap(constants::DW_TAG_const_type, uchar);
    let char_pointer = builder.wrap(constants::DW_TAG_pointer_type, schar);

    // Scalars
    builder.variable("v1", boolean, addr::V1);
    builder.variable("v3", volatile_uint8, addr::V3);
    builder.variable("v4", schar, addr::V4);
    builder.variable("v5", float, addr::V5);
    builder.variable("v7", int16_t, addr::V7);
    builder.variable("v8", long, addr::V8);
    builder.variable("v10", size_t, addr::V10);
    builder.variable("v13", ulong, addr::V13);

    // Arrays
    let uint8_pair = builder.array(uint8_t, 1);
    let float_pair = builder.counted_array(float, 2);
    let int_triple = builder.array(int, 2);
    builder.variable("av3", uint8_pair, addr::AV3);
    builder.variable("av5", float_pair, addr::AV5);
    builder.variable("av7", int_triple, addr::AV7);

    // Struct
    let config = builder.structure("config", 14);
    builder.member(config, "s1v1", boolean, 0);
    builder.member(config, "s1v3", uint8_t, 1);
    builder.member(config, "s1v5", float, 2);
    builder.member(config, "s1v7", int16_t, 6);
    builder.member(config, "s1v13", ulong, 8);
    let inner = builder.array(uchar, 1);
    builder.member(config, "s1arr", inner, 12);
    let config_typedef = builder.typedef("config_t", config);
    builder.variable("sv1", config_typedef, addr::SV1);

    // Bit-fields
    let flags = builder.structure("flags", 1);
    builder.bit_member(flags, "high", uchar, 0, 4, 0);
    builder.bit_member(flags, "low", uchar, 0, 4, 4);
    builder.variable("bits", flags, addr::BITS);

    let packed = builder.structure("packed", 1);
    builder.data_bit_member(packed, "a", uchar, 3, 0);
    builder.data_bit_member(packed, "b", uchar, 5, 3);
    builder.variable("packed", packed, addr::PACKED);

    let bad_flags = builder.structure("bad_flags", 2);
    builder.bit_member(bad_flags, "wide", int, 0, 3, 0);
    builder.variable("bad_bits", bad_flags, addr::BAD_BITS);

    // Constants
    builder.constant("data_structure_version", const_byte, AttributeValue::Udata(2));
    builder.constant("negative_offset", const_int, AttributeValue::Sdata(-5));
    let const_table = builder.array(const_uchar, 2);
    builder.constant("const_table", const_table, AttributeValue::Block(vec![10, 20, 30]));

    // Globals the resolver must refuse
    builder.variable("vv0", char_pointer, 400);
    builder.variable("big", long_long, 404);
    let grid = builder.matrix(uchar, &[1, 1]);
    builder.variable("grid", grid, 420);
    let records = builder.array(config, 1);
    builder.variable("records", records, 430);
    builder.variable_at_absolute("unused", uchar, 0);
    builder.variable("tail", uint, addr::TAIL);
}

/// The types sketch as an AVR image (data base `0x800000`)
pub fn types_image() -> DebugInfo
{
    let mut builder = FixtureBuilder::new(UNIT_NAME, AVR_DATA_BASE);
    populate_types(&mut builder);
    builder.build(Architecture::Avr)
}
