//! # Type Resolver
//!
//! Normalizes a DIE's type into one of the three shapes a binding can take.
//!
//! `DW_AT_type` chains are followed through every wrapper the compiler may put
//! around a type:
//!
//! ```text
//! DW_TAG_variable ──> DW_TAG_volatile_type ──> DW_TAG_typedef ──> DW_TAG_base_type
//!                                                   (stop here) ──> DW_TAG_structure_type
//!                                                               ──> DW_TAG_array_type
//! ```
//!
//! Pointers and references are rejected outright rather than treated as integers.

use gimli::{constants, AttributeValue, DwAte};
use tracing::debug;

use crate::codec::PrimitiveKind;
use crate::dwarf::unit::{attribute, describe};
use crate::dwarf::{CompileUnit, DebugInfo, Die, DieOffset};
use crate::error::{SymvarError, SymvarResult};

/// Upper bound on `DW_AT_type` edges followed before giving up
pub(crate) const MAX_TYPE_REF_DEPTH: usize = 32;

/// A validated `DW_TAG_base_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType
{
    /// Source-level name (`"unsigned char"`, `"float"`, ...)
    pub name: String,
    pub kind: PrimitiveKind,
}

/// Result of classifying a variable, member or array element
#[derive(Debug, Clone)]
pub(crate) enum Shape
{
    Primitive(BaseType),
    /// Offset of the `DW_TAG_structure_type` whose children are the members
    Struct(DieOffset),
    Array(ArrayShape),
}

#[derive(Debug, Clone)]
pub(crate) struct ArrayShape
{
    /// Inclusive
    pub upper_bound: u64,
    pub element: BaseType,
}

/// Follow `DW_AT_type` from `die` to the first base, struct or array type
pub(crate) fn resolve(unit: &CompileUnit, die: DieOffset) -> SymvarResult<DieOffset>
{
    let mut offset = die;
    for _ in 0..=MAX_TYPE_REF_DEPTH {
        let entry = unit.entry(offset)?;
        match entry.tag() {
            // A definition without its own type takes the declaration's
            constants::DW_TAG_variable if attribute(&entry, constants::DW_AT_type)?.is_none() => {
                offset = match unit.specification(&entry)? {
                    Some(declaration) => declaration,
                    None => unit.type_ref(&entry)?,
                };
            }
            constants::DW_TAG_variable
            | constants::DW_TAG_member
            | constants::DW_TAG_typedef
            | constants::DW_TAG_const_type
            | constants::DW_TAG_volatile_type => offset = unit.type_ref(&entry)?,
            constants::DW_TAG_base_type
            | constants::DW_TAG_structure_type
            | constants::DW_TAG_class_type
            | constants::DW_TAG_array_type => return Ok(offset),
            constants::DW_TAG_pointer_type
            | constants::DW_TAG_reference_type
            | constants::DW_TAG_rvalue_reference_type
            | constants::DW_TAG_ptr_to_member_type => {
                return Err(SymvarError::UnsupportedType(format!(
                    "{}: pointer and reference types are not supported",
                    describe(&entry)
                )))
            }
            other => {
                return Err(SymvarError::UnsupportedType(format!(
                    "{}: cannot resolve {other}",
                    describe(&entry)
                )))
            }
        }
    }

    Err(SymvarError::MalformedDebugInfo(format!(
        "type chain starting at <{:#x}> is longer than {MAX_TYPE_REF_DEPTH} references",
        die.0
    )))
}

/// Resolve and classify the type of `die`
pub(crate) fn classify(debug: &DebugInfo, unit: &CompileUnit, die: DieOffset) -> SymvarResult<Shape>
{
    let offset = resolve(unit, die)?;
    let entry = unit.entry(offset)?;
    let shape = match entry.tag() {
        constants::DW_TAG_base_type => Shape::Primitive(base_type(debug, unit, &entry)?),
        constants::DW_TAG_array_type => Shape::Array(array_shape(debug, unit, &entry)?),
        _ => Shape::Struct(offset),
    };
    debug!("Classified DIE <{:#x}> as {:?}", die.0, shape);
    Ok(shape)
}

/// Validate a base type and look up its codec kind
///
/// `DW_AT_name` must be an inline or `.debug_str` string, `DW_AT_byte_size` and
/// `DW_AT_encoding` must be one-byte constants.
pub(crate) fn base_type(debug: &DebugInfo, unit: &CompileUnit, entry: &Die<'_>) -> SymvarResult<BaseType>
{
    let malformed = |what: &str| SymvarError::MalformedDebugInfo(format!("{}: {what}", describe(entry)));

    match attribute(entry, constants::DW_AT_name)?.map(|attr| attr.raw_value()) {
        Some(
            AttributeValue::String(_)
            | AttributeValue::DebugStrRef(_)
            | AttributeValue::DebugStrOffsetsIndex(_)
            | AttributeValue::DebugLineStrRef(_),
        ) => {}
        _ => return Err(malformed("base type without a string DW_AT_name")),
    }
    let byte_size = match attribute(entry, constants::DW_AT_byte_size)?.map(|attr| attr.raw_value()) {
        Some(AttributeValue::Data1(size)) => u64::from(size),
        _ => return Err(malformed("base type without a data1 DW_AT_byte_size")),
    };
    let encoding = match attribute(entry, constants::DW_AT_encoding)?.map(|attr| attr.raw_value()) {
        Some(AttributeValue::Data1(encoding)) => DwAte(encoding),
        _ => return Err(malformed("base type without a data1 DW_AT_encoding")),
    };

    let name = unit
        .entry_name(debug.dwarf(), entry)?
        .ok_or_else(|| malformed("base type without a name"))?;
    let kind = PrimitiveKind::from_encoding(encoding, byte_size).ok_or_else(|| {
        SymvarError::UnsupportedType(format!("{name}: {encoding} with {byte_size} byte(s)"))
    })?;

    Ok(BaseType { name, kind })
}

/// Bounds and element type of a one-dimensional array of primitives
fn array_shape(debug: &DebugInfo, unit: &CompileUnit, entry: &Die<'_>) -> SymvarResult<ArrayShape>
{
    let mut subranges = Vec::new();
    for child in unit.children(entry.offset())? {
        let child = unit.entry(child)?;
        if child.tag() == constants::DW_TAG_subrange_type {
            subranges.push(child);
        }
    }

    let subrange = match subranges.as_slice() {
        [only] => only,
        [] => {
            return Err(SymvarError::MalformedDebugInfo(format!(
                "{}: array without DW_TAG_subrange_type",
                describe(entry)
            )))
        }
        _ => {
            return Err(SymvarError::UnsupportedType(format!(
                "{}: multi-dimensional arrays are not supported",
                describe(entry)
            )))
        }
    };
    let upper_bound = upper_bound(subrange)?;

    let element = resolve(unit, unit.type_ref(entry)?)?;
    let element = unit.entry(element)?;
    if element.tag() != constants::DW_TAG_base_type {
        return Err(SymvarError::UnsupportedType(format!(
            "{}: arrays of {} are not supported",
            describe(entry),
            element.tag()
        )));
    }

    Ok(ArrayShape {
        upper_bound,
        element: base_type(debug, unit, &element)?,
    })
}

/// `DW_AT_upper_bound`, or `DW_AT_count - 1`
///
/// A bound of `u64::MAX` is the all-ones `-1` of a zero-length array and is rejected.
fn upper_bound(subrange: &Die<'_>) -> SymvarResult<u64>
{
    if let Some(bound) = attribute(subrange, constants::DW_AT_upper_bound)?.and_then(|attr| attr.udata_value()) {
        if bound == u64::MAX {
            return Err(SymvarError::MalformedDebugInfo(format!(
                "{}: array upper bound {bound:#x} has no element count",
                describe(subrange)
            )));
        }
        return Ok(bound);
    }
    match attribute(subrange, constants::DW_AT_count)?.and_then(|attr| attr.udata_value()) {
        Some(count) if count > 0 => Ok(count - 1),
        _ => Err(SymvarError::MalformedDebugInfo(format!(
            "{}: array without a constant bound",
            describe(subrange)
        ))),
    }
}
