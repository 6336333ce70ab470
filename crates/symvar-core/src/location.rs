//! # Location Resolver
//!
//! Turns a binding into the memory-relative address of its first byte.
//!
//! Nothing is cached: every call walks the parent chain again, so a member's
//! location is always `parent.location() + member offset` and an element's is
//! always `array.location() + index * element width`.
//!
//! ## Supported Expressions
//!
//! - Variables: `DW_AT_location` holding exactly one `DW_OP_addr` (or `DW_OP_addrx`)
//! - Members: `DW_AT_data_member_location` as `DW_OP_plus_uconst n` or a plain constant,
//!   falling back to `DW_AT_data_bit_offset / 8`

use gimli::{constants, AttributeValue, Encoding, Expression, Operation, Reader};
use smallvec::SmallVec;

use crate::codec::BitField;
use crate::dwarf::unit::{attribute, describe};
use crate::dwarf::{Die, OwnedReader};
use crate::error::{map_dwarf_error, SymvarError, SymvarResult};
use crate::types::Address;
use crate::variable::{Binding, Scope};

/// Raw bytes of a `DW_AT_const_value`, little-endian
pub(crate) type ConstBytes = SmallVec<[u8; 8]>;

/// Memory-relative address of a binding
///
/// ## Errors
///
/// - `ConstHasNoLocation` if the DIE carries `DW_AT_const_value`
/// - `UnusedVariable` if the linker left the variable at the sentinel address
/// - `LocationNotRepresentable` for anything but a single fixed address
pub(crate) fn locate(binding: &Binding<'_>) -> SymvarResult<Address>
{
    let unit = binding.scope.unit;
    let entry = unit.entry(binding.die)?;
    if attribute(&entry, constants::DW_AT_const_value)?.is_some() {
        return Err(SymvarError::ConstHasNoLocation(binding.name.clone()));
    }

    match (entry.tag(), binding.parent.as_deref(), binding.element) {
        (constants::DW_TAG_variable, None, None) => static_address(binding.scope, &entry, &binding.name),
        (constants::DW_TAG_variable, Some(array), Some(element)) => {
            let offset = element.index.checked_mul(element.stride);
            offset_from(locate(array)?, offset, &binding.name)
        }
        (constants::DW_TAG_member, Some(parent), None) => {
            offset_from(locate(parent)?, Some(member_offset(&entry, unit.raw().encoding())?), &binding.name)
        }
        (tag, _, _) => Err(SymvarError::MalformedDebugInfo(format!(
            "{}: {tag} cannot be located in this position",
            binding.name
        ))),
    }
}

/// Whether the binding's DIE carries `DW_AT_const_value`
pub(crate) fn is_const(binding: &Binding<'_>) -> SymvarResult<bool>
{
    let entry = binding.scope.unit.entry(binding.die)?;
    Ok(attribute(&entry, constants::DW_AT_const_value)?.is_some())
}

/// Embedded constant of a `DW_AT_const_value` DIE, `None` for ordinary variables
///
/// Integer forms are widened to 8 little-endian bytes. For an element of a
/// constant array, the element's slice of the block is returned.
pub(crate) fn constant_bytes(binding: &Binding<'_>) -> SymvarResult<Option<ConstBytes>>
{
    let entry = binding.scope.unit.entry(binding.die)?;
    let Some(attr) = attribute(&entry, constants::DW_AT_const_value)? else {
        return Ok(None);
    };

    let bytes = match attr.value() {
        AttributeValue::Block(block) => {
            let block = block
                .to_slice()
                .map_err(|err| map_dwarf_error("reading DW_AT_const_value block", err))?;
            element_slice(binding, &block)?
        }
        other if binding.element.is_some() => {
            return Err(SymvarError::MalformedDebugInfo(format!(
                "{}: constant array needs a block DW_AT_const_value, found {other:?}",
                binding.name
            )))
        }
        AttributeValue::Sdata(value) => ConstBytes::from_slice(&value.to_le_bytes()),
        other => match other.udata_value() {
            Some(value) => ConstBytes::from_slice(&value.to_le_bytes()),
            None => {
                return Err(SymvarError::MalformedDebugInfo(format!(
                    "{}: DW_AT_const_value in unexpected form {other:?}",
                    describe(&entry)
                )))
            }
        },
    };
    Ok(Some(bytes))
}

/// Bit-field layout of a `DW_TAG_member`, if it has one
///
/// Both the DWARF 2/3 form (`DW_AT_bit_offset`, counted from the most significant
/// bit) and the DWARF 4 form (`DW_AT_data_bit_offset`, counted from the least
/// significant bit of the containing byte) are understood.
pub(crate) fn bit_field(entry: &Die<'_>) -> SymvarResult<Option<BitField>>
{
    let Some(size) = attribute(entry, constants::DW_AT_bit_size)?.and_then(|attr| attr.udata_value()) else {
        return Ok(None);
    };
    let too_wide = || SymvarError::UnsupportedType(format!("{}: bit-field wider than one byte", describe(entry)));
    let size = u8::try_from(size).map_err(|_| too_wide())?;

    if let Some(offset) = attribute(entry, constants::DW_AT_bit_offset)?.and_then(|attr| attr.udata_value()) {
        let offset = u8::try_from(offset).map_err(|_| too_wide())?;
        return BitField::new(size, offset).map(Some);
    }
    if let Some(bit) = attribute(entry, constants::DW_AT_data_bit_offset)?.and_then(|attr| attr.udata_value()) {
        let lsb = (bit % 8) as u8;
        let offset = 8u8.checked_sub(lsb).and_then(|rest| rest.checked_sub(size)).ok_or_else(too_wide)?;
        return BitField::new(size, offset).map(Some);
    }
    BitField::new(size, 0).map(Some)
}

fn element_slice(binding: &Binding<'_>, block: &[u8]) -> SymvarResult<ConstBytes>
{
    let Some(element) = binding.element else {
        return Ok(ConstBytes::from_slice(block));
    };
    let start = element
        .index
        .checked_mul(element.stride)
        .and_then(|start| usize::try_from(start).ok());
    let stride = usize::try_from(element.stride).ok();
    match (start, stride) {
        (Some(start), Some(stride)) if start.saturating_add(stride) <= block.len() => {
            Ok(ConstBytes::from_slice(&block[start..start + stride]))
        }
        _ => Err(SymvarError::MalformedDebugInfo(format!(
            "{}: constant block too short for element",
            binding.name
        ))),
    }
}

fn offset_from(base: Address, offset: Option<u64>, name: &str) -> SymvarResult<Address>
{
    offset
        .and_then(|offset| base.checked_add(offset))
        .ok_or_else(|| SymvarError::LocationNotRepresentable(format!("{name}: address overflow")))
}

/// Evaluate a variable's `DW_AT_location` and translate it through the memory map
fn static_address(scope: Scope<'_>, entry: &Die<'_>, name: &str) -> SymvarResult<Address>
{
    let not_representable = |why: &str| SymvarError::LocationNotRepresentable(format!("{name}: {why}"));

    let attr = attribute(entry, constants::DW_AT_location)?.ok_or_else(|| not_representable("no DW_AT_location"))?;
    let AttributeValue::Exprloc(expression) = attr.value() else {
        return Err(not_representable("location is not a single expression"));
    };

    let unit = scope.unit.raw();
    let absolute = match single_operation(expression, unit.encoding(), "evaluating DW_AT_location")? {
        Some(Operation::Address { address }) => address,
        Some(Operation::AddressIndex { index }) => scope
            .debug
            .dwarf()
            .address(unit, index)
            .map_err(|err| map_dwarf_error("resolving DW_OP_addrx", err))?,
        _ => return Err(not_representable("expression is not a plain DW_OP_addr")),
    };

    let absolute = Address::new(absolute);
    if scope.map.is_unused(absolute) {
        return Err(SymvarError::UnusedVariable(name.to_string()));
    }
    scope.map.to_memory(absolute).ok_or_else(|| {
        not_representable(&format!(
            "{absolute} lies below the data base {:#x}",
            scope.map.data_base()
        ))
    })
}

/// Byte offset of a struct member from the start of its struct
fn member_offset(entry: &Die<'_>, encoding: Encoding) -> SymvarResult<u64>
{
    if let Some(attr) = attribute(entry, constants::DW_AT_data_member_location)? {
        let offset = match attr.value() {
            AttributeValue::Exprloc(expression) => {
                match single_operation(expression, encoding, "evaluating DW_AT_data_member_location")? {
                    Some(Operation::PlusConstant { value }) => Some(value),
                    _ => None,
                }
            }
            other => other.udata_value(),
        };
        return offset.ok_or_else(|| {
            SymvarError::LocationNotRepresentable(format!(
                "{}: member location is not a constant offset",
                describe(entry)
            ))
        });
    }
    if let Some(bit) = attribute(entry, constants::DW_AT_data_bit_offset)?.and_then(|attr| attr.udata_value()) {
        return Ok(bit / 8);
    }
    Ok(0)
}

/// The only operation of an expression, `None` if there are zero or several
fn single_operation(
    expression: Expression<OwnedReader>,
    encoding: Encoding,
    context: &str,
) -> SymvarResult<Option<Operation<OwnedReader>>>
{
    let mut operations = expression.operations(encoding);
    let first = operations.next().map_err(|err| map_dwarf_error(context, err))?;
    let rest = operations.next().map_err(|err| map_dwarf_error(context, err))?;
    Ok(if rest.is_some() { None } else { first })
}
