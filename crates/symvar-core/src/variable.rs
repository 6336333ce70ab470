//! # Variable Bindings
//!
//! A binding is a navigable view of one global, struct member or array element.
//! It holds no value: every `read()` and `write()` goes back to memory, and every
//! `location()` walks the parent chain again.
//!
//! The shape of a binding is decided once, when it is built, by classifying its
//! resolved type:
//!
//! ```text
//! Variable
//! ├── Primitive   read() / write() a bool, float or integer (optionally a bit-field)
//! ├── Struct      member(name) ──> Primitive
//! └── Array       get(index)   ──> Primitive
//! ```

use std::fmt;

use gimli::constants;
use tracing::{debug, warn};

use crate::codec::{BitField, PrimitiveKind};
use crate::dwarf::{CompileUnit, DebugInfo, DieOffset};
use crate::error::{SymvarError, SymvarResult};
use crate::location;
use crate::memory::Memory;
use crate::resolve::{self, BaseType, Shape};
use crate::types::{Address, MemoryMap, Value};

/// Everything a binding needs besides its own DIE
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a>
{
    pub debug: &'a DebugInfo,
    pub unit: &'a CompileUnit,
    pub memory: &'a dyn Memory,
    pub map: MemoryMap,
}

/// Position of an array element
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element
{
    pub index: u64,
    /// Element width in bytes
    pub stride: u64,
}

/// Shape-independent part of every binding
#[derive(Clone)]
pub(crate) struct Binding<'a>
{
    pub scope: Scope<'a>,
    pub die: DieOffset,
    /// Qualified name: `sv1`, `sv1.s1v3`, `av5[1]`
    pub name: String,
    pub parent: Option<Box<Binding<'a>>>,
    pub element: Option<Element>,
}

impl<'a> Binding<'a>
{
    pub(crate) fn root(scope: Scope<'a>, die: DieOffset, name: String) -> Self
    {
        Self {
            scope,
            die,
            name,
            parent: None,
            element: None,
        }
    }

    fn child(&self, die: DieOffset, name: String, element: Option<Element>) -> Self
    {
        Self {
            scope: self.scope,
            die,
            name,
            parent: Some(Box::new(self.clone())),
            element,
        }
    }
}

impl fmt::Debug for Binding<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("die", &format_args!("{:#x}", self.die.0))
            .field("element", &self.element)
            .finish()
    }
}

/// A bound global, member or element
#[derive(Debug, Clone)]
pub enum Variable<'a>
{
    Primitive(Primitive<'a>),
    Struct(Struct<'a>),
    Array(Array<'a>),
}

impl<'a> Variable<'a>
{
    /// Classify the binding's type and wrap it in the matching variant
    pub(crate) fn bind(binding: Binding<'a>) -> SymvarResult<Self>
    {
        let scope = binding.scope;
        let variable = match resolve::classify(scope.debug, scope.unit, binding.die)? {
            Shape::Primitive(base) => {
                let entry = scope.unit.entry(binding.die)?;
                let bit_field = if entry.tag() == constants::DW_TAG_member {
                    location::bit_field(&entry)?
                } else {
                    None
                };
                if bit_field.is_some() && base.kind != PrimitiveKind::UInt8 {
                    return Err(SymvarError::UnsupportedType(format!(
                        "{}: bit-fields are only supported on unsigned char, not {}",
                        binding.name, base.name
                    )));
                }
                Variable::Primitive(Primitive {
                    binding,
                    base,
                    bit_field,
                })
            }
            Shape::Struct(ty) => Variable::Struct(Struct { binding, ty }),
            Shape::Array(shape) => Variable::Array(Array {
                binding,
                upper_bound: shape.upper_bound,
                element: shape.element,
            }),
        };
        debug!("Bound {} as {}", variable.name(), variable.kind_name());
        Ok(variable)
    }

    pub fn name(&self) -> &str
    {
        match self {
            Variable::Primitive(primitive) => primitive.name(),
            Variable::Struct(structure) => structure.name(),
            Variable::Array(array) => array.name(),
        }
    }

    /// `"primitive"`, `"struct"` or `"array"`
    pub const fn kind_name(&self) -> &'static str
    {
        match self {
            Variable::Primitive(_) => "primitive",
            Variable::Struct(_) => "struct",
            Variable::Array(_) => "array",
        }
    }

    /// Memory-relative address of the first byte
    pub fn location(&self) -> SymvarResult<Address>
    {
        match self {
            Variable::Primitive(primitive) => primitive.location(),
            Variable::Struct(structure) => structure.location(),
            Variable::Array(array) => array.location(),
        }
    }

    pub fn into_primitive(self) -> SymvarResult<Primitive<'a>>
    {
        match self {
            Variable::Primitive(primitive) => Ok(primitive),
            other => Err(other.mismatch("primitive")),
        }
    }

    pub fn into_struct(self) -> SymvarResult<Struct<'a>>
    {
        match self {
            Variable::Struct(structure) => Ok(structure),
            other => Err(other.mismatch("struct")),
        }
    }

    pub fn into_array(self) -> SymvarResult<Array<'a>>
    {
        match self {
            Variable::Array(array) => Ok(array),
            other => Err(other.mismatch("array")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> SymvarError
    {
        SymvarError::ShapeMismatch {
            name: self.name().to_string(),
            expected,
            found: self.kind_name(),
        }
    }
}

/// A scalar: a global, a struct member, or an array element
///
/// ## Example
///
/// ```rust,no_run
/// use symvar_core::prelude::*;
///
/// let debug = DebugInfo::open("firmware.elf")?;
/// let memory = SparseMemory::new();
/// let globals = Globals::new(&debug, &memory, "src/types.ino.cpp")?;
///
/// let counter = globals.variable("v7")?.into_primitive()?;
/// counter.write(Value::Int(-7))?;
/// assert_eq!(counter.read()?, Value::Int(-7));
/// # Ok::<(), SymvarError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Primitive<'a>
{
    binding: Binding<'a>,
    base: BaseType,
    bit_field: Option<BitField>,
}

impl Primitive<'_>
{
    pub fn name(&self) -> &str
    {
        &self.binding.name
    }

    pub fn kind(&self) -> PrimitiveKind
    {
        self.base.kind
    }

    /// Name of the base type as written in the source (`"unsigned int"`, ...)
    pub fn type_name(&self) -> &str
    {
        &self.base.name
    }

    pub fn byte_size(&self) -> usize
    {
        self.base.kind.byte_width()
    }

    pub fn bit_field(&self) -> Option<BitField>
    {
        self.bit_field
    }

    /// Whether the variable was folded into a `DW_AT_const_value`
    pub fn is_const(&self) -> SymvarResult<bool>
    {
        location::is_const(&self.binding)
    }

    /// Array index, for elements
    pub fn index(&self) -> Option<u64>
    {
        self.binding.element.map(|element| element.index)
    }

    /// ## Errors
    ///
    /// `ConstHasNoLocation` for constants, plus every location error of the parent chain.
    pub fn location(&self) -> SymvarResult<Address>
    {
        location::locate(&self.binding)
    }

    /// Read the current value
    ///
    /// Constants are decoded from the debug info without touching memory.
    pub fn read(&self) -> SymvarResult<Value>
    {
        if let Some(bytes) = location::constant_bytes(&self.binding)? {
            return Ok(self.decode(&bytes));
        }

        let address = self.location()?;
        let mut buffer = [0u8; 4];
        let bytes = &mut buffer[..self.byte_size()];
        self.binding.scope.memory.read_into(address, bytes)?;
        Ok(self.decode(bytes))
    }

    /// Validate, encode and store a value
    ///
    /// The value is checked before memory is touched, so a rejected write leaves
    /// memory unchanged.
    ///
    /// ## Errors
    ///
    /// - `ConstIsReadOnly` for constants
    /// - `WrongValueKind` / `ValueOutOfRange` when the value does not fit
    /// - any location or memory error
    pub fn write(&self, value: Value) -> SymvarResult<()>
    {
        self.store(value).map_err(|err| {
            warn!("Rejected {} write of {} to {}: {}", value.kind_name(), value, self.name(), err);
            err
        })
    }

    fn store(&self, value: Value) -> SymvarResult<()>
    {
        if self.is_const()? {
            return Err(SymvarError::ConstIsReadOnly(self.name().to_string()));
        }

        let memory = self.binding.scope.memory;
        match self.bit_field {
            Some(field) => {
                let bits = field.encode(value)?;
                let address = self.location()?;
                let byte = memory.get(address)?;
                memory.set(address, field.insert(byte, bits))
            }
            None => {
                let bytes = self.kind().encode(value)?;
                let address = self.location()?;
                memory.write_bytes(address, &bytes)
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Value
    {
        match self.bit_field {
            Some(field) => Value::Int(i64::from(field.extract(bytes.first().copied().unwrap_or(0)))),
            None => self.kind().decode(bytes),
        }
    }
}

/// A struct-typed global
#[derive(Debug, Clone)]
pub struct Struct<'a>
{
    binding: Binding<'a>,
    /// The `DW_TAG_structure_type` DIE
    ty: DieOffset,
}

impl<'a> Struct<'a>
{
    pub fn name(&self) -> &str
    {
        &self.binding.name
    }

    pub fn location(&self) -> SymvarResult<Address>
    {
        location::locate(&self.binding)
    }

    /// Bind a member by name
    ///
    /// ## Errors
    ///
    /// - `UnknownMember` if no member has this name
    /// - `UnsupportedType` if the member is itself a struct or an array
    pub fn member(&self, name: &str) -> SymvarResult<Primitive<'a>>
    {
        let scope = self.binding.scope;
        for child in scope.unit.children(self.ty)? {
            let entry = scope.unit.entry(child)?;
            if entry.tag() != constants::DW_TAG_member {
                continue;
            }
            if scope.unit.entry_name(scope.debug.dwarf(), &entry)?.as_deref() != Some(name) {
                continue;
            }

            let binding = self.binding.child(child, format!("{}.{}", self.name(), name), None);
            return match Variable::bind(binding)? {
                Variable::Primitive(primitive) => Ok(primitive),
                nested => Err(SymvarError::UnsupportedType(format!(
                    "{}: {} members are not supported",
                    nested.name(),
                    nested.kind_name()
                ))),
            };
        }

        Err(SymvarError::UnknownMember {
            parent: self.name().to_string(),
            member: name.to_string(),
        })
    }

    /// Names of all declared members, in declaration order
    pub fn member_names(&self) -> SymvarResult<Vec<String>>
    {
        let scope = self.binding.scope;
        let mut names = Vec::new();
        for child in scope.unit.children(self.ty)? {
            let entry = scope.unit.entry(child)?;
            if entry.tag() != constants::DW_TAG_member {
                continue;
            }
            if let Some(name) = scope.unit.entry_name(scope.debug.dwarf(), &entry)? {
                names.push(name);
            }
        }
        Ok(names)
    }
}

/// A one-dimensional array of primitives
#[derive(Debug, Clone)]
pub struct Array<'a>
{
    binding: Binding<'a>,
    upper_bound: u64,
    element: BaseType,
}

impl<'a> Array<'a>
{
    pub fn name(&self) -> &str
    {
        &self.binding.name
    }

    /// Address of element 0
    pub fn location(&self) -> SymvarResult<Address>
    {
        location::locate(&self.binding)
    }

    /// Inclusive upper bound from `DW_TAG_subrange_type`
    pub fn upper_bound(&self) -> u64
    {
        self.upper_bound
    }

    /// Number of elements (`upper_bound + 1`)
    pub fn size(&self) -> u64
    {
        self.upper_bound.saturating_add(1)
    }

    pub fn element_kind(&self) -> PrimitiveKind
    {
        self.element.kind
    }

    /// Bind element `index`
    ///
    /// ## Errors
    ///
    /// `IndexOutOfBounds` unless `index <= upper_bound()`.
    pub fn get(&self, index: u64) -> SymvarResult<Primitive<'a>>
    {
        if index > self.upper_bound {
            return Err(SymvarError::IndexOutOfBounds {
                array: self.name().to_string(),
                index,
                upper_bound: self.upper_bound,
            });
        }

        let element = Element {
            index,
            stride: self.element.kind.byte_width() as u64,
        };
        Ok(Primitive {
            binding: self
                .binding
                .child(self.binding.die, format!("{}[{}]", self.name(), index), Some(element)),
            base: self.element.clone(),
            bit_field: None,
        })
    }
}
