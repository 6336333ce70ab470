//! # Error Types
//!
//! Every way a variable lookup, read or write can fail.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::{Address, Value};

/// Main error type for symvar operations
///
/// All failures are synchronous and permanent: nothing is retried internally,
/// and a failed `write()` never leaves a partially updated memory image behind.
///
/// ## Error Categories
///
/// 1. **Lookup errors**: UnknownCompileUnit, UnknownVariable, UnknownMember, IndexOutOfBounds
/// 2. **Type errors**: UnsupportedType, MalformedDebugInfo, ShapeMismatch
/// 3. **Location errors**: ConstHasNoLocation, UnusedVariable, LocationNotRepresentable
/// 4. **Value errors**: ConstIsReadOnly, ValueOutOfRange, WrongValueKind
/// 5. **Memory errors**: AddressOutOfRange
/// 6. **Loading errors**: NoDebugInfo, Dwarf, Object, Io
#[derive(Error, Debug)]
pub enum SymvarError
{
    /// No compile unit with this `DW_AT_name` exists in the image
    #[error("Unknown compile unit: {0}")]
    UnknownCompileUnit(String),

    /// No top-level `DW_TAG_variable` with this name exists in the compile unit
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// The struct has no declared member with this name
    #[error("Unknown member '{member}' in {parent}")]
    UnknownMember
    {
        /// Name of the struct variable that was searched
        parent: String,
        /// Member name that was not found
        member: String,
    },

    /// The type cannot be accessed by this crate
    ///
    /// This happens for:
    /// - Pointer and reference types (never treated as integers)
    /// - `(encoding, byte size)` pairs outside the codec table (e.g. 64-bit doubles)
    /// - Nested aggregates (struct members or array elements that are themselves structs/arrays)
    /// - Unions, enumerations and other tags the resolver does not unwrap
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A required attribute is missing or encoded in an unexpected form
    ///
    /// Usually means the image was produced by a toolchain whose DWARF output
    /// differs from what the resolver expects.
    #[error("Malformed debug info: {0}")]
    MalformedDebugInfo(String),

    /// A binding was converted to the wrong variant (e.g. reading a struct as a primitive)
    #[error("{name} is {found}, not {expected}")]
    ShapeMismatch
    {
        /// Name of the binding
        name: String,
        /// Variant that was requested
        expected: &'static str,
        /// Variant the binding actually has
        found: &'static str,
    },

    /// `location()` called on a variable that carries `DW_AT_const_value`
    #[error("Constant {0} has no memory location")]
    ConstHasNoLocation(String),

    /// `write()` called on a variable that carries `DW_AT_const_value`
    #[error("Constant {0} is read-only")]
    ConstIsReadOnly(String),

    /// The linker left the variable at the "never referenced" address
    #[error("Variable {0} is unused (address sentinel)")]
    UnusedVariable(String),

    /// The location attribute is not a fixed address this crate can evaluate
    ///
    /// Examples: location lists, register-relative expressions, or an absolute
    /// address below the target's data base.
    #[error("Location not representable: {0}")]
    LocationNotRepresentable(String),

    /// The value does not fit the width or signedness of the target
    #[error("Value {value} out of range for {target}")]
    ValueOutOfRange
    {
        /// Rejected value
        value: Value,
        /// Description of the target type (e.g. `int16` or `4-bit field`)
        target: String,
    },

    /// The value has the wrong kind for the target (e.g. a float written to an integer)
    #[error("Wrong value kind: {target} cannot hold {value}")]
    WrongValueKind
    {
        /// Rejected value
        value: Value,
        /// Description of the target type
        target: String,
    },

    /// Array index beyond the inclusive upper bound
    #[error("Index {index} out of bounds for {array} (upper bound {upper_bound})")]
    IndexOutOfBounds
    {
        /// Name of the array variable
        array: String,
        /// Requested index
        index: u64,
        /// Inclusive upper bound from `DW_TAG_subrange_type`
        upper_bound: u64,
    },

    /// A memory backend was asked for a byte it does not hold
    #[error("Address {address} out of range (memory size {size})")]
    AddressOutOfRange
    {
        /// Memory-relative address
        address: Address,
        /// Size of the backend in bytes
        size: u64,
    },

    /// The image has no (or an empty) `.debug_info` section
    #[error("No debug info found in {0}")]
    NoDebugInfo(String),

    /// `gimli` failed to parse a DWARF structure
    #[error("DWARF error: {0}")]
    Dwarf(String),

    /// `object` failed to parse the container
    #[error("Object file error: {0}")]
    Object(#[from] object::Error),

    /// I/O error (reading images, loading and saving RAM dumps)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SymvarError>`
///
/// ```rust
/// use symvar_core::error::SymvarResult;
/// fn foo() -> SymvarResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SymvarResult<T> = std::result::Result<T, SymvarError>;

/// Map a gimli DWARF error to a `SymvarError` with context.
///
/// `context` describes what was being parsed when the error occurred
/// (e.g. "reading DW_AT_location").
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> SymvarError
{
    SymvarError::Dwarf(format!("{context}: {err}"))
}
