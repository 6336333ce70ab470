//! # Globals Catalog
//!
//! Entry point for name lookups: one compile unit, one memory device.

use gimli::constants;
use tracing::debug;

use crate::dwarf::unit::is_declaration;
use crate::dwarf::{CompileUnit, DebugInfo, DieOffset};
use crate::error::{SymvarError, SymvarResult};
use crate::memory::Memory;
use crate::types::MemoryMap;
use crate::variable::{Binding, Scope, Variable};

/// The global variables of one compile unit, bound to a memory device
///
/// `Globals` holds no state of its own beyond its borrows: every lookup walks
/// the unit's top-level DIEs again and builds a fresh binding.
///
/// ## Example
///
/// ```rust,no_run
/// use symvar_core::prelude::*;
///
/// let debug = DebugInfo::open("firmware.elf")?;
/// let memory = RamImage::zeroed(8704);
/// let globals = Globals::new(&debug, &memory, "src/types.ino.cpp")?;
///
/// for name in globals.variable_names()? {
///     println!("{name}");
/// }
/// let angle = globals.variable("configPage4")?.into_struct()?.member("triggerAngle")?;
/// angle.write(Value::Int(-32768))?;
/// # Ok::<(), SymvarError>(())
/// ```
pub struct Globals<'a>
{
    scope: Scope<'a>,
}

impl<'a> Globals<'a>
{
    /// Select compile unit `unit_name` of `debug`
    ///
    /// The memory map is derived from the image's architecture; use
    /// [`with_memory_map`](Self::with_memory_map) to override it.
    ///
    /// ## Errors
    ///
    /// `UnknownCompileUnit` if the image has no unit with this name.
    pub fn new(debug: &'a DebugInfo, memory: &'a dyn Memory, unit_name: &str) -> SymvarResult<Self>
    {
        let unit = debug.compile_unit(unit_name)?;
        let origin = debug.origin();
        debug!("Selected compile unit {} of {}", unit_name, origin);
        Ok(Self {
            scope: Scope {
                debug,
                unit,
                memory,
                map: debug.memory_map(),
            },
        })
    }

    #[must_use]
    pub fn with_memory_map(mut self, map: MemoryMap) -> Self
    {
        self.scope.map = map;
        self
    }

    pub fn memory_map(&self) -> MemoryMap
    {
        self.scope.map
    }

    pub fn compile_unit(&self) -> &'a CompileUnit
    {
        self.scope.unit
    }

    /// Bind the first top-level variable called `name`
    ///
    /// Declarations are skipped; a definition that completes a declaration
    /// through `DW_AT_specification` is found under the declaration's name.
    ///
    /// ## Errors
    ///
    /// - `UnknownVariable` if no such variable is defined
    /// - `UnsupportedType` / `MalformedDebugInfo` if its type cannot be resolved
    pub fn variable(&self, name: &str) -> SymvarResult<Variable<'a>>
    {
        let definition = self
            .definitions()?
            .into_iter()
            .find(|(_, candidate)| candidate == name)
            .ok_or_else(|| SymvarError::UnknownVariable(name.to_string()))?;
        Variable::bind(Binding::root(self.scope, definition.0, definition.1))
    }

    /// Names of all defined top-level variables, in declaration order
    pub fn variable_names(&self) -> SymvarResult<Vec<String>>
    {
        Ok(self.definitions()?.into_iter().map(|(_, name)| name).collect())
    }

    /// Top-level `DW_TAG_variable` definitions with their names
    fn definitions(&self) -> SymvarResult<Vec<(DieOffset, String)>>
    {
        let unit = self.scope.unit;
        let dwarf = self.scope.debug.dwarf();
        let mut definitions = Vec::new();
        for child in unit.children(unit.root())? {
            let entry = unit.entry(child)?;
            if entry.tag() != constants::DW_TAG_variable || is_declaration(&entry)? {
                continue;
            }
            let name = match unit.entry_name(dwarf, &entry)? {
                Some(name) => Some(name),
                None => match unit.specification(&entry)? {
                    Some(declaration) => unit.entry_name(dwarf, &unit.entry(declaration)?)?,
                    None => None,
                },
            };
            if let Some(name) = name {
                definitions.push((child, name));
            }
        }
        Ok(definitions)
    }
}
