//! Compile units and the DIE queries the resolvers are built on.

use gimli::{constants, Attribute, AttributeValue, DwAt, Reader, Unit, UnitSectionOffset};

use super::{Die, DieOffset, OwnedDwarf, OwnedReader};
use crate::error::{map_dwarf_error, SymvarError, SymvarResult};

/// One `DW_TAG_compile_unit` and its DIE tree.
pub struct CompileUnit
{
    name: Option<String>,
    root: DieOffset,
    unit: Unit<OwnedReader>,
}

impl CompileUnit
{
    pub(crate) fn load_all(dwarf: &OwnedDwarf) -> SymvarResult<Vec<Self>>
    {
        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            let unit = dwarf
                .unit(header)
                .map_err(|err| map_dwarf_error("parsing compilation unit", err))?;
            let name = match unit.name.as_ref() {
                Some(reader) => Some(reader_to_string(reader)?),
                None => None,
            };
            let root = {
                let mut tree = unit
                    .entries_tree(None)
                    .map_err(|err| map_dwarf_error("building unit tree", err))?;
                let node = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
                node.entry().offset()
            };
            units.push(Self { name, root, unit });
        }
        Ok(units)
    }

    /// The unit's `DW_AT_name` (usually the primary source file)
    pub fn name(&self) -> Option<&str>
    {
        self.name.as_deref()
    }

    /// Offset of the `DW_TAG_compile_unit` DIE itself
    pub fn root(&self) -> DieOffset
    {
        self.root
    }

    pub(crate) fn raw(&self) -> &Unit<OwnedReader>
    {
        &self.unit
    }

    pub(crate) fn entry(&self, offset: DieOffset) -> SymvarResult<Die<'_>>
    {
        self.unit
            .entry(offset)
            .map_err(|err| map_dwarf_error(&format!("reading DIE at {:#x}", offset.0), err))
    }

    /// Direct children of a DIE, in declaration order
    pub(crate) fn children(&self, offset: DieOffset) -> SymvarResult<Vec<DieOffset>>
    {
        let mut offsets = Vec::new();
        let mut tree = self
            .unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building DIE tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating DIE tree", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating DIE children", err))?
        {
            offsets.push(child.entry().offset());
        }
        Ok(offsets)
    }

    /// `DW_AT_name` of a DIE, resolving `.debug_str` references
    pub(crate) fn entry_name(&self, dwarf: &OwnedDwarf, entry: &Die<'_>) -> SymvarResult<Option<String>>
    {
        let Some(attr) = attribute(entry, constants::DW_AT_name)? else {
            return Ok(None);
        };
        let reader = dwarf
            .attr_string(&self.unit, attr.value())
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        reader_to_string(&reader).map(Some)
    }

    /// Target of a DIE's `DW_AT_type` reference
    ///
    /// ## Errors
    ///
    /// `MalformedDebugInfo` if the attribute is missing or points outside this unit.
    pub(crate) fn type_ref(&self, entry: &Die<'_>) -> SymvarResult<DieOffset>
    {
        self.reference(entry, constants::DW_AT_type)?.ok_or_else(|| {
            SymvarError::MalformedDebugInfo(format!("{}: missing DW_AT_type", describe(entry)))
        })
    }

    /// The declaration a definition completes (`DW_AT_specification`)
    ///
    /// C++ emits an `extern` global as a named declaration plus an unnamed
    /// definition that carries the location.
    pub(crate) fn specification(&self, entry: &Die<'_>) -> SymvarResult<Option<DieOffset>>
    {
        self.reference(entry, constants::DW_AT_specification)
    }

    fn reference(&self, entry: &Die<'_>, name: DwAt) -> SymvarResult<Option<DieOffset>>
    {
        match attribute(entry, name)?.map(|attr| attr.value()) {
            Some(AttributeValue::UnitRef(offset)) => Ok(Some(offset)),
            Some(AttributeValue::DebugInfoRef(offset)) => UnitSectionOffset::from(offset)
                .to_unit_offset(&self.unit)
                .map(Some)
                .ok_or_else(|| {
                    SymvarError::MalformedDebugInfo(format!("{}: {name} points outside its unit", describe(entry)))
                }),
            Some(other) => Err(SymvarError::MalformedDebugInfo(format!(
                "{}: {name} in unexpected form {other:?}",
                describe(entry)
            ))),
            None => Ok(None),
        }
    }
}

/// Read one attribute, attaching the attribute name to parse errors
pub(crate) fn attribute(entry: &Die<'_>, name: DwAt) -> SymvarResult<Option<Attribute<OwnedReader>>>
{
    entry
        .attr(name)
        .map_err(|err| map_dwarf_error(&format!("reading {name}"), err))
}

/// Whether the DIE only declares an entity (`DW_AT_declaration`)
pub(crate) fn is_declaration(entry: &Die<'_>) -> SymvarResult<bool>
{
    Ok(matches!(
        attribute(entry, constants::DW_AT_declaration)?.map(|attr| attr.value()),
        Some(AttributeValue::Flag(true))
    ))
}

/// `DW_TAG_xxx <0xoffset>`, for diagnostics
pub(crate) fn describe(entry: &Die<'_>) -> String
{
    format!("{} <{:#x}>", entry.tag(), entry.offset().0)
}

fn reader_to_string(reader: &OwnedReader) -> SymvarResult<String>
{
    let owned = match reader.to_string() {
        Ok(cow) => cow.into_owned(),
        Err(_) => reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
            .into_owned(),
    };
    Ok(owned)
}
