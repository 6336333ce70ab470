//! Program image loading and DWARF section setup.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use once_cell::sync::OnceCell;
use tracing::debug;

use super::unit::CompileUnit;
use super::{OwnedDwarf, OwnedReader};
use crate::error::{map_dwarf_error, SymvarError, SymvarResult};
use crate::types::{Architecture, MemoryMap};

/// Sections `gimli` may ask for, with their ELF and Mach-O spellings.
const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
];

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> SymvarResult<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data()?;
            return Ok(Some(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            }));
        }
    }

    Ok(None)
}

/// Parsed debug information of one program image.
///
/// Opened once by the caller and shared (by reference) with every
/// [`Globals`](crate::globals::Globals) catalog and binding built from it.
/// Compile units are parsed lazily on first use.
///
/// ## Example
///
/// ```rust,no_run
/// use symvar_core::dwarf::DebugInfo;
///
/// let debug = DebugInfo::open("firmware.elf")?;
/// for name in debug.compile_unit_names()? {
///     println!("{name}");
/// }
/// # Ok::<(), symvar_core::error::SymvarError>(())
/// ```
pub struct DebugInfo
{
    origin: String,
    architecture: Architecture,
    endian: RunTimeEndian,
    dwarf: OwnedDwarf,
    units: OnceCell<Vec<CompileUnit>>,
}

impl DebugInfo
{
    /// Read and parse a program image (ELF, Mach-O, ...) from disk.
    ///
    /// ## Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `Object` if the container cannot be parsed
    /// - `NoDebugInfo` if the image carries no `.debug_info`
    pub fn open(path: impl AsRef<Path>) -> SymvarResult<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::parse_named(&bytes, path.display().to_string())
    }

    /// Parse a program image that is already in memory.
    pub fn parse(data: &[u8]) -> SymvarResult<Self>
    {
        Self::parse_named(data, "<memory>".to_string())
    }

    fn parse_named(data: &[u8], origin: String) -> SymvarResult<Self>
    {
        let file = object::File::parse(data)?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let architecture = Architecture::from(file.architecture());

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, aliases)? {
                sections.insert(*canonical, data);
            }
        }

        Self::from_section_map(origin, architecture, endian, sections)
    }

    /// Build from DWARF sections that were extracted elsewhere.
    ///
    /// Keys are canonical section names (`".debug_info"`, `".debug_abbrev"`, ...).
    /// Sections that are not supplied are treated as empty.
    pub fn from_sections<I, D>(architecture: Architecture, endian: RunTimeEndian, sections: I) -> SymvarResult<Self>
    where
        I: IntoIterator<Item = (&'static str, D)>,
        D: Into<Arc<[u8]>>,
    {
        let sections = sections.into_iter().map(|(name, data)| (name, data.into())).collect();
        Self::from_section_map("<sections>".to_string(), architecture, endian, sections)
    }

    fn from_section_map(
        origin: String,
        architecture: Architecture,
        endian: RunTimeEndian,
        sections: HashMap<&'static str, Arc<[u8]>>,
    ) -> SymvarResult<Self>
    {
        if sections.get(".debug_info").map_or(true, |data| data.is_empty()) {
            return Err(SymvarError::NoDebugInfo(origin));
        }

        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(section_reader(&sections, section, endian)))
            .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

        debug!(
            "Loaded debug info from {} ({}, {} DWARF sections)",
            origin,
            architecture,
            sections.len()
        );

        Ok(Self {
            origin,
            architecture,
            endian,
            dwarf,
            units: OnceCell::new(),
        })
    }

    /// Where the image came from (a path, or a placeholder for in-memory data)
    pub fn origin(&self) -> &str
    {
        &self.origin
    }

    pub fn architecture(&self) -> Architecture
    {
        self.architecture
    }

    pub fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }

    /// Address translation the image was linked against
    pub fn memory_map(&self) -> MemoryMap
    {
        MemoryMap::for_architecture(self.architecture)
    }

    pub(crate) fn dwarf(&self) -> &OwnedDwarf
    {
        &self.dwarf
    }

    pub(crate) fn units(&self) -> SymvarResult<&[CompileUnit]>
    {
        self.units
            .get_or_try_init(|| CompileUnit::load_all(&self.dwarf))
            .map(Vec::as_slice)
    }

    /// Names of all compile units, in `.debug_info` order
    pub fn compile_unit_names(&self) -> SymvarResult<Vec<String>>
    {
        Ok(self
            .units()?
            .iter()
            .filter_map(|unit| unit.name().map(str::to_owned))
            .collect())
    }

    /// Find a compile unit by its `DW_AT_name`
    ///
    /// ## Errors
    ///
    /// `UnknownCompileUnit` if no unit has this name.
    pub fn compile_unit(&self, name: &str) -> SymvarResult<&CompileUnit>
    {
        self.units()?
            .iter()
            .find(|unit| unit.name() == Some(name))
            .ok_or_else(|| SymvarError::UnknownCompileUnit(name.to_string()))
    }
}

fn section_reader(sections: &HashMap<&'static str, Arc<[u8]>>, id: SectionId, endian: RunTimeEndian) -> OwnedReader
{
    let data = sections
        .get(id.name())
        .cloned()
        .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
    EndianArcSlice::new(data, endian)
}
