//! # Debug Info Source
//!
//! Thin adapter over `object` (container parsing) and `gimli` (DWARF parsing).
//!
//! The rest of the crate only needs a handful of queries from the debug info:
//! find a compile unit by name, walk a DIE's children, read attributes, and
//! follow `DW_AT_type` references. Everything here is read-only once loaded.

mod image;
pub(crate) mod unit;

use gimli::{DebuggingInformationEntry, Dwarf, EndianArcSlice, RunTimeEndian, UnitOffset};

pub use image::DebugInfo;
pub use unit::CompileUnit;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;

/// Handle of a DIE inside one compile unit
pub type DieOffset = UnitOffset<usize>;

pub(crate) type Die<'u> = DebuggingInformationEntry<'u, 'u, OwnedReader>;
