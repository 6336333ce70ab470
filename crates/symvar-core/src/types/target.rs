//! Target architecture and address-space translation.

use std::fmt;

use super::Address;

/// CPU architecture of the program image
///
/// Only used to pick a [`MemoryMap`]; the DWARF itself is architecture-neutral.
///
/// ## Supported Architectures
///
/// - **Avr**: 8-bit AVR (ATmega). Data addresses live in a separate space tagged with `0x800000`
/// - **Arm**, **Arm64**, **X86_64**: flat address spaces, absolute addresses are used as-is
/// - **Unknown**: anything else `object` recognises; treated as flat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 8-bit AVR (ATmega328P, ATmega2560, ...)
    Avr,
    /// 32-bit ARM (Cortex-M and friends)
    Arm,
    /// 64-bit ARM
    Arm64,
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// Any other architecture (or unknown)
    Unknown(&'static str),
}

impl From<object::Architecture> for Architecture
{
    fn from(arch: object::Architecture) -> Self
    {
        match arch {
            object::Architecture::Avr => Architecture::Avr,
            object::Architecture::Arm => Architecture::Arm,
            object::Architecture::Aarch64 => Architecture::Arm64,
            object::Architecture::X86_64 => Architecture::X86_64,
            _ => Architecture::Unknown("unknown"),
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::Avr => write!(f, "avr"),
            Architecture::Arm => write!(f, "arm"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Unknown(name) => write!(f, "{name}"),
        }
    }
}

/// Translation from absolute (linker) addresses to memory-relative addresses
///
/// A `DW_OP_addr` operand is an address in the linker's view of the program.
/// Harvard architectures give data memory its own range: avr-ld places `.data`
/// and `.bss` at `0x800000 + sram_offset`, so the base has to be stripped
/// before the address means anything to a RAM image.
///
/// ## Example
///
/// ```rust
/// use symvar_core::types::{Address, Architecture, MemoryMap};
///
/// let map = MemoryMap::for_architecture(Architecture::Avr);
/// assert_eq!(map.to_memory(Address::new(0x80_0285)), Some(Address::new(645)));
/// assert!(map.is_unused(Address::ZERO));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap
{
    data_base: u64,
    unused_address: Address,
}

impl MemoryMap
{
    /// Start of the AVR data address space in avr-ld's linker scripts
    pub const AVR_DATA_BASE: u64 = 0x80_0000;

    /// A flat map: absolute addresses are memory-relative addresses
    pub const fn flat() -> Self
    {
        Self::new(0)
    }

    /// A map that subtracts `data_base` from every absolute address
    pub const fn new(data_base: u64) -> Self
    {
        Self {
            data_base,
            unused_address: Address::ZERO,
        }
    }

    /// The memory map an image for `architecture` is linked against
    pub const fn for_architecture(architecture: Architecture) -> Self
    {
        match architecture {
            Architecture::Avr => Self::new(Self::AVR_DATA_BASE),
            Architecture::Arm | Architecture::Arm64 | Architecture::X86_64 | Architecture::Unknown(_) => Self::flat(),
        }
    }

    /// Replace the data base, keeping the unused sentinel
    #[must_use]
    pub const fn with_data_base(self, data_base: u64) -> Self
    {
        Self { data_base, ..self }
    }

    /// Absolute address subtracted before handing addresses to memory
    pub const fn data_base(&self) -> u64
    {
        self.data_base
    }

    /// Whether an absolute address is the "never referenced" sentinel
    pub fn is_unused(&self, absolute: Address) -> bool
    {
        absolute == self.unused_address
    }

    /// Convert an absolute address into a memory-relative one
    ///
    /// Returns `None` for addresses below the data base.
    pub fn to_memory(&self, absolute: Address) -> Option<Address>
    {
        absolute.checked_sub(self.data_base)
    }
}

impl Default for MemoryMap
{
    fn default() -> Self
    {
        Self::flat()
    }
}
