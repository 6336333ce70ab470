//! Common module for library exports

pub use crate::codec::{BitField, PrimitiveKind};
pub use crate::dwarf::{CompileUnit, DebugInfo};
pub use crate::error::{SymvarError, SymvarResult};
pub use crate::globals::Globals;
pub use crate::memory::{Memory, RamImage, SparseMemory};
pub use crate::types::{Address, Architecture, MemoryMap, Value};
pub use crate::variable::{Array, Primitive, Struct, Variable};
