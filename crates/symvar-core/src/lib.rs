//! # symvar-core
//!
//! Read and write a program's global variables by name, using the DWARF debug
//! info the compiler already emitted instead of a hand-maintained offset table.
//!
//! This crate provides:
//! - Loading debug info from an ELF image (or from pre-extracted sections)
//! - Resolving variable types through typedefs and const/volatile wrappers
//! - Bindings for primitives, struct members and array elements
//! - A bit-exact codec for the supported base types, including sub-byte bit-fields
//!
//! ## Layering
//!
//! ```text
//! Globals ──> Variable { Primitive | Struct | Array }
//!                │                    │
//!                ▼                    ▼
//!         resolve (types)      location (addresses) ──> Memory
//!                │                    │
//!                └──────> dwarf <─────┘
//! ```
//!
//! The memory device is abstracted by the [`Memory`](memory::Memory) trait; the
//! crate ships a sparse map and a fixed-size RAM image.

pub mod codec;
pub mod dwarf;
pub mod error;
pub mod globals;
mod location;
pub mod memory;
pub mod prelude;
mod resolve;
pub mod types;
pub mod variable;

// Re-export commonly used types
pub use error::{SymvarError, SymvarResult};
pub use globals::Globals;
pub use variable::Variable;
