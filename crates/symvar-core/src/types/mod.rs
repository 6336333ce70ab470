//! # Types
//!
//! Plain value types shared by every layer: addresses, the target's address
//! map, and the dynamically typed values moved in and out of memory.

pub mod address;
pub mod target;
pub mod value;

// Re-export all public types
pub use address::Address;
pub use target::{Architecture, MemoryMap};
pub use value::Value;
