//! # Memory
//!
//! The byte-addressable device that variables are read from and written to.
//!
//! The crate never owns the device: callers hand a `&dyn Memory` to
//! [`Globals`](crate::globals::Globals) and every binding built from it borrows
//! the same handle. Both `get` and `set` take `&self`, like a handle to a
//! simulator or a debug probe, so any number of bindings can coexist.
//!
//! Addresses are memory-relative: the data base of the target has already been
//! subtracted (see [`MemoryMap`](crate::types::MemoryMap)).
//!
//! ## Backends
//!
//! - **SparseMemory**: map of written bytes; everything else reads as 0
//! - **RamImage**: fixed-size byte array, loadable from and savable to a raw dump

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::trace;

use crate::error::{SymvarError, SymvarResult};
use crate::types::Address;

/// Byte-addressable memory device
pub trait Memory
{
    /// Read one byte
    fn get(&self, address: Address) -> SymvarResult<u8>;

    /// Write one byte
    fn set(&self, address: Address, byte: u8) -> SymvarResult<()>;

    /// Fill `buffer` from consecutive addresses starting at `address`
    fn read_into(&self, address: Address, buffer: &mut [u8]) -> SymvarResult<()>
    {
        for (offset, slot) in (0u64..).zip(buffer.iter_mut()) {
            *slot = self.get(address + offset)?;
        }
        trace!("Read {} byte(s) at {}: {:02x?}", buffer.len(), address, buffer);
        Ok(())
    }

    /// Write `bytes` to consecutive addresses starting at `address`
    ///
    /// Every target byte is probed with `get` first, so an out-of-range tail
    /// fails before anything is written.
    fn write_bytes(&self, address: Address, bytes: &[u8]) -> SymvarResult<()>
    {
        for offset in (0u64..).take(bytes.len()) {
            self.get(address + offset)?;
        }
        for (offset, byte) in (0u64..).zip(bytes) {
            self.set(address + offset, *byte)?;
        }
        trace!("Wrote {} byte(s) at {}: {:02x?}", bytes.len(), address, bytes);
        Ok(())
    }
}

/// Unbounded map-backed memory
///
/// Bytes that were never written read as 0, and [`snapshot`](Self::snapshot)
/// returns exactly the bytes that were written, which makes it handy for
/// checking what an operation touched.
///
/// ## Example
///
/// ```rust
/// use symvar_core::memory::{Memory, SparseMemory};
/// use symvar_core::types::Address;
///
/// let memory = SparseMemory::new();
/// memory.set(Address::new(3846), 0xff)?;
/// assert_eq!(memory.get(Address::new(3846))?, 0xff);
/// assert_eq!(memory.get(Address::new(3847))?, 0);
/// assert_eq!(memory.snapshot().len(), 1);
/// # Ok::<(), symvar_core::error::SymvarError>(())
/// ```
#[derive(Debug, Default)]
pub struct SparseMemory
{
    bytes: RefCell<BTreeMap<u64, u8>>,
}

impl SparseMemory
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Every byte written so far, by address
    pub fn snapshot(&self) -> BTreeMap<u64, u8>
    {
        self.bytes.borrow().clone()
    }

    /// Forget every write
    pub fn clear(&self)
    {
        self.bytes.borrow_mut().clear();
    }
}

impl Memory for SparseMemory
{
    fn get(&self, address: Address) -> SymvarResult<u8>
    {
        Ok(self.bytes.borrow().get(&address.value()).copied().unwrap_or(0))
    }

    fn set(&self, address: Address, byte: u8) -> SymvarResult<()>
    {
        self.bytes.borrow_mut().insert(address.value(), byte);
        Ok(())
    }
}

/// Fixed-size RAM image
///
/// Models the data memory of a microcontroller: addresses `0..size` are valid,
/// anything else fails with `AddressOutOfRange`.
#[derive(Debug, Clone)]
pub struct RamImage
{
    bytes: RefCell<Vec<u8>>,
}

impl RamImage
{
    /// A zero-filled image of `size` bytes
    pub fn zeroed(size: usize) -> Self
    {
        Self::from_bytes(vec![0; size])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self
    {
        Self {
            bytes: RefCell::new(bytes),
        }
    }

    /// Load a raw dump (byte `n` of the file is address `n`)
    pub fn load(path: impl AsRef<Path>) -> SymvarResult<Self>
    {
        let bytes = fs::read(path.as_ref())?;
        trace!("Loaded {} byte RAM image from {}", bytes.len(), path.as_ref().display());
        Ok(Self::from_bytes(bytes))
    }

    /// Write the image back out as a raw dump
    pub fn save(&self, path: impl AsRef<Path>) -> SymvarResult<()>
    {
        fs::write(path.as_ref(), self.bytes.borrow().as_slice())?;
        Ok(())
    }

    pub fn size(&self) -> u64
    {
        self.bytes.borrow().len() as u64
    }

    pub fn to_vec(&self) -> Vec<u8>
    {
        self.bytes.borrow().clone()
    }

    fn index(&self, address: Address) -> SymvarResult<usize>
    {
        let size = self.size();
        if address.value() < size {
            Ok(address.value() as usize)
        } else {
            Err(SymvarError::AddressOutOfRange { address, size })
        }
    }
}

impl Memory for RamImage
{
    fn get(&self, address: Address) -> SymvarResult<u8>
    {
        let index = self.index(address)?;
        Ok(self.bytes.borrow()[index])
    }

    fn set(&self, address: Address, byte: u8) -> SymvarResult<()>
    {
        let index = self.index(address)?;
        self.bytes.borrow_mut()[index] = byte;
        Ok(())
    }
}
