//! Memory address type.

use std::fmt;
use std::ops::Add;

/// Strongly typed address
///
/// The same newtype is used on both sides of address translation:
///
/// - **Absolute**: the value of a `DW_OP_addr` operand, in the linker's address space
///   (on AVR, data addresses carry the `0x800000` data-space tag)
/// - **Memory-relative**: the offset handed to a [`Memory`](crate::memory::Memory) backend
///
/// [`MemoryMap`](super::MemoryMap) converts the first into the second.
///
/// ## Example
///
/// ```rust
/// use symvar_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// Linkers leave garbage-collected globals at this address, so it doubles as
    /// the default "unused" sentinel.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// Same as `Address::from(value)` but usable in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use symvar_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    ///
    /// ```rust
    /// use symvar_core::types::Address;
    ///
    /// let addr = Address::from(0x80_0100);
    /// assert_eq!(addr.checked_sub(0x80_0000), Some(Address::from(0x100)));
    /// assert_eq!(Address::from(0x10).checked_sub(0x80_0000), None);
    /// ```
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:06x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}
