//! Compact callee key: short contract address + function selector

use crate::address::{Address, AddressError, Selector};
use std::fmt;

/// The 12-byte identity of a contract function: the first 8 bytes of the
/// 20-byte contract address followed by the 4-byte function selector.
///
/// Callees are the scheduler's unit of parallelism granularity; two messages
/// with the same callee key invoke the same contract function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct CalleeKey([u8; 12]);

impl CalleeKey {
    /// Size of a callee key in bytes
    pub const LEN: usize = 12;

    /// Build the compact key for an (address, selector) pair.
    pub fn compact(address: &Address, selector: &Selector) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..Address::SHORT_LEN].copy_from_slice(&address.short());
        bytes[Address::SHORT_LEN..].copy_from_slice(selector.as_bytes());
        CalleeKey(bytes)
    }

    /// Create a key from raw bytes
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        CalleeKey(bytes)
    }

    /// Create a key from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        if slice.len() != Self::LEN {
            return Err(AddressError::InvalidLength {
                expected: Self::LEN,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; 12];
        bytes.copy_from_slice(slice);
        Ok(CalleeKey(bytes))
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// The short-address half of the key
    pub fn short_address(&self) -> [u8; 8] {
        let mut short = [0u8; 8];
        short.copy_from_slice(&self.0[..Address::SHORT_LEN]);
        short
    }

    /// The selector half of the key
    pub fn selector(&self) -> Selector {
        Selector::from_calldata(&self.0[Address::SHORT_LEN..])
    }
}

impl fmt::Debug for CalleeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalleeKey(0x{})", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for CalleeKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
