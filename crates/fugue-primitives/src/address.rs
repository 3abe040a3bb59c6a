//! Contract address (20 bytes) and function selector (4 bytes)

use std::fmt;
use thiserror::Error;

/// Address parsing error
#[derive(Debug, Error)]
pub enum AddressError {
    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Invalid length
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },
}

/// A 20-byte contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// Size of an address in bytes
    pub const LEN: usize = 20;

    /// Number of leading bytes kept in a compact callee key
    pub const SHORT_LEN: usize = 8;

    /// Zero address (0x0000...0000)
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Create an address from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        if slice.len() != Self::LEN {
            return Err(AddressError::InvalidLength {
                expected: Self::LEN,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(slice);
        Ok(Address(bytes))
    }

    /// Parse an address from a hex string (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The first [`Self::SHORT_LEN`] bytes, as used by the compact callee key
    pub fn short(&self) -> [u8; 8] {
        let mut short = [0u8; 8];
        short.copy_from_slice(&self.0[..Self::SHORT_LEN]);
        short
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Convert to a hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 4-byte contract function selector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Selector([u8; 4]);

impl Selector {
    /// Size of a selector in bytes
    pub const LEN: usize = 4;

    /// Create a selector from bytes
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Selector(bytes)
    }

    /// Create a selector from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        if slice.len() != Self::LEN {
            return Err(AddressError::InvalidLength {
                expected: Self::LEN,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(slice);
        Ok(Selector(bytes))
    }

    /// The selector carried by a calldata payload: its first four bytes.
    /// Shorter payloads are zero-padded.
    pub fn from_calldata(data: &[u8]) -> Self {
        let mut bytes = [0u8; 4];
        let n = data.len().min(Self::LEN);
        bytes[..n].copy_from_slice(&data[..n]);
        Selector(bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector(0x{})", hex::encode(self.0))
    }
}

impl From<[u8; 4]> for Selector {
    fn from(bytes: [u8; 4]) -> Self {
        Selector(bytes)
    }
}

impl AsRef<[u8]> for Selector {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_hex() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert!(!addr.is_zero());

        let addr2 = Address::from_hex("742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        assert_eq!(addr, addr2);
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let original = "0x742d35cc6634c0532925a3b844bc9e7595f0ab3d";
        let addr = Address::from_hex(original).unwrap();
        assert_eq!(addr.to_hex(), original);
    }

    #[test]
    fn test_address_invalid_length() {
        let result = Address::from_slice(&[0u8; 19]);
        match result {
            Err(AddressError::InvalidLength { actual: 19, .. }) => {}
            _ => panic!("expected InvalidLength error"),
        }
    }

    #[test]
    fn test_address_invalid_hex() {
        assert!(Address::from_hex("0xzzzz").is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn test_address_short() {
        let addr = Address::from_bytes([
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
        ]);
        assert_eq!(addr.short(), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_selector_from_calldata() {
        assert_eq!(
            Selector::from_calldata(&[5, 5, 5, 5, 0, 0, 0, 0]),
            Selector::from_bytes([5, 5, 5, 5])
        );
        // Short calldata is zero-padded
        assert_eq!(
            Selector::from_calldata(&[9, 9]),
            Selector::from_bytes([9, 9, 0, 0])
        );
        assert_eq!(Selector::from_calldata(&[]), Selector::default());
    }

    #[test]
    fn test_selector_from_slice() {
        assert!(Selector::from_slice(&[1, 2, 3]).is_err());
        assert_eq!(
            Selector::from_slice(&[1, 2, 3, 4]).unwrap(),
            Selector::from_bytes([1, 2, 3, 4])
        );
    }
}
