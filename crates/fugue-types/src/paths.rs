//! Property-path scheme for callee execution hints
//!
//! The VM records per-callee execution properties as state transitions on
//! paths of the form
//! `fugue://account/<40-hex address>/func/<hex selector>[/suffix]`.
//! The scheduler's `import` parses these and updates its callee registry.

use fugue_primitives::{Address, CalleeKey, Selector};

/// Prefix of every account-scoped storage path
pub const ACCOUNT_PREFIX: &str = "fugue://account/";

/// Path segment separating the contract address from the function selector
pub const FUNC_PATH: &str = "/func/";

/// Suffix marking a sequential/parallel execution flag transition
pub const EXECUTION_PARALLELISM: &str = "/parallel";

/// Suffix marking an exception-list transition
pub const EXECUTION_EXCEPTED: &str = "/except";

/// Suffix marking a deferrable (gas-prepayment) flag transition
pub const REQUIRED_GAS_PREPAYMENT: &str = "/defer";

/// Flag byte meaning the callee must only run sequentially
pub const SEQUENTIAL_EXECUTION: u8 = 1;

/// The execution-property a suffix selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertySuffix {
    /// Sequential/parallel execution flag
    Parallelism,
    /// Exception list for the sequential flag
    Excepted,
    /// Deferrable flag
    GasPrepayment,
}

/// A parsed callee property path.
#[derive(Clone, Debug, PartialEq)]
pub struct CalleeProperty {
    /// The contract address
    pub address: Address,
    /// The function selector
    pub selector: Selector,
    /// The property the path addresses, when a known suffix is present
    pub suffix: Option<PropertySuffix>,
}

impl CalleeProperty {
    /// The compact key of the addressed callee
    pub fn key(&self) -> CalleeKey {
        CalleeKey::compact(&self.address, &self.selector)
    }
}

/// Whether a path addresses a callee function under an account.
pub fn is_property_path(path: &str) -> bool {
    parse_callee_path(path).is_some()
}

/// Parse a callee property path into its address, selector and suffix.
/// Returns `None` for paths outside the property scheme.
pub fn parse_callee_path(path: &str) -> Option<CalleeProperty> {
    let rest = path.strip_prefix(ACCOUNT_PREFIX)?;
    let func_at = rest.find(FUNC_PATH)?;

    let addr_part = rest[..func_at].trim_start_matches("0x");
    let addr_bytes = hex::decode(addr_part).ok()?;
    let address = Address::from_slice(&addr_bytes).ok()?;

    let after = &rest[func_at + FUNC_PATH.len()..];
    let (sel_part, tail) = match after.find('/') {
        Some(i) => (&after[..i], &after[i..]),
        None => (after, ""),
    };
    let sel_bytes = hex::decode(sel_part).ok()?;
    if sel_bytes.len() < Selector::LEN {
        return None;
    }
    let selector = Selector::from_slice(&sel_bytes[..Selector::LEN]).ok()?;

    let suffix = match tail {
        EXECUTION_PARALLELISM => Some(PropertySuffix::Parallelism),
        EXECUTION_EXCEPTED => Some(PropertySuffix::Excepted),
        REQUIRED_GAS_PREPAYMENT => Some(PropertySuffix::GasPrepayment),
        _ => None,
    };

    Some(CalleeProperty {
        address,
        selector,
        suffix,
    })
}

/// Build the property path for an (address, selector) pair, with an optional
/// suffix segment.
pub fn callee_path(address: &Address, selector: &Selector, suffix: &str) -> String {
    format!(
        "{}{}{}{}{}",
        ACCOUNT_PREFIX,
        address.to_hex(),
        FUNC_PATH,
        hex::encode(selector.as_bytes()),
        suffix
    )
}
