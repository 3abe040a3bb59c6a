//! # fugue-primitives
//!
//! Identity types shared by the arbitrator and the scheduler: contract
//! addresses, function selectors, and the compact callee key that the
//! scheduler uses as its unit of parallelism granularity.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod callee_key;

pub use address::{Address, AddressError, Selector};
pub use callee_key::CalleeKey;
