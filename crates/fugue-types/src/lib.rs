//! # fugue-types
//!
//! The record types exchanged between the speculative executor and the
//! conflict core:
//!
//! - [`Transition`]: one transaction's access to one state key, with the
//!   read/write/delta counters and value payload the arbitrator classifies.
//! - [`AccessClass`]: the per-transition access discriminant, computed once.
//! - [`StandardMessage`]: the inbound message envelope the scheduler
//!   partitions into generations.
//! - [`paths`]: the property-path scheme through which the VM feeds callee
//!   execution hints (sequential-only, exception lists, deferrability).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod message;
pub mod paths;
mod transition;

pub use message::{NativeMessage, StandardMessage};
pub use transition::{AccessClass, Cumulative, Transition, Value};
