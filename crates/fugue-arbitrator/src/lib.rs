//! # fugue-arbitrator
//!
//! The conflict arbitrator of the fugue runtime. A batch of transactions is
//! speculatively executed in parallel; every access each transaction made is
//! recorded as a [`Transition`](fugue_types::Transition). The arbitrator
//! groups transitions by state key, classifies each group's head access once,
//! and applies per-class compatibility rules to decide which transactions
//! touched shared state in ways that cannot be reconciled and must be
//! re-executed.
//!
//! Conflicts are data, not errors: [`Arbitrator::detect`] returns them to the
//! caller, which typically feeds the offending callee pairs into the
//! scheduler's conflict history.
//!
//! ## Pipeline
//!
//! 1. Wildcard transitions (bulk prefix operations) are pulled aside and
//!    expanded into concrete per-key deletes ([`Wildcards`]).
//! 2. Each path group is sorted by transaction id and scanned against the
//!    head transition's access class.
//! 3. Cumulative commutative writes are additionally bounds-checked by the
//!    [`Accumulator`].
//!
//! Path groups are independent and are scanned in parallel.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod accumulator;
mod arbitrator;
mod conflict;
mod wildcard;

pub use accumulator::Accumulator;
pub use arbitrator::Arbitrator;
pub use conflict::{tx_hits, unique_pairs, Conflict, ConflictKind};
pub use wildcard::Wildcards;
