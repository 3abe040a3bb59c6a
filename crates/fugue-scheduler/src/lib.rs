//! # fugue-scheduler
//!
//! The placement half of the fugue conflict core. The scheduler keeps a
//! persistent registry of callees — `(contract address, function selector)`
//! pairs — together with the conflict pairs observed between them by the
//! arbitrator (or supplied by an operator). Given a batch of inbound
//! messages it produces a [`Schedule`]: transfers and deployments split off,
//! known-sequential and known-conflicting calls separated, and the rest
//! packed into *generations* of callees with no recorded conflict between
//! them. Duplicate calls to a deferrable callee are split across consecutive
//! generations.
//!
//! [`Schedule::optimize`] turns the raw schedule into the final 3-D layout
//! consumed by the executor: generations → parallel lanes → sequential
//! chains.
//!
//! The registry survives across batches and can be persisted to a history
//! file; `load(save(x))` reproduces `x`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod callee;
mod codec;
mod error;
mod schedule;
mod scheduler;

pub use callee::{Callee, CalleeRegistry};
pub use error::{SchedulerError, SchedulerResult};
pub use schedule::Schedule;
pub use scheduler::Scheduler;
