//! Callee registry: a dense-index arena of contract functions
//!
//! Callees are interned on first sight and identified by a monotonically
//! assigned `u32` index; the conflict graph is stored as adjacency lists over
//! those indices, which keeps symmetric edges compact and avoids any cyclic
//! references. Indices are never reused.

use crate::error::{SchedulerError, SchedulerResult};
use fugue_primitives::{Address, CalleeKey, Selector};
use fugue_types::paths::{self, PropertySuffix};
use fugue_types::{Transition, Value};
use std::collections::HashMap;
use tracing::debug;

/// A contract function observed by the scheduler, with everything known
/// about its execution behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callee {
    /// Dense index of this callee in the registry
    pub index: u32,
    /// Compact `short_address || selector` identity
    pub key: CalleeKey,
    /// Indices of callees known to conflict with this one
    pub conflict_indices: Vec<u32>,
    /// This callee is never run in parallel
    pub sequential: bool,
    /// Callee keys exempted from the `sequential` flag
    pub except_list: Vec<CalleeKey>,
    /// Total number of recorded calls
    pub calls: u32,
    /// Running average gas per call
    pub avg_gas: u32,
    /// Duplicate calls in one batch may be split across generations
    pub deferrable: bool,
}

impl Callee {
    pub(crate) fn new(index: u32, key: CalleeKey) -> Self {
        Self {
            index,
            key,
            conflict_indices: Vec::new(),
            sequential: false,
            except_list: Vec::new(),
            calls: 0,
            avg_gas: 0,
            deferrable: false,
        }
    }

    /// Whether `index` is already recorded as a conflict neighbor
    pub fn is_in_conflict_list(&self, index: u32) -> bool {
        self.conflict_indices.contains(&index)
    }

    /// Record one call and fold its gas use into the running average
    pub fn record_call(&mut self, gas: u32) {
        self.calls += 1;
        let total = u64::from(self.avg_gas) * u64::from(self.calls - 1) + u64::from(gas);
        self.avg_gas = (total / u64::from(self.calls)) as u32;
    }
}

/// The append-only callee arena plus the compact-key interning table.
#[derive(Debug, Default)]
pub struct CalleeRegistry {
    callees: Vec<Callee>,
    dict: HashMap<CalleeKey, u32>,
}

impl CalleeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from decoded callee records. Records must arrive in
    /// dense index order.
    pub(crate) fn from_callees(callees: Vec<Callee>) -> SchedulerResult<Self> {
        let mut dict = HashMap::with_capacity(callees.len());
        for (i, callee) in callees.iter().enumerate() {
            if callee.index as usize != i {
                return Err(SchedulerError::Corrupt("callee indices are not dense"));
            }
            if dict.insert(callee.key, callee.index).is_some() {
                return Err(SchedulerError::Corrupt("duplicate callee key"));
            }
        }
        Ok(Self { callees, dict })
    }

    /// Number of interned callees
    pub fn len(&self) -> usize {
        self.callees.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }

    /// The callee at `index`
    pub fn get(&self, index: u32) -> Option<&Callee> {
        self.callees.get(index as usize)
    }

    /// Mutable access to the callee at `index`
    pub fn get_mut(&mut self, index: u32) -> Option<&mut Callee> {
        self.callees.get_mut(index as usize)
    }

    /// All callees in index order
    pub fn callees(&self) -> &[Callee] {
        &self.callees
    }

    /// Index of an already-interned key, if any
    pub fn lookup(&self, key: &CalleeKey) -> Option<u32> {
        self.dict.get(key).copied()
    }

    /// Intern an `(address, selector)` pair. Returns the callee's index and
    /// whether it already existed.
    pub fn find(&mut self, address: &Address, selector: &Selector) -> (u32, bool) {
        self.find_key(CalleeKey::compact(address, selector))
    }

    /// Intern a compact key directly.
    pub fn find_key(&mut self, key: CalleeKey) -> (u32, bool) {
        if let Some(&index) = self.dict.get(&key) {
            return (index, true);
        }
        let index = self.callees.len() as u32;
        self.callees.push(Callee::new(index, key));
        self.dict.insert(key, index);
        (index, false)
    }

    /// Record a symmetric conflict edge between two callee indices.
    /// Idempotent; returns whether the edge is new.
    pub fn add_conflict(&mut self, a: u32, b: u32) -> bool {
        if a as usize >= self.callees.len() || b as usize >= self.callees.len() {
            return false;
        }
        if self.callees[a as usize].is_in_conflict_list(b) {
            return false;
        }
        self.callees[a as usize].conflict_indices.push(b);
        if a != b {
            self.callees[b as usize].conflict_indices.push(a);
        }
        true
    }

    /// Ingest VM property transitions addressed at callee paths.
    ///
    /// Transitions outside the property scheme are ignored; the addressed
    /// callees are interned and their execution flags updated from the
    /// transition values.
    pub fn import(&mut self, transitions: &[Transition]) {
        for transition in transitions {
            let Some(property) = paths::parse_callee_path(transition.path()) else {
                continue;
            };
            let (index, _) = self.find_key(property.key());
            let callee = &mut self.callees[index as usize];

            let payload = transition.value().and_then(Value::as_bytes);
            match property.suffix {
                Some(PropertySuffix::Parallelism) => {
                    if let Some(flag) = payload.and_then(|b| b.first()) {
                        callee.sequential = *flag == paths::SEQUENTIAL_EXECUTION;
                    }
                }
                Some(PropertySuffix::Excepted) => {
                    if let Some(bytes) = payload {
                        for chunk in bytes.chunks_exact(CalleeKey::LEN) {
                            if let Ok(key) = CalleeKey::from_slice(chunk) {
                                if !callee.except_list.contains(&key) {
                                    callee.except_list.push(key);
                                }
                            }
                        }
                    }
                }
                Some(PropertySuffix::GasPrepayment) => {
                    if let Some(flag) = payload.and_then(|b| b.first()) {
                        callee.deferrable = *flag > 0;
                    }
                }
                None => {}
            }
        }
        debug!(callees = self.callees.len(), "imported property transitions");
    }
}
