//! The conflict-history-driven scheduler

use crate::callee::CalleeRegistry;
use crate::codec;
use crate::error::SchedulerResult;
use crate::schedule::Schedule;
use fugue_primitives::{Address, CalleeKey, Selector};
use fugue_types::{StandardMessage, Transition};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Partitions inbound batches into parallel generations using the callee
/// conflict history.
///
/// The registry persists across batches and grows monotonically; it is
/// mutated through [`add`](Scheduler::add),
/// [`add_deferred`](Scheduler::add_deferred), [`import`](Scheduler::import)
/// and [`record_call`](Scheduler::record_call), while
/// [`schedule`](Scheduler::schedule) only reads it. The output is a pure
/// function of the input batch and the registry state.
pub struct Scheduler {
    registry: RwLock<CalleeRegistry>,
    defer_by_default: bool,
}

impl Scheduler {
    /// Create a scheduler. When `history` names an existing file, the callee
    /// registry is loaded from it; otherwise the scheduler starts empty.
    /// `defer_by_default` makes duplicate calls of any callee eligible for
    /// deferral, not just those flagged deferrable.
    pub fn new(history: Option<&Path>, defer_by_default: bool) -> SchedulerResult<Self> {
        let registry = match history {
            Some(path) if path.exists() => {
                let bytes = fs::read(path)?;
                let registry = CalleeRegistry::from_callees(codec::decode_callees(&bytes)?)?;
                info!(callees = registry.len(), path = %path.display(), "loaded conflict history");
                registry
            }
            _ => CalleeRegistry::new(),
        };
        Ok(Self {
            registry: RwLock::new(registry),
            defer_by_default,
        })
    }

    /// Persist the callee registry to `path`.
    pub fn save(&self, path: &Path) -> SchedulerResult<()> {
        let registry = self.registry.read();
        fs::write(path, codec::encode_callees(registry.callees()))?;
        info!(callees = registry.len(), path = %path.display(), "saved conflict history");
        Ok(())
    }

    /// The active default-deferral policy
    pub fn defer_by_default(&self) -> bool {
        self.defer_by_default
    }

    /// Number of interned callees
    pub fn callee_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Record a symmetric conflict pair between two callees, interning both.
    /// Returns whether the pair was new.
    pub fn add(
        &self,
        l_addr: &Address,
        l_sel: &Selector,
        r_addr: &Address,
        r_sel: &Selector,
    ) -> bool {
        let mut registry = self.registry.write();
        let (left, _) = registry.find(l_addr, l_sel);
        let (right, _) = registry.find(r_addr, r_sel);
        registry.add_conflict(left, right)
    }

    /// Mark a callee as deferrable, interning it if needed.
    pub fn add_deferred(&self, addr: &Address, sel: &Selector) {
        let mut registry = self.registry.write();
        let (index, _) = registry.find(addr, sel);
        if let Some(callee) = registry.get_mut(index) {
            callee.deferrable = true;
        }
    }

    /// Ingest VM property transitions (sequential flags, exception lists,
    /// deferrable flags).
    pub fn import(&self, transitions: &[Transition]) {
        self.registry.write().import(transitions);
    }

    /// Fold one executed call's gas use into the callee's statistics.
    pub fn record_call(&self, addr: &Address, sel: &Selector, gas: u32) {
        let mut registry = self.registry.write();
        let (index, _) = registry.find(addr, sel);
        if let Some(callee) = registry.get_mut(index) {
            callee.record_call(gas);
        }
    }

    /// Whether an unknown-group with this key defers its last duplicate:
    /// a known callee must be flagged deferrable, an unobserved one defers
    /// only under `defer_by_default`.
    pub(crate) fn defers_unknown(&self, key: &CalleeKey) -> bool {
        let registry = self.registry.read();
        match registry.lookup(key) {
            Some(index) => registry.get(index).map_or(false, |c| c.deferrable),
            None => self.defer_by_default,
        }
    }

    /// Partition a batch of messages into a [`Schedule`].
    ///
    /// Transfers and deployments split off first; the rest are resolved
    /// against the registry (in parallel, read-only). Unknown callees and
    /// sequential-only callees get their own buckets, and the remainder runs
    /// through a greedy independent-set search over the conflict graph,
    /// lowest-degree callees first. Within each resulting lane-set, duplicate
    /// calls to one callee are split across two consecutive generations when
    /// the deferral policy allows.
    pub fn schedule(&self, messages: Vec<StandardMessage>) -> Schedule {
        let mut schedule = Schedule::default();
        if messages.is_empty() {
            return schedule;
        }

        let mut rest = Vec::with_capacity(messages.len());
        for msg in messages {
            if msg.native.data.is_empty() {
                schedule.transfers.push(msg);
            } else if msg.native.to.is_none() {
                schedule.deployments.push(msg);
            } else {
                rest.push(msg);
            }
        }
        if rest.is_empty() {
            return schedule;
        }

        let guard = self.registry.read();
        let registry = &*guard;

        // Resolve callee indices in parallel; the registry is only read.
        let indices: Vec<Option<u32>> = rest
            .par_iter()
            .map(|msg| msg.callee_key().and_then(|key| registry.lookup(&key)))
            .collect();

        let mut pairs: Vec<(u32, StandardMessage)> = Vec::with_capacity(rest.len());
        for (msg, index) in rest.into_iter().zip(indices) {
            match index {
                None => schedule.unknowns.push(msg),
                Some(index) if registry.get(index).map_or(false, |c| c.sequential) => {
                    schedule.sequentials.push(msg)
                }
                Some(index) => pairs.push((index, msg)),
            }
        }

        // Fewest recorded conflicts first, message id as the tie-breaker.
        pairs.sort_by_key(|(index, msg)| {
            let degree = registry
                .get(*index)
                .map_or(0, |c| c.conflict_indices.len());
            (degree, msg.id)
        });

        while !pairs.is_empty() {
            let (seed_index, seed_msg) = pairs.remove(0);
            let mut lane_set = vec![(seed_index, seed_msg)];
            let mut lane_callees: HashSet<u32> = HashSet::from([seed_index]);
            let mut blacklist: HashSet<u32> = registry
                .get(seed_index)
                .map_or_else(HashSet::new, |c| c.conflict_indices.iter().copied().collect());

            let mut i = 0;
            while i < pairs.len() {
                let candidate = pairs[i].0;
                let admissible = !blacklist.contains(&candidate)
                    && registry.get(candidate).map_or(true, |c| {
                        c.conflict_indices
                            .iter()
                            .all(|other| !lane_callees.contains(other))
                    });
                if admissible {
                    if let Some(callee) = registry.get(candidate) {
                        blacklist.extend(callee.conflict_indices.iter().copied());
                    }
                    lane_callees.insert(candidate);
                    lane_set.push(pairs.remove(i));
                } else {
                    i += 1;
                }
            }

            if lane_set.len() == 1 {
                // Nothing can run alongside it; everything left is serial.
                if let Some((_, msg)) = lane_set.pop() {
                    schedule.with_conflict.push(msg);
                }
                break;
            }

            let deferred = self.defer_duplicates(registry, &mut lane_set);
            schedule
                .generations
                .push(lane_set.into_iter().map(|(_, msg)| msg).collect());
            if !deferred.is_empty() {
                schedule.generations.push(deferred);
            }
        }

        schedule
            .with_conflict
            .extend(pairs.into_iter().map(|(_, msg)| msg));
        schedule.generations.retain(|g| !g.is_empty());

        debug!(
            transfers = schedule.transfers.len(),
            deployments = schedule.deployments.len(),
            unknowns = schedule.unknowns.len(),
            sequentials = schedule.sequentials.len(),
            with_conflict = schedule.with_conflict.len(),
            generations = schedule.generations.len(),
            "batch scheduled"
        );
        schedule
    }

    /// Move the last message of every duplicate-callee run out of the
    /// lane-set when the deferral policy allows it. The lane-set is left
    /// sorted by `(callee index, message id)`.
    fn defer_duplicates(
        &self,
        registry: &CalleeRegistry,
        lane_set: &mut Vec<(u32, StandardMessage)>,
    ) -> Vec<StandardMessage> {
        lane_set.sort_by_key(|(index, msg)| (*index, msg.id));

        let mut deferred = Vec::new();
        let mut i = 0;
        while i < lane_set.len() {
            let index = lane_set[i].0;
            let mut end = i + 1;
            while end < lane_set.len() && lane_set[end].0 == index {
                end += 1;
            }

            let eligible = self.defer_by_default
                || registry.get(index).map_or(false, |c| c.deferrable);
            if end - i > 1 && eligible {
                let (_, mut msg) = lane_set.remove(end - 1);
                msg.is_deferred = true;
                deferred.push(msg);
                i = end - 1;
            } else {
                i = end;
            }
        }
        deferred
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            registry: RwLock::new(CalleeRegistry::new()),
            defer_by_default: false,
        }
    }
}
