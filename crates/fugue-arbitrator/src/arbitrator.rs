//! Per-batch conflict detection

use crate::accumulator::Accumulator;
use crate::conflict::{Conflict, ConflictKind};
use crate::wildcard::Wildcards;
use fugue_types::{AccessClass, Transition};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// The per-batch conflict arbitrator.
///
/// Holds the transitions of one speculatively executed batch, grouped by
/// state key, plus the batch's wildcard transitions. [`Arbitrator::detect`]
/// drains the held state and emits one conflict per contested key, so the
/// usual lifecycle is construct, [`insert`](Arbitrator::insert), detect,
/// drop.
#[derive(Debug, Default)]
pub struct Arbitrator {
    groups: BTreeMap<String, Vec<(u64, Transition)>>,
    wildcards: Wildcards,
    next_sequence: u64,
}

impl Arbitrator {
    /// Create an empty arbitrator
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a slice of transitions with their execution-group ids.
    ///
    /// Transitions are stamped with a batch-order sequence ordinal as they
    /// arrive; wildcards are set aside for expansion. Returns the number of
    /// transitions held after the insert.
    pub fn insert(
        &mut self,
        group_ids: &[u64],
        transitions: impl IntoIterator<Item = Transition>,
    ) -> usize {
        let mut entries = Vec::new();
        for (&group_id, mut transition) in group_ids.iter().zip(transitions) {
            transition.set_sequence(self.next_sequence);
            self.next_sequence += 1;
            entries.push((group_id, transition));
        }

        for (group_id, transition) in self.wildcards.filter(entries) {
            self.groups
                .entry(transition.path().to_string())
                .or_default()
                .push((group_id, transition));
        }
        self.len()
    }

    /// Number of transitions currently held (wildcards included)
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum::<usize>() + self.wildcards.len()
    }

    /// Whether no transitions are held
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.wildcards.is_empty()
    }

    /// Drop all held state
    pub fn clear(&mut self) {
        self.groups.clear();
        self.wildcards.clear();
        self.next_sequence = 0;
    }

    /// Insert and immediately detect; equivalent to `insert` followed by
    /// [`detect`](Arbitrator::detect).
    pub fn insert_and_detect(
        &mut self,
        group_ids: &[u64],
        transitions: impl IntoIterator<Item = Transition>,
    ) -> Vec<Conflict> {
        self.insert(group_ids, transitions);
        self.detect()
    }

    /// Run conflict detection over the held batch and drain it.
    ///
    /// Path groups are independent; they are scanned in parallel and the
    /// resulting conflicts are returned in path order.
    pub fn detect(&mut self) -> Vec<Conflict> {
        let groups = std::mem::take(&mut self.groups);
        let mut wildcards = std::mem::take(&mut self.wildcards);
        wildcards.sort();

        let mut groups: Vec<(String, Vec<(u64, Transition)>)> = groups.into_iter().collect();
        let group_count = groups.len();

        let conflicts: Vec<Conflict> = groups
            .par_iter_mut()
            .flat_map_iter(|(key, group)| {
                wildcards.expand_into(key, group);
                group.sort_by_key(|(_, t)| (t.tx_id(), t.sequence()));

                let mut found = Vec::new();
                if group.len() >= 2 {
                    if let Some(conflict) = scan_group(key, group) {
                        found.push(conflict);
                    }
                }
                if let Some(conflict) = Accumulator::check_bounds(group) {
                    found.push(conflict);
                }
                found
            })
            .collect();

        debug!(
            groups = group_count,
            conflicts = conflicts.len(),
            "conflict detection finished"
        );
        conflicts
    }
}

/// Scan one sorted path group: classify the head once, find the first
/// follower incompatible with it, and report it together with everything
/// after it.
fn scan_group(key: &str, group: &[(u64, Transition)]) -> Option<Conflict> {
    let (_, head) = &group[0];
    let class = head.access_class();

    let offset = group[1..]
        .iter()
        .position(|(_, t)| !compatible(head, class, t))?;

    let culprits = &group[1 + offset..];
    Some(Conflict {
        key: key.to_string(),
        self_tx: head.tx_id(),
        self_transition: head.clone(),
        conflicting_tx_ids: culprits.iter().map(|(_, t)| t.tx_id()).collect(),
        conflicting_transitions: culprits.iter().map(|(_, t)| t.clone()).collect(),
        group_ids: culprits.iter().map(|(g, _)| *g).collect(),
        kind: kind_for(class),
    })
}

/// The per-class compatibility rules. `head` is the group's first transition,
/// `class` its precomputed access class.
fn compatible(head: &Transition, class: AccessClass, next: &Transition) -> bool {
    match class {
        AccessClass::ReadOnly => next.access_class() == AccessClass::ReadOnly,
        AccessClass::DeltaWriteOnly => next.access_class() == AccessClass::DeltaWriteOnly,
        AccessClass::DeleteOnly => next.access_class() == AccessClass::DeleteOnly,
        AccessClass::CumulativeWriteOnly => {
            next.access_class() == AccessClass::CumulativeWriteOnly
                && head.bounds() == next.bounds()
        }
        // A key can be newly initialized at most once per batch, and a plain
        // write tolerates no concurrent second access.
        AccessClass::NilInitOnly | AccessClass::Write => false,
    }
}

fn kind_for(class: AccessClass) -> ConflictKind {
    match class {
        AccessClass::ReadOnly => ConflictKind::ReadMixedWithWrite,
        AccessClass::DeltaWriteOnly => ConflictKind::DeltaMixedWithNonDelta,
        AccessClass::DeleteOnly => ConflictKind::DeleteMixed,
        AccessClass::CumulativeWriteOnly => ConflictKind::CommutativeInitMixed,
        AccessClass::NilInitOnly => ConflictKind::NilInitMixed,
        AccessClass::Write => ConflictKind::WriteConflict,
    }
}
