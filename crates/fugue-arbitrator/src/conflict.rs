//! Conflict records emitted by the arbitrator

use fugue_types::Transition;
use std::collections::BTreeMap;
use std::fmt;

/// Why a group of transitions on one key conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    /// A read-only head followed by anything that writes or deltas
    ReadMixedWithWrite,
    /// A delta-only head followed by a non-delta access
    DeltaMixedWithNonDelta,
    /// A delete-only head followed by a non-delete
    DeleteMixed,
    /// A cumulative head followed by a non-cumulative access, or by a
    /// cumulative one with different declared bounds
    CommutativeInitMixed,
    /// A nil initialization followed by anything, including another nil init
    NilInitMixed,
    /// A plain write or read-write head; any concurrent second access loses
    WriteConflict,
    /// A cumulative partial sum left the declared bounds
    AccumulatorOutOfBounds,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::ReadMixedWithWrite => "read mixed with write",
            ConflictKind::DeltaMixedWithNonDelta => "delta write mixed with non-delta",
            ConflictKind::DeleteMixed => "delete mixed with non-delete",
            ConflictKind::CommutativeInitMixed => "commutative write mixed with incompatible access",
            ConflictKind::NilInitMixed => "nil initialization mixed with another access",
            ConflictKind::WriteConflict => "concurrent access to a written key",
            ConflictKind::AccumulatorOutOfBounds => "accumulated value out of bounds",
        };
        f.write_str(s)
    }
}

/// One detected conflict: a victim transaction and the transactions whose
/// accesses to the same key are incompatible with it.
#[derive(Clone, Debug)]
pub struct Conflict {
    /// The contested storage key
    pub key: String,
    /// The victim transaction (the group's head)
    pub self_tx: u64,
    /// The victim's transition at the key
    pub self_transition: Transition,
    /// The culprit transactions, in group order
    pub conflicting_tx_ids: Vec<u64>,
    /// The culprits' transitions, parallel to `conflicting_tx_ids`
    pub conflicting_transitions: Vec<Transition>,
    /// Execution-group ids of the culprits, parallel to `conflicting_tx_ids`
    pub group_ids: Vec<u64>,
    /// The incompatibility that was detected
    pub kind: ConflictKind,
}

impl Conflict {
    /// The logical pair set of this conflict: `(self_tx, t)` for every
    /// culprit `t`.
    pub fn pairs(&self) -> Vec<(u64, u64)> {
        self.conflicting_tx_ids
            .iter()
            .map(|&t| (self.self_tx, t))
            .collect()
    }
}

/// All unique `(victim, culprit)` pairs across a conflict list, sorted.
pub fn unique_pairs(conflicts: &[Conflict]) -> Vec<(u64, u64)> {
    let mut pairs: Vec<(u64, u64)> = conflicts.iter().flat_map(Conflict::pairs).collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// How many conflicts each culprit transaction appears in. The keys of the
/// returned map are the transactions that must be re-executed.
pub fn tx_hits(conflicts: &[Conflict]) -> BTreeMap<u64, u32> {
    let mut hits = BTreeMap::new();
    for conflict in conflicts {
        for &tx in &conflict.conflicting_tx_ids {
            *hits.entry(tx).or_insert(0) += 1;
        }
    }
    hits
}
