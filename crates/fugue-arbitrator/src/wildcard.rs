//! Wildcard transition handling
//!
//! A wildcard transition addresses a path prefix with a terminal `*` or `[:]`
//! marker and stands for a bulk operation (typically a bulk delete) over every
//! extant key under that prefix. Before conflict detection the wildcards are
//! pulled out of the batch and re-materialized as concrete per-key writes in
//! every path group they cover, so the arbitrator sees them as ordinary
//! conflicting accesses.

use fugue_types::Transition;

/// Holds the wildcard transitions of the current batch.
#[derive(Debug, Default)]
pub struct Wildcards {
    held: Vec<(u64, Transition)>,
}

impl Wildcards {
    /// Create an empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a wildcard transition with its execution-group id
    pub fn hold(&mut self, group_id: u64, transition: Transition) {
        self.held.push((group_id, transition));
    }

    /// Pull every wildcard transition out of `entries` into the holder and
    /// return the remaining concrete transitions.
    pub fn filter(&mut self, entries: Vec<(u64, Transition)>) -> Vec<(u64, Transition)> {
        let (wild, concrete): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|(_, t)| t.is_wildcard());
        for (group_id, transition) in wild {
            self.hold(group_id, transition);
        }
        concrete
    }

    /// Sort held wildcards by ascending path length, then lexicographically,
    /// so broader prefixes are applied first.
    pub fn sort(&mut self) {
        self.held
            .sort_by(|(_, a), (_, b)| {
                let (ap, bp) = (a.path(), b.path());
                ap.len().cmp(&bp.len()).then_with(|| ap.cmp(bp))
            });
    }

    /// Expand held wildcards onto the path group at `key`.
    ///
    /// For each wildcard whose prefix strictly covers `key`, a concrete
    /// delete transition is synthesized (clone, re-path, bump writes, nil
    /// value, mark expanded) and appended to the group. A wildcard is skipped
    /// when the key did not exist before the batch, or when its transaction
    /// already has a direct transition on the key.
    pub fn expand_into(&self, key: &str, group: &mut Vec<(u64, Transition)>) {
        for (group_id, wildcard) in &self.held {
            let Some(prefix) = wildcard.wildcard_prefix() else {
                continue;
            };
            if !key.starts_with(prefix) || key.len() == prefix.len() {
                continue;
            }
            if !group.iter().any(|(_, t)| t.preexist()) {
                continue;
            }
            if group.iter().any(|(_, t)| t.tx_id() == wildcard.tx_id()) {
                continue;
            }

            let mut substituted = wildcard.clone();
            substituted.set_path(key);
            substituted.increment_writes();
            substituted.set_value(None);
            substituted.set_expanded(true);
            group.push((*group_id, substituted));
        }
    }

    /// Number of held wildcards
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Whether no wildcards are held
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Drop all held wildcards
    pub fn clear(&mut self) {
        self.held.clear();
    }
}
