//! Bounds checking for cumulative commutative writes
//!
//! Cumulative writes on the same key commute individually, but their combined
//! effect must stay within the key's declared `[min, max]` bounds. The
//! accumulator folds the deltas in sequence order and flags the earliest
//! transition whose partial sum leaves the bounds.

use crate::conflict::{Conflict, ConflictKind};
use fugue_types::{Cumulative, Transition, Value};

/// Stateless bounds checker for one path group.
#[derive(Debug, Default)]
pub struct Accumulator;

impl Accumulator {
    /// Check the cumulative writes within an already-sorted path group.
    ///
    /// Non-cumulative members are ignored. Returns at most one conflict: the
    /// earliest transition whose partial delta sum falls outside its declared
    /// bounds (or overflows), with every following cumulative write as a
    /// culprit.
    pub fn check_bounds(group: &[(u64, Transition)]) -> Option<Conflict> {
        let cumulative: Vec<(&u64, &Transition, Cumulative)> = group
            .iter()
            .filter(|(_, t)| t.is_cumulative_write_only())
            .filter_map(|(g, t)| {
                let value = t.value().and_then(Value::as_cumulative).copied()?;
                Some((g, t, value))
            })
            .collect();
        if cumulative.is_empty() {
            return None;
        }

        let mut sum: i128 = 0;
        for (i, (_, transition, value)) in cumulative.iter().enumerate() {
            let in_bounds = match sum.checked_add(value.delta()) {
                Some(next) => {
                    sum = next;
                    sum >= value.min() && sum <= value.max()
                }
                None => false,
            };

            if !in_bounds {
                let culprits = &cumulative[i + 1..];
                return Some(Conflict {
                    key: transition.path().to_string(),
                    self_tx: transition.tx_id(),
                    self_transition: (*transition).clone(),
                    conflicting_tx_ids: culprits.iter().map(|(_, t, _)| t.tx_id()).collect(),
                    conflicting_transitions: culprits.iter().map(|(_, t, _)| (*t).clone()).collect(),
                    group_ids: culprits.iter().map(|(g, _, _)| **g).collect(),
                    kind: ConflictKind::AccumulatorOutOfBounds,
                });
            }
        }
        None
    }
}
