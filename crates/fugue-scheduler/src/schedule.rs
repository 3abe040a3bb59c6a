//! Schedules and the optimized 3-D execution layout

use crate::scheduler::Scheduler;
use fugue_primitives::CalleeKey;
use fugue_types::StandardMessage;
use std::collections::HashMap;

/// The partition of one inbound batch, as produced by
/// [`Scheduler::schedule`].
///
/// Every input message lands in exactly one bucket. `generations` holds the
/// rounds of callees with no recorded conflict between them; everything the
/// independent-set search could not place stays in `with_conflict`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schedule {
    /// Plain value transfers (no calldata)
    pub transfers: Vec<StandardMessage>,
    /// Contract deployments (no recipient)
    pub deployments: Vec<StandardMessage>,
    /// Calls to callees never observed before
    pub unknowns: Vec<StandardMessage>,
    /// Observed callees that could not be placed in a parallel generation
    pub with_conflict: Vec<StandardMessage>,
    /// Calls to callees flagged sequential-only
    pub sequentials: Vec<StandardMessage>,
    /// Parallel rounds found by the independent-set search
    pub generations: Vec<Vec<StandardMessage>>,
}

impl Schedule {
    /// Total number of messages across all buckets
    pub fn message_count(&self) -> usize {
        self.transfers.len()
            + self.deployments.len()
            + self.unknowns.len()
            + self.with_conflict.len()
            + self.sequentials.len()
            + self.generations.iter().map(Vec::len).sum::<usize>()
    }

    /// Produce the final 3-D layout: generations, each a set of parallel
    /// lanes, each lane a sequential chain of messages.
    ///
    /// Round 0 runs transfers-plus-deployments alongside the sequential
    /// leftovers; the independent-set generations follow, one message per
    /// lane. Unknown callees form the trailing rounds, grouped by compact
    /// key: under the active defer policy the last duplicate of each group is
    /// pushed into one more round and marked deferred. Empty lanes and rounds
    /// are stripped.
    pub fn optimize(self, scheduler: &Scheduler) -> Vec<Vec<Vec<StandardMessage>>> {
        let mut rounds: Vec<Vec<Vec<StandardMessage>>> = Vec::new();

        let mut lane_static = self.transfers;
        lane_static.extend(self.deployments);
        let mut lane_serial = self.with_conflict;
        lane_serial.extend(self.sequentials);
        rounds.push(vec![lane_static, lane_serial]);

        for generation in self.generations {
            rounds.push(generation.into_iter().map(|msg| vec![msg]).collect());
        }

        if !self.unknowns.is_empty() {
            let (leading, deferred) = split_unknown_deferrals(self.unknowns, scheduler);
            rounds.push(leading.into_iter().map(|msg| vec![msg]).collect());
            rounds.push(deferred.into_iter().map(|msg| vec![msg]).collect());
        }

        for round in &mut rounds {
            round.retain(|lane| !lane.is_empty());
        }
        rounds.retain(|round| !round.is_empty());
        rounds
    }
}

/// Group unknown-callee messages by compact key (first-occurrence order) and
/// defer the last duplicate of each group when the policy allows it. A
/// single-message group is only marked deferred, not moved.
fn split_unknown_deferrals(
    unknowns: Vec<StandardMessage>,
    scheduler: &Scheduler,
) -> (Vec<StandardMessage>, Vec<StandardMessage>) {
    let mut order: Vec<CalleeKey> = Vec::new();
    let mut groups: HashMap<CalleeKey, Vec<StandardMessage>> = HashMap::new();
    for msg in unknowns {
        let key = msg.callee_key().unwrap_or_default();
        if !groups.contains_key(&key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(msg);
    }

    let mut leading = Vec::new();
    let mut deferred = Vec::new();
    for key in order {
        let Some(mut msgs) = groups.remove(&key) else {
            continue;
        };
        if scheduler.defers_unknown(&key) {
            if msgs.len() == 1 {
                msgs[0].is_deferred = true;
            } else if let Some(mut last) = msgs.pop() {
                last.is_deferred = true;
                deferred.push(last);
            }
        }
        leading.extend(msgs);
    }
    (leading, deferred)
}
