//! End-to-end scheduler scenarios

use bytes::Bytes;
use fugue_primitives::{Address, CalleeKey, Selector};
use fugue_scheduler::{Schedule, Scheduler};
use fugue_types::paths::{
    callee_path, EXECUTION_PARALLELISM, REQUIRED_GAS_PREPAYMENT, SEQUENTIAL_EXECUTION,
};
use fugue_types::{StandardMessage, Transition, Value};

fn addr(seed: u8) -> Address {
    Address::from_bytes([seed; 20])
}

fn sel(seed: u8) -> Selector {
    Selector::from_bytes([seed; 4])
}

/// A call whose calldata starts with `selector` repeated.
fn call(id: u64, to: Address, selector: u8, arg: u8) -> StandardMessage {
    StandardMessage::call(id, to, vec![selector, selector, selector, selector, arg, arg, arg, arg])
}

fn round_sizes(rounds: &[Vec<Vec<StandardMessage>>]) -> Vec<usize> {
    rounds
        .iter()
        .map(|round| round.iter().map(Vec::len).sum())
        .collect()
}

// ==================== Persistence ====================

#[test]
fn test_add_save_load_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history");

    let scheduler = Scheduler::new(None, true).expect("scheduler");
    assert!(scheduler.add(&addr(0xa1), &sel(1), &addr(0xb1), &sel(2)));
    assert!(scheduler.add(&addr(0xc1), &sel(3), &addr(0xd1), &sel(4)));

    // Repeats are not new.
    assert!(!scheduler.add(&addr(0xa1), &sel(1), &addr(0xb1), &sel(2)));
    assert!(!scheduler.add(&addr(0xc1), &sel(3), &addr(0xd1), &sel(4)));
    assert_eq!(scheduler.callee_count(), 4);

    scheduler.save(&path).expect("save");

    let reloaded = Scheduler::new(Some(path.as_path()), true).expect("load");
    assert_eq!(reloaded.callee_count(), 4);

    // The loaded graph still knows the pair.
    assert!(!reloaded.add(&addr(0xa1), &sel(1), &addr(0xb1), &sel(2)));
    // A fresh selector on one side makes a new pair.
    assert!(reloaded.add(&addr(0xa1), &sel(9), &addr(0xb1), &sel(2)));
}

#[test]
fn test_load_preserves_flags_and_stats() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history");

    let scheduler = Scheduler::new(None, false).expect("scheduler");
    scheduler.import(&[
        Transition::new(
            0,
            callee_path(&addr(1), &sel(1), EXECUTION_PARALLELISM),
            0,
            1,
            0,
            Some(Value::Bytes(Bytes::from_static(&[SEQUENTIAL_EXECUTION]))),
        ),
        Transition::new(
            0,
            callee_path(&addr(2), &sel(2), REQUIRED_GAS_PREPAYMENT),
            0,
            1,
            0,
            Some(Value::Bytes(Bytes::from_static(&[1]))),
        ),
    ]);
    scheduler.record_call(&addr(1), &sel(1), 30_000);
    scheduler.save(&path).expect("save");

    let reloaded = Scheduler::new(Some(path.as_path()), false).expect("load");
    assert_eq!(reloaded.callee_count(), 2);

    // Sequential flag survived: the call routes to `sequentials`.
    let schedule = reloaded.schedule(vec![call(0, addr(1), 1, 0)]);
    assert_eq!(schedule.sequentials.len(), 1);

    // Deferrable flag survived: duplicate unknown-bucket calls still defer.
    let schedule = reloaded.schedule(vec![call(0, addr(2), 2, 0), call(1, addr(2), 2, 1)]);
    let optimized = schedule.optimize(&reloaded);
    assert_eq!(round_sizes(&optimized), vec![1, 1]);
}

#[test]
fn test_missing_history_starts_empty() {
    let scheduler =
        Scheduler::new(Some(std::path::Path::new("./no-such-history")), false).expect("scheduler");
    assert_eq!(scheduler.callee_count(), 0);
}

// ==================== Deferral of repeated callees ====================

#[test]
fn test_three_calls_same_unknown_callee_defer_on() {
    let scheduler = Scheduler::new(None, true).expect("scheduler");
    let a = addr(0xaa);

    let schedule = scheduler.schedule(vec![
        call(0, a, 5, 0),
        call(1, a, 5, 1),
        call(2, a, 5, 2),
    ]);
    let optimized = schedule.optimize(&scheduler);

    // Two preceding calls run first, the deferred duplicate follows.
    assert_eq!(round_sizes(&optimized), vec![2, 1]);
    assert_eq!(optimized[1][0][0].id, 2);
    assert!(optimized[1][0][0].is_deferred);
    assert!(optimized[0].iter().flatten().all(|m| !m.is_deferred));
}

#[test]
fn test_three_calls_same_unknown_callee_defer_off() {
    let scheduler = Scheduler::new(None, false).expect("scheduler");
    let a = addr(0xaa);

    let schedule = scheduler.schedule(vec![
        call(0, a, 5, 0),
        call(1, a, 5, 1),
        call(2, a, 5, 2),
    ]);
    let optimized = schedule.optimize(&scheduler);

    assert_eq!(round_sizes(&optimized), vec![3]);
    assert!(optimized[0].iter().flatten().all(|m| !m.is_deferred));
}

#[test]
fn test_single_unknown_call_marked_deferred_under_policy() {
    let scheduler = Scheduler::new(None, true).expect("scheduler");
    let schedule = scheduler.schedule(vec![call(0, addr(0xaa), 5, 0)]);
    let optimized = schedule.optimize(&scheduler);

    // One round, one lane; the lone call stays but carries the mark.
    assert_eq!(round_sizes(&optimized), vec![1]);
    assert!(optimized[0][0][0].is_deferred);
}

// ==================== Known conflict pairs ====================

#[test]
fn test_known_pairs_split_into_two_generations() {
    let scheduler = Scheduler::new(None, true).expect("scheduler");
    let (a, b, c, d) = (addr(0xa1), addr(0xb1), addr(0xc1), addr(0xd1));

    scheduler.add(&a, &sel(1), &b, &sel(2));
    scheduler.add(&c, &sel(3), &d, &sel(4));

    let schedule = scheduler.schedule(vec![
        call(0, a, 1, 0),
        call(1, b, 2, 0),
        call(2, c, 3, 0),
        call(3, d, 4, 0),
        StandardMessage::deployment(4, vec![4, 4, 4, 4]),
        StandardMessage::transfer(5, Address::ZERO, 100),
    ]);

    // Raw generations: {A, C} then {B, D}.
    assert_eq!(schedule.generations.len(), 2);
    assert_eq!(schedule.generations[0].len(), 2);
    assert_eq!(schedule.generations[1].len(), 2);
    let gen0: Vec<u64> = schedule.generations[0].iter().map(|m| m.id).collect();
    let gen1: Vec<u64> = schedule.generations[1].iter().map(|m| m.id).collect();
    assert_eq!(gen0, vec![0, 2]);
    assert_eq!(gen1, vec![1, 3]);

    // Optimized: transfer+deployment, then the two generations.
    let optimized = schedule.optimize(&scheduler);
    assert_eq!(round_sizes(&optimized), vec![2, 2, 2]);
}

#[test]
fn test_every_message_lands_exactly_once() {
    let scheduler = Scheduler::new(None, true).expect("scheduler");
    scheduler.add(&addr(1), &sel(1), &addr(2), &sel(2));
    scheduler.add(&addr(3), &sel(3), &addr(4), &sel(4));
    scheduler.add(&addr(1), &sel(1), &addr(3), &sel(3));
    scheduler.import(&[Transition::new(
        0,
        callee_path(&addr(6), &sel(6), EXECUTION_PARALLELISM),
        0,
        1,
        0,
        Some(Value::Bytes(Bytes::from_static(&[SEQUENTIAL_EXECUTION]))),
    )]);

    let messages = vec![
        StandardMessage::transfer(0, addr(9), 1),
        StandardMessage::deployment(1, vec![1, 1, 1, 1]),
        call(2, addr(1), 1, 0),
        call(3, addr(2), 2, 0),
        call(4, addr(3), 3, 0),
        call(5, addr(4), 4, 0),
        call(6, addr(5), 5, 0), // unknown
        call(7, addr(6), 6, 0), // sequential
        call(8, addr(1), 1, 1), // duplicate of a known callee
    ];
    let total = messages.len();

    let schedule = scheduler.schedule(messages);
    assert_eq!(schedule.message_count(), total);

    let optimized = schedule.optimize(&scheduler);
    let mut ids: Vec<u64> = optimized
        .iter()
        .flatten()
        .flatten()
        .map(|m| m.id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..total as u64).collect::<Vec<_>>());
}

#[test]
fn test_generations_are_independent_sets() {
    let scheduler = Scheduler::new(None, false).expect("scheduler");

    // A ring of conflicts over six callees: i conflicts with i+1.
    let mut pairs = Vec::new();
    for i in 0..6u8 {
        let j = (i + 1) % 6;
        scheduler.add(&addr(i + 1), &sel(i + 1), &addr(j + 1), &sel(j + 1));
        pairs.push((
            CalleeKey::compact(&addr(i + 1), &sel(i + 1)),
            CalleeKey::compact(&addr(j + 1), &sel(j + 1)),
        ));
    }

    let messages: Vec<StandardMessage> = (0..6u8)
        .map(|i| call(u64::from(i), addr(i + 1), i + 1, 0))
        .collect();
    let schedule = scheduler.schedule(messages);

    for generation in &schedule.generations {
        for (i, left) in generation.iter().enumerate() {
            for right in &generation[i + 1..] {
                let (lk, rk) = (
                    left.callee_key().expect("key"),
                    right.callee_key().expect("key"),
                );
                let conflicting = pairs
                    .iter()
                    .any(|(a, b)| (*a == lk && *b == rk) || (*a == rk && *b == lk));
                assert!(
                    !conflicting,
                    "messages {} and {} share a generation but conflict",
                    left.id, right.id
                );
            }
        }
    }
}

// ==================== Determinism ====================

#[test]
fn test_schedule_is_deterministic_across_thread_counts() {
    let build_batch = || -> Vec<StandardMessage> {
        (0..64u64)
            .map(|i| call(i, addr((i % 11) as u8 + 1), (i % 7) as u8 + 1, i as u8))
            .collect()
    };

    let scheduler = Scheduler::new(None, true).expect("scheduler");
    for i in 0..10u8 {
        scheduler.add(&addr(i + 1), &sel(i % 7 + 1), &addr(i + 2), &sel((i + 1) % 7 + 1));
    }

    let reference: Schedule = scheduler.schedule(build_batch());
    let reference_optimized = reference.clone().optimize(&scheduler);

    for threads in [1, 2, 8] {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("pool");
        let schedule = pool.install(|| scheduler.schedule(build_batch()));
        assert_eq!(schedule, reference, "{threads} threads");
        assert_eq!(
            schedule.optimize(&scheduler),
            reference_optimized,
            "{threads} threads (optimized)"
        );
    }
}

#[test]
fn test_empty_batch_yields_empty_schedule() {
    let scheduler = Scheduler::new(None, true).expect("scheduler");
    let schedule = scheduler.schedule(Vec::new());
    assert_eq!(schedule.message_count(), 0);
    assert!(schedule.optimize(&scheduler).is_empty());
}
