//! Property-based invariant tests for the reactive runtime.
//!
//! 1. An effect's dependency set is exactly what its latest run read.
//! 2. A batch runs each subscriber at most once, with the final value, and a
//!    reader of a signal and of memos over it never sees them disagree.
//! 3. Store writes notify exactly the leaves whose value changed.
//! 4. Store snapshots agree with a plain vector model.
//! 5. Equal writes never re-run anything.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use ripple_core::reactive::{batch, create_store, Effect, Memo, Path, Signal, StoreValue};

// ── Helpers ─────────────────────────────────────────────────────────────

fn mask_strategy(len: usize) -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), len)
}

fn slot(index: usize) -> Path {
    Path::root().key("slots").index(index)
}

#[derive(Debug, Clone)]
enum Write {
    Set(usize, i64),
    Push(i64),
}

fn write_strategy() -> impl Strategy<Value = Write> {
    prop_oneof![
        3 => (0usize..4, -3i64..3).prop_map(|(index, value)| Write::Set(index, value)),
        1 => (-3i64..3).prop_map(Write::Push),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Dependencies mirror the latest run
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dependencies_mirror_latest_reads(
        first in mask_strategy(6),
        second in mask_strategy(6),
    ) {
        let sources: Vec<Signal<u8>> = (0..6).map(|_| Signal::new(0)).collect();
        let mask = Signal::new(first);

        let effect = {
            let sources = sources.clone();
            let mask = mask.clone();
            Effect::new(move || {
                for (source, read) in sources.iter().zip(mask.get()) {
                    if read {
                        source.get();
                    }
                }
            })
        };

        mask.set(second.clone());

        let expected = second.iter().filter(|read| **read).count();
        prop_assert_eq!(effect.dependency_count(), expected + 1);
        for (source, read) in sources.iter().zip(&second) {
            prop_assert_eq!(source.subscriber_count(), usize::from(*read));
        }
        effect.dispose();
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Batches coalesce
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn batch_runs_subscriber_once_with_final_value(
        writes in proptest::collection::vec(-5i32..5, 1..20),
    ) {
        let signal = Signal::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let effect = {
            let signal = signal.clone();
            let seen = Rc::clone(&seen);
            Effect::new(move || seen.borrow_mut().push(signal.get()))
        };

        batch(|| {
            for value in &writes {
                signal.set(*value);
            }
        });

        // The signal starts at 0, so the first non-zero write dirties it.
        let dirtied = writes.iter().any(|value| *value != 0);
        let last = *writes.last().unwrap_or(&0);
        let seen = seen.borrow();
        if dirtied {
            prop_assert_eq!(seen.as_slice(), &[0, last]);
        } else {
            prop_assert_eq!(seen.as_slice(), &[0]);
        }
        effect.dispose();
    }
}

proptest! {
    #[test]
    fn batch_reader_sees_settled_memos(
        writes in proptest::collection::vec(-50i64..50, 1..12),
    ) {
        let source = Signal::new(0i64);
        let shifted = {
            let source = source.clone();
            Memo::new(move || source.get() + 1)
        };
        let scaled = {
            let shifted = shifted.clone();
            Memo::new(move || shifted.get() * 3)
        };
        let seen = Rc::new(RefCell::new(Vec::new()));
        let reader = {
            let source = source.clone();
            let seen = Rc::clone(&seen);
            Effect::new(move || {
                seen.borrow_mut().push((source.get(), shifted.get(), scaled.get()));
            })
        };

        batch(|| {
            for value in &writes {
                source.set(*value);
            }
        });

        let last = *writes.last().unwrap_or(&0);
        let dirtied = writes.iter().any(|value| *value != 0);
        prop_assert_eq!(reader.run_count(), if dirtied { 2 } else { 1 });
        for (raw, plus_one, tripled) in seen.borrow().iter() {
            prop_assert_eq!(*plus_one, raw + 1);
            prop_assert_eq!(*tripled, (raw + 1) * 3);
        }
        let final_raw = seen.borrow().last().map(|entry| entry.0);
        prop_assert_eq!(final_raw, Some(if dirtied { last } else { 0 }));
        reader.dispose();
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3 + 4. Store writes against a vector model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn store_notifies_exactly_changed_leaves(
        writes in proptest::collection::vec(write_strategy(), 0..24),
    ) {
        let mut model: Vec<i64> = vec![0, 0, 0, 0];
        let (store, set_store) = create_store(StoreValue::from_iter([(
            "slots",
            model.iter().copied().map(StoreValue::from).collect::<StoreValue>(),
        )]));

        let mut expected_runs = vec![1usize; model.len()];
        let runs: Vec<Rc<Cell<usize>>> = (0..model.len()).map(|_| Rc::default()).collect();
        let effects: Vec<Effect> = runs
            .iter()
            .enumerate()
            .map(|(index, count)| {
                let leaf = store.select(&slot(index)).unwrap();
                let count = Rc::clone(count);
                Effect::new(move || {
                    leaf.get();
                    count.set(count.get() + 1);
                })
            })
            .collect();

        for write in &writes {
            match write {
                Write::Set(index, value) => {
                    set_store.set(&slot(*index), *value).unwrap();
                    if model[*index] != *value {
                        expected_runs[*index] += 1;
                    }
                    model[*index] = *value;
                }
                Write::Push(value) => {
                    set_store.push(&Path::root().key("slots"), *value).unwrap();
                    model.push(*value);
                }
            }
        }

        let observed: Vec<usize> = runs.iter().map(|count| count.get()).collect();
        prop_assert_eq!(observed, expected_runs);

        let snapshot = store.snapshot();
        let slots: Vec<i64> = snapshot
            .pointer(&Path::root().key("slots"))
            .and_then(StoreValue::as_list)
            .map(|items| items.iter().filter_map(StoreValue::as_i64).collect())
            .unwrap_or_default();
        prop_assert_eq!(slots, model);

        for effect in effects {
            effect.dispose();
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Equal writes are free
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn equal_writes_never_rerun(value in any::<i64>(), repeats in 1usize..10) {
        let signal = Signal::new(value);
        let runs = Rc::new(Cell::new(0));
        let effect = {
            let signal = signal.clone();
            let runs = Rc::clone(&runs);
            Effect::new(move || {
                signal.get();
                runs.set(runs.get() + 1);
            })
        };

        for _ in 0..repeats {
            signal.set(value);
        }
        prop_assert_eq!(runs.get(), 1);
        effect.dispose();
    }
}
