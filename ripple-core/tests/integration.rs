//! Integration Tests for Reactive System
//!
//! These tests verify that signals, memos, effects, stores and batches work
//! together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use ripple_core::reactive::{
    batch, create_root, create_store, on_cleanup, Effect, Memo, Path, ReadSignal, Runtime,
    Signal, StoreValue,
};
use ripple_core::{FaultPolicy, RuntimeConfig};
use serde_json::json;

/// An effect that reads `read` and counts its runs.
fn counter(read: impl Fn() + 'static) -> (Effect, Rc<Cell<usize>>) {
    let runs = Rc::new(Cell::new(0));
    let effect = {
        let runs = Rc::clone(&runs);
        Effect::new(move || {
            read();
            runs.set(runs.get() + 1);
        })
    };
    (effect, runs)
}

/// Test that writing an equal value does not re-run subscribers.
#[test]
fn equal_write_does_not_rerun() {
    let signal = Signal::new(5);
    let (_effect, runs) = {
        let signal = signal.clone();
        counter(move || {
            signal.get();
        })
    };

    signal.set(5);
    assert_eq!(runs.get(), 1);

    signal.set(6);
    assert_eq!(runs.get(), 2);
}

/// Test that an effect stops depending on a signal it no longer reads.
#[test]
fn dependencies_shrink_with_control_flow() {
    let flag = Signal::new(true);
    let a = Signal::new(0);

    let (effect, runs) = {
        let flag = flag.clone();
        let a = a.clone();
        counter(move || {
            if flag.get() {
                a.get();
            }
        })
    };
    assert_eq!(effect.dependency_count(), 2);

    flag.set(false);
    assert_eq!(runs.get(), 2);
    assert_eq!(effect.dependency_count(), 1);
    assert_eq!(a.subscriber_count(), 0);

    a.set(1);
    a.set(2);
    assert_eq!(runs.get(), 2);

    // And grows back.
    flag.set(true);
    a.set(3);
    assert_eq!(runs.get(), 4);
}

/// Test that cleanups run newest first, strictly before the next body.
#[test]
fn cleanups_run_in_reverse_before_rerun() {
    let signal = Signal::new(0);
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let _effect = {
        let signal = signal.clone();
        let log = Rc::clone(&log);
        Effect::new(move || {
            let run = signal.get();
            log.borrow_mut().push(format!("run {run}"));
            for name in ["a", "b"] {
                let log = Rc::clone(&log);
                on_cleanup(move || log.borrow_mut().push(format!("cleanup {name} {run}")))
                    .expect("inside an effect");
            }
        })
    };

    signal.set(1);
    assert_eq!(
        *log.borrow(),
        ["run 0", "cleanup b 0", "cleanup a 0", "run 1"]
    );
}

/// Test that a memo producing an equal value does not notify its readers.
#[test]
fn memo_short_circuits_equal_results() {
    let src = Signal::new(1);
    let parity = {
        let src = src.clone();
        Memo::new(move || src.get() % 2)
    };
    let (_effect, runs) = {
        let parity = parity.clone();
        counter(move || {
            parity.get();
        })
    };

    src.set(3);
    assert_eq!(parity.compute_count(), 2);
    assert_eq!(runs.get(), 1);

    src.set(4);
    assert_eq!(runs.get(), 2);
}

/// Test that writing one store leaf re-runs only that leaf's readers.
#[test]
fn store_leaves_are_isolated() {
    let (store, set_store) = create_store(json!({
        "items": [
            { "title": "write tests", "completed": false },
            { "title": "ship it", "completed": false },
        ],
    }));
    let completed = |index: usize| Path::root().key("items").index(index).key("completed");

    let views: Vec<(Effect, Rc<Cell<usize>>)> = (0..2)
        .map(|index| {
            let leaf: ReadSignal<StoreValue> = store.select(&completed(index)).unwrap();
            counter(move || {
                leaf.get();
            })
        })
        .collect();

    set_store.set(&completed(0), true).unwrap();

    assert_eq!(views[0].1.get(), 2);
    assert_eq!(views[1].1.get(), 1);
    assert_eq!(
        store.snapshot().pointer(&completed(0)),
        Some(&StoreValue::Bool(true))
    );
}

/// Test that disposing twice neither panics nor runs cleanups twice.
#[test]
fn dispose_is_idempotent() {
    let cleanups = Rc::new(Cell::new(0));
    let effect = {
        let cleanups = Rc::clone(&cleanups);
        Effect::new(move || {
            let cleanups = Rc::clone(&cleanups);
            on_cleanup(move || cleanups.set(cleanups.get() + 1)).unwrap();
        })
    };

    effect.dispose();
    effect.dispose();

    assert!(effect.is_disposed());
    assert_eq!(cleanups.get(), 1);
}

/// Test that a batch runs each subscriber once, with the final value.
#[test]
fn batch_coalesces_writes() {
    let signal = Signal::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let _effect = {
        let signal = signal.clone();
        let seen = Rc::clone(&seen);
        Effect::new(move || seen.borrow_mut().push(signal.get()))
    };

    batch(|| {
        signal.set(1);
        signal.set(2);
    });

    assert_eq!(*seen.borrow(), [0, 2]);
}

/// Test that a reader of both a signal and a memo over it runs once per batch
/// and never observes the memo's stale value.
#[test]
fn batch_runs_reader_of_source_and_memo_once() {
    let a = Signal::new(1);
    let m = {
        let a = a.clone();
        Memo::new(move || a.get() * 10)
    };
    let seen = Rc::new(RefCell::new(Vec::new()));
    let reader = {
        let a = a.clone();
        let seen = Rc::clone(&seen);
        Effect::new(move || seen.borrow_mut().push((a.get(), m.get())))
    };

    batch(|| a.set(2));

    assert_eq!(reader.run_count(), 2);
    assert_eq!(*seen.borrow(), [(1, 10), (2, 20)]);
}

/// Test that a memo chain settles completely before its reader runs.
#[test]
fn batch_settles_memo_chain_before_reader() {
    let a = Signal::new(1);
    let m1 = {
        let a = a.clone();
        Memo::new(move || a.get() + 1)
    };
    let m2 = Memo::new(move || m1.get() * 100);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let reader = {
        let a = a.clone();
        let seen = Rc::clone(&seen);
        Effect::new(move || seen.borrow_mut().push((a.get(), m2.get())))
    };

    batch(|| a.set(5));

    assert_eq!(reader.run_count(), 2);
    assert_eq!(*seen.borrow(), [(1, 200), (5, 600)]);
}

/// Test that dropping an unowned signal returns the graph to its size.
#[test]
fn dropped_signals_leave_the_graph() {
    let before = Runtime::signal_count();
    for value in 0..1000 {
        drop(Signal::new(value));
    }
    assert_eq!(Runtime::signal_count(), before);

    let (store, set_store) = create_store(json!({ "a": 1, "b": [1, 2] }));
    store.select(&Path::root().key("a")).unwrap();
    store.select_len(&Path::root().key("b")).unwrap();
    assert_eq!(Runtime::signal_count(), before + 2);
    drop(store);
    drop(set_store);
    assert_eq!(Runtime::signal_count(), before);
}

/// Builds `a -> (b, c) -> d` and returns `a` and the values `d` observed.
fn diamond() -> (Signal<i32>, Rc<RefCell<Vec<(i32, i32)>>>, Effect) {
    let a = Signal::new(1);
    let b = {
        let a = a.clone();
        Memo::new(move || a.get() + 1)
    };
    let c = {
        let a = a.clone();
        Memo::new(move || a.get() * 10)
    };

    let seen = Rc::new(RefCell::new(Vec::new()));
    let d = {
        let seen = Rc::clone(&seen);
        Effect::new(move || seen.borrow_mut().push((b.get(), c.get())))
    };
    (a, seen, d)
}

/// Without a batch the sink of a diamond runs once per upstream path, and
/// the first of those runs sees one branch updated and the other stale.
#[test]
fn diamond_without_batch_runs_sink_per_path() {
    let (a, seen, d) = diamond();

    a.set(2);

    assert_eq!(d.run_count(), 3);
    assert_eq!(*seen.borrow(), [(2, 10), (3, 10), (3, 20)]);
}

/// Inside a batch the sink of a diamond runs once, with both branches settled.
#[test]
fn diamond_inside_batch_runs_sink_once() {
    let (a, seen, d) = diamond();

    batch(|| a.set(2));

    assert_eq!(d.run_count(), 2);
    assert_eq!(*seen.borrow(), [(2, 10), (3, 20)]);
}

/// Test that a panicking effect does not stop its siblings.
#[test]
fn faulted_effect_does_not_block_siblings() {
    let faults = Rc::new(RefCell::new(Vec::new()));
    {
        let faults = Rc::clone(&faults);
        Runtime::set_fault_handler(move |fault| faults.borrow_mut().push(fault.clone()));
    }

    let signal = Signal::new(0);
    let faulty = {
        let signal = signal.clone();
        Effect::new(move || {
            if signal.get() == 1 {
                panic!("cannot render 1");
            }
        })
    };
    let (_sibling, sibling_runs) = {
        let signal = signal.clone();
        counter(move || {
            signal.get();
        })
    };

    signal.set(1);
    assert_eq!(sibling_runs.get(), 2);
    assert!(faulty.is_faulted());
    assert_eq!(faults.borrow().len(), 1);
    assert_eq!(faults.borrow()[0].effect, faulty.id());
    assert_eq!(faults.borrow()[0].message, "cannot render 1");

    // Still subscribed, and recovers on the next good value.
    signal.set(2);
    assert!(!faulty.is_faulted());
    assert_eq!(faulty.run_count(), 3);

    Runtime::clear_fault_handler();
}

/// Without a handler, the default policy re-raises the fault at the writer.
#[test]
fn fault_propagates_to_writer_by_default() {
    let signal = Signal::new(0);
    let _faulty = {
        let signal = signal.clone();
        Effect::new(move || {
            if signal.get() > 0 {
                panic!("bad value");
            }
        })
    };
    let (_sibling, sibling_runs) = {
        let signal = signal.clone();
        counter(move || {
            signal.get();
        })
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| signal.set(1)));

    let payload = result.expect_err("fault should reach the writer");
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.contains("bad value"), "unexpected message: {message}");
    assert_eq!(sibling_runs.get(), 2);

    // The runtime is usable afterwards.
    signal.set(0);
    assert_eq!(sibling_runs.get(), 3);
}

/// Under the log policy, faults are recorded on the effect only.
#[test]
fn log_policy_swallows_faults() {
    Runtime::configure(RuntimeConfig::default().with_fault_policy(FaultPolicy::Log));

    let effect = Effect::new(|| panic!("logged only"));
    assert!(effect.is_faulted());
    assert_eq!(
        effect.fault().map(|fault| fault.message),
        Some("logged only".to_string())
    );

    Runtime::configure(RuntimeConfig::default());
}

/// Test that disposing a root releases everything created under it.
#[test]
fn root_disposal_releases_graph_nodes() {
    let signals_before = Runtime::signal_count();
    let effects_before = Runtime::effect_count();
    let source = Signal::new(0);

    let root = create_root(|root| {
        let local = Signal::new(1);
        let doubled = {
            let source = source.clone();
            Memo::new(move || source.get() * 2)
        };
        Effect::new(move || {
            local.get();
            doubled.get();
        });
        root
    });

    // source + local + the memo's signal
    assert_eq!(Runtime::signal_count(), signals_before + 3);
    // root + memo computation + effect
    assert_eq!(Runtime::effect_count(), effects_before + 3);

    root.dispose();

    assert_eq!(Runtime::signal_count(), signals_before + 1);
    assert_eq!(Runtime::effect_count(), effects_before);
    assert_eq!(source.subscriber_count(), 0);
}

/// Test that a self-writing effect settles without recursing.
#[test]
fn self_write_settles_after_reruns() {
    let signal = Signal::new(0);
    let effect = {
        let signal = signal.clone();
        Effect::new(move || {
            let value = signal.get();
            if value < 5 {
                signal.set(value + 1);
            }
        })
    };

    assert_eq!(signal.get(), 5);
    assert_eq!(effect.run_count(), 6);
}

/// Test that the rerun bound stops an effect that always invalidates itself.
#[test]
fn runaway_self_write_is_bounded() {
    Runtime::configure(RuntimeConfig::default().with_max_reruns(10));

    let signal = Signal::new(0u64);
    let effect = {
        let signal = signal.clone();
        Effect::new(move || {
            let value = signal.get();
            signal.set(value + 1);
        })
    };

    Runtime::configure(RuntimeConfig::default());
    assert_eq!(effect.run_count(), 11);
    assert_eq!(signal.get(), 11);
}

/// Test that separate threads drive separate graphs.
#[test]
fn threads_have_isolated_graphs() {
    let signal = Signal::new(0);
    let (_effect, runs) = {
        let signal = signal.clone();
        counter(move || {
            signal.get();
        })
    };

    let other_thread_signals = std::thread::spawn(|| {
        let local = Signal::new("elsewhere");
        local.set("changed");
        Runtime::signal_count()
    })
    .join()
    .unwrap();

    assert_eq!(other_thread_signals, 1);
    signal.set(1);
    assert_eq!(runs.get(), 2);
}
