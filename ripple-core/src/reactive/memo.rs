//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! A memo is a private signal plus a private effect:
//!
//! 1. On creation, the effect runs the computation once and the result seeds
//!    the signal.
//!
//! 2. When a dependency changes, the effect recomputes and writes the result
//!    into the signal.
//!
//! 3. The write goes through the signal's equality check. If the new value
//!    equals the cached one, nothing downstream runs.
//!
//! # Why This Matters
//!
//! Readers of a memo depend on the memo's signal, not on the memo's inputs:
//!
//! - A signal changes
//! - The memo recomputes and gets the same answer
//! - None of the memo's readers re-run
//!
//! The signal is only ever written from inside the memo's own effect; the
//! memo hands out read-only access.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::effect::Effect;
use super::runtime::Runtime;
use super::signal::{ReadSignal, Signal};
use crate::error::EffectFault;
use crate::graph::SignalId;

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be PartialEq.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (some memos might return the same value even if inputs changed).
pub struct Memo<T: 'static> {
    /// The cached value, readable by anyone.
    signal: ReadSignal<T>,

    /// The computation that keeps `signal` current.
    effect: Effect,
}

impl<T: PartialEq + 'static> Memo<T> {
    /// Create a new memo with the given computation function.
    ///
    /// The computation runs immediately, under the current owner.
    ///
    /// # Panics
    ///
    /// If the computation panics on its first run there is no value to cache,
    /// so this constructor panics too, whatever the fault policy or handler.
    /// Use [`try_new`](Self::try_new) to get the fault back instead.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        match Self::try_new(compute) {
            Ok(memo) => memo,
            Err(fault) => panic!("memo computation panicked during its first run: {fault}"),
        }
    }

    /// Create a new memo, returning the fault if the first run panics.
    ///
    /// A returned fault is handed to the caller only: it is not passed to the
    /// fault handler or the fault policy. The memo's computation is disposed.
    pub fn try_new<F>(compute: F) -> Result<Self, EffectFault>
    where
        F: Fn() -> T + 'static,
    {
        Runtime::entry(|| {
            let target: Rc<RefCell<Option<Signal<T>>>> = Rc::default();
            let seed: Rc<RefCell<Option<T>>> = Rc::default();

            let effect = {
                let target = Rc::clone(&target);
                let seed = Rc::clone(&seed);
                Effect::new_computation(move || {
                    let value = compute();
                    let signal = target.borrow().clone();
                    match signal {
                        Some(signal) => signal.set(value),
                        None => *seed.borrow_mut() = Some(value),
                    }
                })
            };

            let initial = seed.borrow_mut().take();
            let Some(initial) = initial else {
                let fault = Runtime::claim_fault(effect.id())
                    .or_else(|| effect.fault())
                    .unwrap_or_else(|| EffectFault {
                        effect: effect.id(),
                        message: "memo computation produced no value".to_string(),
                    });
                effect.dispose();
                return Err(fault);
            };

            let signal = Signal::new(initial);
            *target.borrow_mut() = Some(signal.clone());

            Ok(Self {
                signal: signal.read_only(),
                effect,
            })
        })
    }
}

impl<T: 'static> Memo<T> {
    /// The graph key of the memo's signal.
    pub fn id(&self) -> SignalId {
        self.signal.id()
    }

    /// Borrow the cached value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Borrow the cached value without tracking the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with_untracked(f)
    }

    /// A read-only handle to the memo's signal.
    pub fn read_signal(&self) -> ReadSignal<T> {
        self.signal.clone()
    }

    /// Number of times the computation has run.
    pub fn compute_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.signal.subscriber_count()
    }

    /// Stop recomputing and detach the memo's signal from the graph.
    pub fn dispose(&self) {
        self.effect.dispose();
        Runtime::dispose_signal(self.signal.id());
    }

    /// Check if the memo has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Get the cached value, tracking the read.
    ///
    /// This is the main entry point for reading a memo's value.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// Get the cached value without tracking the read.
    pub fn get_untracked(&self) -> T {
        self.signal.get_untracked()
    }
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T: 'static> From<Memo<T>> for ReadSignal<T> {
    fn from(memo: Memo<T>) -> Self {
        memo.signal
    }
}

impl<T: Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("value", &self.signal)
            .field("compute_count", &self.compute_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create a memo. Shorthand for [`Memo::new`].
///
/// # Panics
///
/// Panics if the computation panics on its first run; see [`Memo::try_new`].
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    Memo::new(compute)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
