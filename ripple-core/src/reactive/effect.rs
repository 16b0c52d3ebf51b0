//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously, or once
//!    at the end of the enclosing batch.
//!
//! 3. Before re-running, the effect runs its cleanups (newest first),
//!    disposes the effects and signals it created last time, and drops its
//!    old dependencies. The new run tracks a fresh set, so a dependency read
//!    only behind a branch that is no longer taken stops triggering it.
//!
//! # Use Cases
//!
//! Effects are used to synchronize reactive state with the outside world:
//!
//! - Patching a rendered node when state changes
//! - Logging state changes
//! - Starting and stopping timers or subscriptions
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - A memo's value is itself a signal other computations can depend on.
//!
//! # Cleanup
//!
//! Register teardown with [`on_cleanup`](super::on_cleanup) from inside the
//! body. Cleanups run before the next run and when the effect is disposed.

use std::rc::Rc;

use super::runtime::Runtime;
use crate::error::EffectFault;
use crate::graph::{EffectId, EffectStatus, NodeKind};

/// A side-effecting computation that runs when dependencies change.
///
/// Cloning the handle does not clone the effect. Dropping every handle does
/// not dispose it either; an effect lives until [`dispose`](Self::dispose) is
/// called or its owner is torn down.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = Effect::new(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    /// Graph key for this effect.
    id: EffectId,

    /// Shared with the graph node; survives disposal.
    status: Rc<EffectStatus>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_kind(NodeKind::Effect, run)
    }

    /// Create the computation behind a memo.
    pub(crate) fn new_computation<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_kind(NodeKind::Memo, run)
    }

    fn with_kind<F>(kind: NodeKind, run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let (id, status) = Runtime::create_effect(kind, Rc::new(run));
        Self { id, status }
    }

    /// Get the effect's graph key.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Dispose of the effect.
    ///
    /// Runs its cleanups, disposes everything it owns, and unsubscribes it
    /// from every signal. After disposal, the effect will not run again.
    /// Calling this more than once has no further effect.
    pub fn dispose(&self) {
        Runtime::entry(|| Runtime::dispose_effect(self.id));
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.status.disposed.get()
    }

    /// Get the number of times the effect body has run.
    pub fn run_count(&self) -> usize {
        self.status.run_count.get()
    }

    /// Get the number of signals read during the latest run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.id)
    }

    /// The fault raised by the latest run, if it panicked.
    pub fn fault(&self) -> Option<EffectFault> {
        self.status.fault.borrow().clone()
    }

    /// Check if the latest run panicked.
    pub fn is_faulted(&self) -> bool {
        self.status.fault.borrow().is_some()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create an effect. Shorthand for [`Effect::new`].
pub fn create_effect<F>(run: F) -> Effect
where
    F: Fn() + 'static,
{
    Effect::new(run)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
