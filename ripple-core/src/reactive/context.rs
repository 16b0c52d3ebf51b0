//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack. Each entry carries two roles:
//!
//! - the **owner**, which adopts effects, signals and cleanups created while
//!   the entry is on top;
//! - the **observer**, which subscribes to every signal read while the entry
//!   is on top.
//!
//! An effect run is both. A root scope is an owner with no observer, and
//! [`untrack`](super::untrack) keeps the owner but clears the observer.
//!
//! # Confinement
//!
//! The stack is per thread and never shared. Each thread therefore drives its
//! own isolated reactive graph, and the guard is `!Send` so it cannot be
//! dropped on a thread other than the one that pushed it.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::graph::EffectId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextEntry {
    owner: Option<EffectId>,
    observer: Option<EffectId>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    entry: ContextEntry,
    _not_send: PhantomData<Rc<()>>,
}

impl ReactiveContext {
    fn push(entry: ContextEntry) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(entry));
        Self {
            entry,
            _not_send: PhantomData,
        }
    }

    /// Enter an effect run: the effect owns what it creates and observes
    /// what it reads.
    pub(crate) fn enter_effect(effect: EffectId) -> Self {
        Self::push(ContextEntry {
            owner: Some(effect),
            observer: Some(effect),
        })
    }

    /// Enter a scope that owns but does not observe.
    pub(crate) fn enter_owner(owner: EffectId) -> Self {
        Self::push(ContextEntry {
            owner: Some(owner),
            observer: None,
        })
    }

    /// Suspend tracking while keeping the current owner.
    pub(crate) fn enter_untracked() -> Self {
        Self::push(ContextEntry {
            owner: Self::current_owner(),
            observer: None,
        })
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_observer().is_some()
    }

    /// The effect that would subscribe to a signal read right now.
    pub fn current_observer() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.observer))
    }

    /// The scope that would adopt an effect or signal created right now.
    pub fn current_owner() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.owner))
    }

    /// Number of nested contexts on this thread.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry, self.entry,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.entry, entry
                );
            }
        });
    }
}
