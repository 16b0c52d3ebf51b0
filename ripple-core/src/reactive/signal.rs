//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal is written with a value its equality check considers
//!    different, all subscribers are notified. Writing an equal value does
//!    nothing at all.
//!
//! 3. Notifications re-run dependent computations, inline or at the end of
//!    the enclosing batch.
//!
//! # Memory Layout
//!
//! Each signal handle consists of:
//! - A graph key (8 bytes) for its subscriber set
//! - The value, shared behind `Rc<RefCell<_>>` by every clone of the handle
//! - The equality check, shared the same way
//!
//! # Ownership
//!
//! A signal belongs to the effect or root that was running when it was
//! created, and is disposed with it. Disposal only detaches the signal from
//! the graph; handles can still read and write the value, they just no longer
//! notify anyone.
//!
//! A signal created outside any owner leaves the graph when its last handle
//! is dropped. Nothing can write it after that, so its subscribers lose a
//! dependency that would never fire again.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::runtime::Runtime;
use super::ReactiveContext;
use crate::graph::{EffectId, SignalId};

type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Signal<T: 'static> {
    /// Graph key for this signal, shared by every clone of this handle.
    node: Rc<NodeHandle>,

    /// The current value, shared by every clone of this handle.
    value: Rc<RefCell<T>>,

    /// Decides whether a write is a no-op.
    equals: Equality<T>,
}

/// Releases an unowned signal's graph node with its last handle.
struct NodeHandle {
    id: SignalId,
    owned: bool,
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if !self.owned {
            Runtime::release_signal(self.id);
        }
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    ///
    /// Writes are compared with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::with_equality(value, |a: &T, b: &T| a == b)
    }

    /// Create a signal owned by an explicit scope rather than the current one.
    pub(crate) fn new_in(value: T, owner: Option<EffectId>) -> Self {
        Self::create(value, Rc::new(|a: &T, b: &T| a == b), owner)
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with a custom equality check.
    ///
    /// A write is skipped when `equals(current, new)` returns true.
    pub fn with_equality(value: T, equals: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self::create(value, Rc::new(equals), ReactiveContext::current_owner())
    }

    fn create(value: T, equals: Equality<T>, owner: Option<EffectId>) -> Self {
        let node = NodeHandle {
            id: Runtime::register_signal(owner),
            owned: owner.is_some(),
        };
        Self {
            node: Rc::new(node),
            value: Rc::new(RefCell::new(value)),
            equals,
        }
    }

    /// Get the signal's graph key.
    pub fn id(&self) -> SignalId {
        self.node.id
    }

    /// Borrow the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber. The closure must not write to
    /// this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(self.node.id);
        f(&*self.value.borrow())
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.borrow())
    }

    /// Set a new value and notify subscribers.
    ///
    /// Returns without notifying anyone if the new value equals the current
    /// one.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.value.borrow_mut();
            if (self.equals)(&*current, &value) {
                false
            } else {
                *current = value;
                true
            }
        };

        if changed {
            Runtime::entry(|| Runtime::notify(self.node.id));
        }
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value. The
    /// result goes through [`set`](Self::set), so an unchanged result does
    /// not notify.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&*self.value.borrow());
        self.set(next);
    }

    /// A read-only handle to the same signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            inner: self.clone(),
        }
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.node.id)
    }

    /// Detach this signal from the graph.
    ///
    /// Subscribers stop depending on it; further writes notify no one.
    pub fn dispose(&self) {
        Runtime::dispose_signal(self.node.id);
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    ///
    /// Use this when you need to read the value without establishing
    /// a reactive dependency.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
            value: Rc::clone(&self.value),
            equals: Rc::clone(&self.equals),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node.id)
            .field("value", &*self.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// A read-only view of a [`Signal`].
///
/// Handed out by memos and stores, whose values may only be written by the
/// runtime itself.
pub struct ReadSignal<T: 'static> {
    inner: Signal<T>,
}

impl<T: 'static> ReadSignal<T> {
    /// Get the signal's graph key.
    pub fn id(&self) -> SignalId {
        self.inner.id()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Borrow the current value without tracking the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with_untracked(f)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<T: Clone + 'static> ReadSignal<T> {
    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Get the current value without tracking the read.
    pub fn get_untracked(&self) -> T {
        self.inner.get_untracked()
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> From<Signal<T>> for ReadSignal<T> {
    fn from(inner: Signal<T>) -> Self {
        Self { inner }
    }
}

impl<T: Debug + 'static> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.inner).finish()
    }
}

/// Create a signal. Shorthand for [`Signal::new`].
pub fn create_signal<T: PartialEq + 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
