//! Store Implementation
//!
//! A Store holds a nested [`StoreValue`] tree and hands out one signal per
//! selected path, so effects can depend on a single leaf instead of the whole
//! tree.
//!
//! # How Stores Work
//!
//! 1. [`Store::select`] lazily creates a signal for a path and caches it in a
//!    trie keyed by path segments. Selecting the same path again returns the
//!    same signal.
//!
//! 2. A write through [`SetStore`] builds a new root that shares every subtree
//!    off the written path with the old one.
//!
//! 3. The signals on the way down to the written path and every selected
//!    signal beneath it are refreshed from the new root inside one batch.
//!    Signal equality drops the refreshes whose value did not change, and
//!    sibling branches of the trie are never visited.
//!
//! # Example
//!
//! ```rust,ignore
//! let (store, set_store) = create_store(json!({ "items": [{ "completed": false }] }));
//!
//! let done = store.select(&path!["items", 0usize, "completed"])?;
//! Effect::new(move || println!("completed: {:?}", done.get()));
//!
//! set_store.set(&path!["items", 0usize, "completed"], true)?;
//! ```
//!
//! # Ownership
//!
//! Every signal a store creates belongs to the scope that created the store,
//! not to whichever effect selected it first.

mod path;
mod trie;
mod value;

pub use path::{Path, PathSegment};
pub use value::{StoreMap, StoreValue};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use self::trie::{PathTrie, Refresh};
use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::signal::{ReadSignal, Signal};
use crate::error::StoreError;
use crate::graph::EffectId;

struct StoreInner {
    root: RefCell<StoreValue>,
    trie: RefCell<PathTrie>,
    owner: Option<EffectId>,
}

/// Read access to a store.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a store owned by the current scope.
    pub fn new(initial: impl Into<StoreValue>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                root: RefCell::new(initial.into()),
                trie: RefCell::new(PathTrie::default()),
                owner: ReactiveContext::current_owner(),
            }),
        }
    }

    /// Create a store from any serializable value.
    pub fn from_serialize<S: Serialize + ?Sized>(initial: &S) -> Result<Self, StoreError> {
        Ok(Self::new(StoreValue::from_serialize(initial)?))
    }

    /// The signal tracking the value at `path`.
    ///
    /// If the value is later removed, the signal reads [`StoreValue::Null`].
    ///
    /// # Errors
    ///
    /// Fails if nothing lives at `path` right now.
    pub fn select(&self, path: &Path) -> Result<ReadSignal<StoreValue>, StoreError> {
        let value = self.inner.root.borrow().resolve(path)?.clone();

        let mut trie = self.inner.trie.borrow_mut();
        let node = trie.entry(path);
        let signal = node
            .value
            .get_or_insert_with(|| Signal::new_in(value, self.inner.owner));
        Ok(signal.read_only())
    }

    /// The signal tracking the length of the list or object at `path`.
    ///
    /// It changes only when elements are added or removed, not when an
    /// existing element is edited in place.
    ///
    /// # Errors
    ///
    /// Fails if nothing lives at `path`, or if the value there is not a list
    /// or object.
    pub fn select_len(&self, path: &Path) -> Result<ReadSignal<usize>, StoreError> {
        let len = {
            let root = self.inner.root.borrow();
            let value = root.resolve(path)?;
            value.len().ok_or_else(|| StoreError::NotACollection {
                path: path.to_string(),
                kind: value.kind(),
            })?
        };

        let mut trie = self.inner.trie.borrow_mut();
        let node = trie.entry(path);
        let signal = node
            .len
            .get_or_insert_with(|| Signal::new_in(len, self.inner.owner));
        Ok(signal.read_only())
    }

    /// The current root, untracked. O(1).
    pub fn snapshot(&self) -> StoreValue {
        self.inner.root.borrow().clone()
    }

    /// The current root converted into a typed value, untracked.
    pub fn snapshot_as<D: DeserializeOwned>(&self) -> Result<D, StoreError> {
        self.inner.root.borrow().deserialize()
    }

    /// Number of signals selected so far.
    pub fn selected_count(&self) -> usize {
        self.inner.trie.borrow().signal_count()
    }

    /// A write handle for this store.
    pub fn setter(&self) -> SetStore {
        SetStore {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", &*self.inner.root.borrow())
            .field("selected", &self.selected_count())
            .finish()
    }
}

/// Write access to a store, addressed by path.
#[derive(Clone)]
pub struct SetStore {
    inner: Rc<StoreInner>,
}

impl SetStore {
    /// Store `value` at `path`.
    ///
    /// A missing object key at the end of the path is inserted, and the
    /// index one past the end of a list appends.
    ///
    /// # Errors
    ///
    /// Fails if any earlier segment does not exist or addresses the wrong
    /// kind of value. The store is unchanged on error.
    pub fn set(&self, path: &Path, value: impl Into<StoreValue>) -> Result<(), StoreError> {
        let next = self.inner.root.borrow().set_in(path, value.into())?;
        self.commit(next, path);
        Ok(())
    }

    /// Replace the value at `path` with `f` applied to it.
    pub fn update(
        &self,
        path: &Path,
        f: impl FnOnce(&StoreValue) -> StoreValue,
    ) -> Result<(), StoreError> {
        let current = self.inner.root.borrow().resolve(path)?.clone();
        self.set(path, f(&current))
    }

    /// Append `value` to the list at `path`.
    pub fn push(&self, path: &Path, value: impl Into<StoreValue>) -> Result<(), StoreError> {
        // Anything but a list rejects the index segment in `set`.
        let len = self
            .inner
            .root
            .borrow()
            .resolve(path)?
            .as_list()
            .map_or(0, <[StoreValue]>::len);
        self.set(&path.clone().index(len), value)
    }

    /// Remove the value at `path` and return it.
    ///
    /// Removing a list element shifts the elements after it down by one.
    /// Removing the root leaves `Null` behind.
    pub fn remove(&self, path: &Path) -> Result<StoreValue, StoreError> {
        let Some(parent) = path.parent() else {
            let removed = self.inner.root.replace(StoreValue::Null);
            self.refresh(path);
            return Ok(removed);
        };

        let (next, removed) = self.inner.root.borrow().remove_in(path)?;
        self.commit(next, &parent);
        Ok(removed)
    }

    /// Store any serializable value at `path`.
    pub fn set_serialize<S: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &S,
    ) -> Result<(), StoreError> {
        self.set(path, StoreValue::from_serialize(value)?)
    }

    fn commit(&self, next: StoreValue, refresh_from: &Path) {
        self.inner.root.replace(next);
        self.refresh(refresh_from);
    }

    fn refresh(&self, from: &Path) {
        let mut refreshes = Vec::new();
        {
            let root = self.inner.root.borrow();
            self.inner.trie.borrow().collect(&root, from, &mut refreshes);
        }

        trace!(path = %from, signals = refreshes.len(), "refreshing store signals");
        if refreshes.is_empty() {
            return;
        }
        Runtime::batch(|| {
            for refresh in refreshes {
                refresh.apply();
            }
        });
    }
}

impl fmt::Debug for SetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetStore").finish_non_exhaustive()
    }
}

/// Create a store and its setter.
pub fn create_store(initial: impl Into<StoreValue>) -> (Store, SetStore) {
    let store = Store::new(initial);
    let setter = store.setter();
    (store, setter)
}
