//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, effects, memos,
//! stores and batching. These primitives form the foundation of Ripple's
//! fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. Effects are used to synchronize reactive state with external systems,
//! such as patching a rendered node or logging. An effect owns the effects and
//! signals created while it runs and tears them down before its next run.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes, and its readers re-run only when the
//! result actually differs.
//!
//! ## Stores
//!
//! A Store is a nested value tree with one signal per selected path, so that a
//! write to one leaf re-runs only the effects that read that leaf.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod batch;
mod context;
mod effect;
mod memo;
mod runtime;
mod scope;
mod signal;
mod store;

pub use batch::batch;
pub use context::ReactiveContext;
pub use effect::{create_effect, Effect};
pub use memo::{create_memo, Memo};
pub use runtime::Runtime;
pub use scope::{create_root, on_cleanup, untrack, Root};
pub use signal::{create_signal, ReadSignal, Signal};
pub use store::{create_store, Path, PathSegment, SetStore, Store, StoreMap, StoreValue};
