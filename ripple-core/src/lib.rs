//! Ripple Core
//!
//! This crate provides a fine-grained reactive runtime. It implements:
//!
//! - Reactive primitives (signals, effects, memos)
//! - Path-scoped stores over nested, structurally shared values
//! - Batched notification
//! - Owner scopes with cascading cleanup
//!
//! Only the computations that read a changed value re-run. There is no
//! render pass and no diffing; a renderer performs targeted updates inside
//! effect bodies and the runtime decides when those bodies run.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `graph`: The signal/effect dependency graph (crate-private)
//! - `error`: Usage errors and effect faults
//! - `config`: Per-thread runtime limits and fault policy
//!
//! Every thread drives its own isolated graph. Handles are `!Send`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::reactive::{Signal, Memo, Effect};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     Memo::new(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! Effect::new(move || {
//!     println!("Doubled: {}", doubled.get());
//! });
//!
//! // Update the signal
//! count.set(5);
//! // Effect automatically runs, prints: "Doubled: 10"
//! ```

pub mod config;
pub mod error;
mod graph;
pub mod reactive;

pub use config::{FaultPolicy, RuntimeConfig};
pub use error::{EffectFault, ReactiveError, StoreError};
pub use graph::{EffectId, SignalId};
pub use reactive::{
    batch, create_effect, create_memo, create_root, create_signal, create_store, on_cleanup,
    untrack, Effect, Memo, Path, PathSegment, ReadSignal, Root, Runtime, SetStore, Signal, Store,
    StoreValue,
};
