//! Graph Nodes
//!
//! This module defines the node records that live in the dependency graph.
//! A node holds only graph bookkeeping; the values themselves stay in the
//! [`Signal`](crate::reactive::Signal) handles.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::arena::arena_key;
use crate::error::EffectFault;

arena_key!(
    /// Handle to a signal node in the dependency graph.
    SignalId,
    "s"
);

arena_key!(
    /// Handle to an effect, memo computation, or root scope.
    EffectId,
    "e"
);

/// The body of an effect.
pub type EffectBody = Rc<dyn Fn()>;

/// A deferred teardown callback.
pub type Cleanup = Box<dyn FnOnce()>;

/// What kind of owner an effect node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A user effect. Runs its body for side effects.
    Effect,

    /// The computation behind a memo. Writes the memo's signal. Batch flushes
    /// run these ahead of plain effects so readers see fresh derived values.
    Memo,

    /// A scope that owns children but has no body and never tracks reads.
    Root,
}

/// Whether an effect body is on the stack right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not running.
    Idle,

    /// Its body is executing. Notifications arriving now set the rerun flag
    /// instead of recursing.
    Running,
}

/// Status shared between an effect node and its handles.
///
/// Kept outside the arena so handles can still answer questions after the
/// node has been removed.
#[derive(Debug, Default)]
pub struct EffectStatus {
    /// Completed body executions.
    pub run_count: Cell<usize>,

    /// The most recent fault, cleared by the next successful run.
    pub fault: RefCell<Option<EffectFault>>,

    /// Set once the effect has been disposed. Terminal.
    pub disposed: Cell<bool>,
}

/// A signal's graph record.
#[derive(Debug, Default)]
pub struct SignalNode {
    /// Effects that read this signal during their latest run, in the order
    /// they subscribed.
    pub subscribers: IndexSet<EffectId>,

    /// The scope that disposes this signal when it is torn down.
    pub owner: Option<EffectId>,
}

impl SignalNode {
    /// Create a signal record owned by `owner`.
    pub fn new(owner: Option<EffectId>) -> Self {
        Self {
            subscribers: IndexSet::new(),
            owner,
        }
    }
}

/// An effect's graph record.
pub struct EffectNode {
    pub kind: NodeKind,

    /// `None` for roots.
    pub body: Option<EffectBody>,

    /// Signals read during the latest run.
    pub dependencies: IndexSet<SignalId>,

    /// Teardown callbacks in registration order.
    pub cleanups: Vec<Cleanup>,

    /// Effects created while this one was the owner.
    pub children: SmallVec<[EffectId; 4]>,

    /// Signals created while this one was the owner.
    pub owned_signals: SmallVec<[SignalId; 4]>,

    pub owner: Option<EffectId>,
    pub state: RunState,

    /// A dependency changed while the body was running; run again after it
    /// returns.
    pub rerun: bool,

    pub status: Rc<EffectStatus>,
}

impl EffectNode {
    /// Create an idle node.
    pub fn new(
        kind: NodeKind,
        body: Option<EffectBody>,
        owner: Option<EffectId>,
        status: Rc<EffectStatus>,
    ) -> Self {
        Self {
            kind,
            body,
            dependencies: IndexSet::new(),
            cleanups: Vec::new(),
            children: SmallVec::new(),
            owned_signals: SmallVec::new(),
            owner,
            state: RunState::Idle,
            rerun: false,
            status,
        }
    }

    /// Whether the node's body is currently executing.
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}

impl std::fmt::Debug for EffectNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectNode")
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .field("children", &self.children)
            .field("owned_signals", &self.owned_signals)
            .field("cleanups", &self.cleanups.len())
            .field("owner", &self.owner)
            .field("state", &self.state)
            .field("rerun", &self.rerun)
            .finish()
    }
}
