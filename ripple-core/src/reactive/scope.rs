//! Owner scopes: roots, cleanups and untracked reads.
//!
//! Every effect is an owner for what it creates while it runs. A [`Root`] is
//! an owner that never runs a body of its own; it exists so that a host can
//! group effects, memos and stores under one handle and tear them down
//! together.

use std::rc::Rc;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use crate::error::ReactiveError;
use crate::graph::{EffectId, EffectStatus};

/// Register `f` to run when the current owner re-runs or is disposed.
///
/// Cleanups of one owner run newest first, before the owner's next run.
///
/// # Errors
///
/// Returns [`ReactiveError::NoActiveScope`] when called outside any effect,
/// memo or root.
pub fn on_cleanup(f: impl FnOnce() + 'static) -> Result<(), ReactiveError> {
    Runtime::on_cleanup(Box::new(f))
}

/// Run `f` without subscribing the current effect to anything it reads.
///
/// Effects and signals created inside `f` are still owned by the current
/// owner.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

/// A detached owner scope.
///
/// Created by [`create_root`]. Disposing the root disposes every effect,
/// memo, signal and store created inside it and runs its cleanups.
#[derive(Clone)]
pub struct Root {
    id: EffectId,
    status: Rc<EffectStatus>,
}

impl Root {
    /// Get the root's graph key.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Tear down everything owned by this root. Idempotent.
    pub fn dispose(&self) {
        Runtime::entry(|| Runtime::dispose_effect(self.id));
    }

    /// Check if the root has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.status.disposed.get()
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `f` inside a new root scope and return its result.
///
/// The root has no parent, even when created inside an effect: it lives
/// until [`Root::dispose`] is called. Reads inside `f` are not tracked.
pub fn create_root<R>(f: impl FnOnce(Root) -> R) -> R {
    let (id, status) = Runtime::create_root();
    let root = Root { id, status };

    Runtime::entry(|| {
        let _ctx = ReactiveContext::enter_owner(id);
        f(root)
    })
}
