//! Dependency Graph
//!
//! This module stores the bipartite graph between signals and the effects
//! that read them.
//!
//! # Overview
//!
//! - Signal nodes record their subscribers (effects that read them during
//!   their latest run).
//! - Effect nodes record their dependencies (the mirror image of the above),
//!   plus the ownership tree: child effects, owned signals and cleanups.
//!
//! Both directions are maintained together so that re-running or disposing an
//! effect can detach it from exactly the signals it touched, without scanning
//! the graph.
//!
//! # Design Decisions
//!
//! 1. Nodes live in generational arenas and are addressed by `Copy` keys.
//!    Disposal is an O(1) tombstone; stale keys resolve to nothing.
//!
//! 2. Subscriber and dependency sets are insertion-ordered, so notification
//!    order follows subscription order and test runs are reproducible.
//!
//! 3. The graph never calls user code. Callers take what they need out of a
//!    node, release the graph, and only then run bodies or cleanups.

pub(crate) mod arena;
mod node;
mod scheduler;

pub use node::{EffectId, SignalId};
pub(crate) use node::{
    Cleanup, EffectBody, EffectNode, EffectStatus, NodeKind, RunState, SignalNode,
};
pub(crate) use scheduler::BatchQueue;

use arena::Arena;
use smallvec::SmallVec;

/// The signal/effect graph for one thread.
#[derive(Default)]
pub(crate) struct Graph {
    pub signals: Arena<SignalId, SignalNode>,
    pub effects: Arena<EffectId, EffectNode>,
}

impl Graph {
    /// Add a signal node, adopted by `owner` if that owner is still live.
    pub fn add_signal(&mut self, owner: Option<EffectId>) -> SignalId {
        let owner = owner.filter(|id| self.effects.contains(*id));
        let id = self.signals.insert(SignalNode::new(owner));
        if let Some(node) = owner.and_then(|owner| self.effects.get_mut(owner)) {
            node.owned_signals.push(id);
        }
        id
    }

    /// Add an effect node, adopted by its owner if that owner is still live.
    pub fn add_effect(&mut self, mut node: EffectNode) -> EffectId {
        node.owner = node.owner.filter(|id| self.effects.contains(*id));
        let owner = node.owner;
        let id = self.effects.insert(node);
        if let Some(parent) = owner.and_then(|owner| self.effects.get_mut(owner)) {
            parent.children.push(id);
        }
        id
    }

    /// Record that `effect` read `signal`.
    ///
    /// Returns `false` if either node is gone or the effect has been disposed.
    pub fn add_edge(&mut self, signal: SignalId, effect: EffectId) -> bool {
        let Some(effect_node) = self.effects.get_mut(effect) else {
            return false;
        };
        if effect_node.status.disposed.get() {
            return false;
        }
        let Some(signal_node) = self.signals.get_mut(signal) else {
            return false;
        };

        effect_node.dependencies.insert(signal);
        signal_node.subscribers.insert(effect);
        true
    }

    /// Unsubscribe `effect` from every signal it currently depends on.
    pub fn clear_dependencies(&mut self, effect: EffectId) {
        let Some(node) = self.effects.get_mut(effect) else {
            return;
        };
        let dependencies = std::mem::take(&mut node.dependencies);
        for signal in dependencies {
            if let Some(signal_node) = self.signals.get_mut(signal) {
                signal_node.subscribers.shift_remove(&effect);
            }
        }
    }

    /// Snapshot a signal's subscribers in notification order.
    pub fn subscribers(&self, signal: SignalId) -> SmallVec<[EffectId; 8]> {
        self.signals
            .get(signal)
            .map(|node| node.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove a signal node and every edge pointing at it.
    pub fn remove_signal(&mut self, id: SignalId) -> bool {
        let Some(node) = self.signals.remove(id) else {
            return false;
        };

        for effect in node.subscribers {
            if let Some(effect_node) = self.effects.get_mut(effect) {
                effect_node.dependencies.shift_remove(&id);
            }
        }
        if let Some(owner) = node.owner.and_then(|owner| self.effects.get_mut(owner)) {
            owner.owned_signals.retain(|signal| *signal != id);
        }
        true
    }

    /// Remove an effect node, detaching it from its signals and its owner.
    ///
    /// The node is returned so the caller can run its cleanups and dispose its
    /// children and signals outside the graph borrow.
    pub fn remove_effect(&mut self, id: EffectId) -> Option<EffectNode> {
        self.clear_dependencies(id);
        let node = self.effects.remove(id)?;
        node.status.disposed.set(true);

        if let Some(owner) = node.owner.and_then(|owner| self.effects.get_mut(owner)) {
            owner.children.retain(|child| *child != id);
        }
        Some(node)
    }

    /// Number of live signal nodes.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of live effect, memo and root nodes.
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }
}
