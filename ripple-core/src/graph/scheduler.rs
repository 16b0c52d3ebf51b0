//! Batch Scheduler
//!
//! While a batch is open, signal writes do not run their subscribers. The
//! subscribers are queued here instead and run when the outermost batch
//! closes.
//!
//! # Algorithm
//!
//! 1. `enter` increments the nesting depth.
//! 2. Every notification inside the batch calls `enqueue`. An effect queued
//!    several times is kept once, at its first position.
//! 3. When the outermost batch closes, the runtime drains the queue one effect
//!    at a time. `pop_next` hands out the oldest queued memo computation if
//!    there is one, and the oldest plain effect otherwise. The depth stays
//!    above zero during the flush, so writes made by flushed effects land in
//!    the same queue, where an effect still waiting for its turn is not queued
//!    twice. Memos settle before any reader runs, so a reader of both a signal
//!    and a memo derived from it runs once and sees the settled value.
//! 4. `leave` decrements the depth.

use indexmap::IndexSet;

use super::node::EffectId;

/// Pending effects for the currently open batch.
#[derive(Debug, Default)]
pub struct BatchQueue {
    /// Nesting depth of open batches.
    depth: usize,

    /// Effects dirtied inside the batch, in first-notified order.
    pending: IndexSet<EffectId>,
}

impl BatchQueue {
    /// Open a (possibly nested) batch.
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Close the innermost batch.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Whether any batch is open.
    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    /// Whether exactly one batch is open, i.e. closing it should flush.
    pub fn is_outermost(&self) -> bool {
        self.depth == 1
    }

    /// Queue an effect. Returns `false` if it was already queued.
    pub fn enqueue(&mut self, effect: EffectId) -> bool {
        self.pending.insert(effect)
    }

    /// Remove the next effect to run: the first one `prefer` accepts, else
    /// the first one queued.
    pub fn pop_next(&mut self, mut prefer: impl FnMut(EffectId) -> bool) -> Option<EffectId> {
        let index = self
            .pending
            .iter()
            .position(|effect| prefer(*effect))
            .unwrap_or(0);
        self.pending.shift_remove_index(index)
    }

    /// Number of queued effects.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
