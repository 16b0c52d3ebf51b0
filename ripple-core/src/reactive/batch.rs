//! Batching
//!
//! Inside [`batch`], writes update values immediately but subscribers are
//! queued instead of run. When the outermost batch returns, the queue drains:
//! pending memo computations first, then the remaining effects in the order
//! they were first queued. Writes made while draining join the same queue, so
//! an effect runs once per batch unless it is dirtied again after its run.

use super::runtime::Runtime;

/// Run `f`, deferring every notification it triggers until it returns.
///
/// Batches nest; only the outermost one flushes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    Runtime::batch(f)
}
