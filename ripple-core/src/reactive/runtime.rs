//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph and decides when each effect runs.
//!
//! # How It Works
//!
//! 1. Creating a signal or effect adds a node to the graph, adopted by the
//!    current owner from the [`ReactiveContext`].
//!
//! 2. Reading a signal inside an effect records an edge in both directions.
//!
//! 3. Writing a signal with a new value notifies its subscribers: each one is
//!    re-run inline, or queued if a batch is open.
//!
//! 4. Re-running an effect first runs its cleanups (newest first), disposes the
//!    children and signals it created last time, and drops all of its edges.
//!    The body then runs with the effect on the context stack, so the reads it
//!    makes this time rebuild the edge set from scratch.
//!
//! # Self-writes
//!
//! An effect that writes a signal it also reads is notified while its own body
//! is on the stack. The runtime never recurses into a running effect. It sets
//! the node's rerun flag and runs the body once more after the current run
//! returns, up to [`RuntimeConfig::max_reruns`] times in a row.
//!
//! # Faults
//!
//! Bodies and cleanups run under `catch_unwind`. A panic leaves the graph
//! consistent: the effect keeps the edges it recorded before panicking and
//! stays re-runnable, and sibling effects notified by the same write still run.
//! Faults are queued and reported when control returns to the outermost
//! runtime entry point, to the fault handler if one is installed and otherwise
//! per [`FaultPolicy`].
//!
//! # Thread Safety
//!
//! None is needed. Every thread has its own runtime, reached through
//! thread-local storage, and all handles are `!Send`. Notification runs
//! synchronously on the writer's stack, so a long chain of effects writing
//! signals read by the next effect nests one body per link; keep such chains
//! in the low thousands or break them with [`batch`](super::batch), which
//! flushes iteratively.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use super::context::ReactiveContext;
use crate::config::{FaultPolicy, RuntimeConfig};
use crate::error::{EffectFault, ReactiveError};
use crate::graph::{
    BatchQueue, Cleanup, EffectBody, EffectId, EffectNode, EffectStatus, Graph, NodeKind,
    RunState, SignalId,
};

type FaultHandler = Rc<dyn Fn(&EffectFault)>;

/// Per-thread runtime state.
#[derive(Default)]
struct RuntimeState {
    graph: RefCell<Graph>,
    batch: RefCell<BatchQueue>,
    faults: RefCell<Vec<EffectFault>>,
    fault_handler: RefCell<Option<FaultHandler>>,
    config: RefCell<RuntimeConfig>,
    entry_depth: Cell<usize>,
}

thread_local! {
    static RUNTIME: RuntimeState = RuntimeState::default();
}

fn with_graph<R>(f: impl FnOnce(&mut Graph) -> R) -> R {
    RUNTIME.with(|rt| f(&mut rt.graph.borrow_mut()))
}

fn with_batch<R>(f: impl FnOnce(&mut BatchQueue) -> R) -> R {
    RUNTIME.with(|rt| f(&mut rt.batch.borrow_mut()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Everything taken out of a node before its body runs again.
struct PendingRun {
    body: EffectBody,
    cleanups: Vec<Cleanup>,
    children: Vec<EffectId>,
    owned_signals: Vec<SignalId>,
    status: Rc<EffectStatus>,
}

/// Decrements the entry depth even if the entry point unwinds.
struct EntryGuard;

impl Drop for EntryGuard {
    fn drop(&mut self) {
        RUNTIME.with(|rt| rt.entry_depth.set(rt.entry_depth.get().saturating_sub(1)));
    }
}

/// Closes a batch even if the batched closure unwinds.
///
/// On unwind the queue is left as is; its effects run at the next flush.
struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        with_batch(BatchQueue::leave);
    }
}

/// The reactive runtime for the current thread.
///
/// This is a namespace for the operations that act on the whole graph rather
/// than on one signal or effect.
pub struct Runtime;

impl Runtime {
    /// Replace this thread's runtime configuration.
    pub fn configure(config: RuntimeConfig) {
        RUNTIME.with(|rt| *rt.config.borrow_mut() = config);
    }

    /// This thread's runtime configuration.
    pub fn config() -> RuntimeConfig {
        RUNTIME.with(|rt| rt.config.borrow().clone())
    }

    /// Route effect faults to `handler` instead of the [`FaultPolicy`].
    ///
    /// The handler is called once per fault, after the outermost runtime call
    /// that caused it has finished.
    pub fn set_fault_handler(handler: impl Fn(&EffectFault) + 'static) {
        RUNTIME.with(|rt| *rt.fault_handler.borrow_mut() = Some(Rc::new(handler)));
    }

    /// Remove the fault handler installed by [`set_fault_handler`](Self::set_fault_handler).
    pub fn clear_fault_handler() {
        RUNTIME.with(|rt| *rt.fault_handler.borrow_mut() = None);
    }

    /// Number of live signals on this thread.
    pub fn signal_count() -> usize {
        with_graph(|graph| graph.signal_count())
    }

    /// Number of live effects, memo computations and roots on this thread.
    pub fn effect_count() -> usize {
        with_graph(|graph| graph.effect_count())
    }

    /// Whether a batch is open.
    pub fn is_batching() -> bool {
        with_batch(|queue| queue.is_batching())
    }

    /// Whether signal reads are being tracked right now.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }

    /// The effect or root that owns whatever is created right now.
    pub fn current_owner() -> Option<EffectId> {
        ReactiveContext::current_owner()
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Run a public operation, reporting faults if it is the outermost one.
    pub(crate) fn entry<R>(f: impl FnOnce() -> R) -> R {
        RUNTIME.with(|rt| rt.entry_depth.set(rt.entry_depth.get() + 1));
        let result = {
            let _guard = EntryGuard;
            f()
        };

        if RUNTIME.with(|rt| rt.entry_depth.get()) == 0 {
            Self::report_faults();
        }
        result
    }

    fn report_faults() {
        let faults = RUNTIME.with(|rt| std::mem::take(&mut *rt.faults.borrow_mut()));
        if faults.is_empty() {
            return;
        }

        let handler = RUNTIME.with(|rt| rt.fault_handler.borrow().clone());
        if let Some(handler) = handler {
            for fault in &faults {
                handler(fault);
            }
            return;
        }

        match Self::config().fault_policy {
            FaultPolicy::Log => {}
            FaultPolicy::Propagate => match faults.as_slice() {
                [fault] => panic!("{fault}"),
                [fault, rest @ ..] => panic!("{fault} (and {} more effect faults)", rest.len()),
                [] => {}
            },
        }
    }

    /// Take the queued faults of `effect` out of the report, returning the
    /// first one.
    pub(crate) fn claim_fault(effect: EffectId) -> Option<EffectFault> {
        RUNTIME.with(|rt| {
            let mut faults = rt.faults.borrow_mut();
            let position = faults.iter().position(|fault| fault.effect == effect)?;
            let claimed = faults.remove(position);
            faults.retain(|fault| fault.effect != effect);
            Some(claimed)
        })
    }

    fn record_fault(effect: EffectId, status: &EffectStatus, payload: Box<dyn Any + Send>) {
        let fault = EffectFault {
            effect,
            message: panic_message(payload.as_ref()),
        };
        error!(effect = %effect, message = %fault.message, "effect panicked");

        status.fault.replace(Some(fault.clone()));
        RUNTIME.with(|rt| rt.faults.borrow_mut().push(fault));
    }

    // ------------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------------

    pub(crate) fn register_signal(owner: Option<EffectId>) -> SignalId {
        with_graph(|graph| graph.add_signal(owner))
    }

    pub(crate) fn dispose_signal(signal: SignalId) {
        if with_graph(|graph| graph.remove_signal(signal)) {
            debug!(signal = %signal, "disposed signal");
        }
    }

    /// Remove an unowned signal whose last handle was dropped.
    ///
    /// Quietly does nothing while the thread's runtime is being torn down.
    pub(crate) fn release_signal(signal: SignalId) {
        let _ = RUNTIME.try_with(|rt| {
            let Ok(mut graph) = rt.graph.try_borrow_mut() else {
                debug!(signal = %signal, "graph busy; unowned signal left in place");
                return;
            };
            if graph.remove_signal(signal) {
                trace!(signal = %signal, "released unowned signal");
            }
        });
    }

    /// Subscribe the current observer, if any, to `signal`.
    pub(crate) fn track(signal: SignalId) {
        let Some(observer) = ReactiveContext::current_observer() else {
            return;
        };
        if with_graph(|graph| graph.add_edge(signal, observer)) {
            trace!(signal = %signal, effect = %observer, "tracked dependency");
        }
    }

    /// Run or queue every subscriber of `signal`.
    pub(crate) fn notify(signal: SignalId) {
        let subscribers = with_graph(|graph| graph.subscribers(signal));
        if subscribers.is_empty() {
            return;
        }

        if Self::is_batching() {
            with_batch(|queue| {
                for effect in subscribers {
                    queue.enqueue(effect);
                }
            });
            return;
        }

        trace!(signal = %signal, count = subscribers.len(), "notifying subscribers");
        for effect in subscribers {
            Self::run_effect(effect);
        }
    }

    pub(crate) fn subscriber_count(signal: SignalId) -> usize {
        with_graph(|graph| {
            graph
                .signals
                .get(signal)
                .map_or(0, |node| node.subscribers.len())
        })
    }

    // ------------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------------

    /// Add an effect node under the current owner and run it once.
    pub(crate) fn create_effect(kind: NodeKind, body: EffectBody) -> (EffectId, Rc<EffectStatus>) {
        let owner = ReactiveContext::current_owner();
        let status = Rc::new(EffectStatus::default());
        let node = EffectNode::new(kind, Some(body), owner, Rc::clone(&status));
        let id = with_graph(|graph| graph.add_effect(node));

        trace!(effect = %id, kind = ?kind, "created effect");
        Self::entry(|| Self::run_effect(id));
        (id, status)
    }

    /// Add a detached root scope.
    pub(crate) fn create_root() -> (EffectId, Rc<EffectStatus>) {
        let status = Rc::new(EffectStatus::default());
        let node = EffectNode::new(NodeKind::Root, None, None, Rc::clone(&status));
        let id = with_graph(|graph| graph.add_effect(node));
        (id, status)
    }

    /// Re-execute an effect, honouring self-write reruns.
    pub(crate) fn run_effect(effect: EffectId) {
        let max_reruns = RUNTIME.with(|rt| rt.config.borrow().max_reruns);
        let mut reruns = 0usize;

        while let Some(run) = Self::begin_run(effect) {
            let PendingRun {
                body,
                cleanups,
                children,
                owned_signals,
                status,
            } = run;

            Self::release(effect, &status, cleanups, children, owned_signals);

            trace!(effect = %effect, "running effect");
            let outcome = {
                let _ctx = ReactiveContext::enter_effect(effect);
                panic::catch_unwind(AssertUnwindSafe(|| body()))
            };

            if !Self::finish_run(effect, &status, outcome) {
                break;
            }
            if reruns >= max_reruns {
                warn!(
                    effect = %effect,
                    reruns,
                    "effect keeps invalidating itself; giving up until its next notification"
                );
                break;
            }
            reruns += 1;
        }
    }

    /// Mark a node running and take its previous-run state out of it.
    ///
    /// Returns `None` if the node is gone, has no body, or is already running
    /// (in which case its rerun flag is set instead).
    fn begin_run(effect: EffectId) -> Option<PendingRun> {
        with_graph(|graph| {
            let node = graph.effects.get_mut(effect)?;
            if node.status.disposed.get() {
                return None;
            }
            if node.is_running() {
                node.rerun = true;
                return None;
            }
            let body = node.body.clone()?;

            node.state = RunState::Running;
            node.rerun = false;
            let run = PendingRun {
                body,
                cleanups: std::mem::take(&mut node.cleanups),
                children: std::mem::take(&mut node.children).into_vec(),
                owned_signals: std::mem::take(&mut node.owned_signals).into_vec(),
                status: Rc::clone(&node.status),
            };

            graph.clear_dependencies(effect);
            Some(run)
        })
    }

    /// Settle a node after its body returned. Returns whether to run again.
    fn finish_run(
        effect: EffectId,
        status: &Rc<EffectStatus>,
        outcome: Result<(), Box<dyn Any + Send>>,
    ) -> bool {
        status.run_count.set(status.run_count.get() + 1);
        let succeeded = match outcome {
            Ok(()) => {
                status.fault.replace(None);
                true
            }
            Err(payload) => {
                Self::record_fault(effect, status, payload);
                false
            }
        };

        let (rerun, disposed) = with_graph(|graph| {
            let Some(node) = graph.effects.get_mut(effect) else {
                return (false, None);
            };
            node.state = RunState::Idle;
            let rerun = std::mem::take(&mut node.rerun);

            if node.status.disposed.get() {
                // Disposed from inside its own body; finish the teardown now.
                return (false, graph.remove_effect(effect));
            }
            (rerun, None)
        });

        if let Some(node) = disposed {
            Self::release(
                effect,
                &node.status,
                node.cleanups,
                node.children.into_vec(),
                node.owned_signals.into_vec(),
            );
        }

        rerun && succeeded
    }

    /// Run cleanups newest first, then dispose children and owned signals.
    fn release(
        effect: EffectId,
        status: &EffectStatus,
        cleanups: Vec<Cleanup>,
        children: Vec<EffectId>,
        owned_signals: Vec<SignalId>,
    ) {
        if !cleanups.is_empty() {
            let _ctx = ReactiveContext::enter_untracked();
            for cleanup in cleanups.into_iter().rev() {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                    Self::record_fault(effect, status, payload);
                }
            }
        }

        for child in children {
            Self::dispose_effect(child);
        }
        for signal in owned_signals {
            Self::dispose_signal(signal);
        }
    }

    /// Dispose an effect or root. Idempotent.
    ///
    /// A running effect is detached from its signals immediately and torn down
    /// when its body returns.
    pub(crate) fn dispose_effect(effect: EffectId) {
        let removed = with_graph(|graph| {
            let node = graph.effects.get_mut(effect)?;
            if node.status.disposed.get() {
                return None;
            }
            if node.is_running() {
                node.status.disposed.set(true);
                graph.clear_dependencies(effect);
                return None;
            }
            graph.remove_effect(effect)
        });

        let Some(node) = removed else {
            return;
        };
        debug!(effect = %effect, kind = ?node.kind, "disposing effect");
        Self::release(
            effect,
            &node.status,
            node.cleanups,
            node.children.into_vec(),
            node.owned_signals.into_vec(),
        );
    }

    pub(crate) fn dependency_count(effect: EffectId) -> usize {
        with_graph(|graph| {
            graph
                .effects
                .get(effect)
                .map_or(0, |node| node.dependencies.len())
        })
    }

    /// Register a cleanup with the current owner.
    pub(crate) fn on_cleanup(cleanup: Cleanup) -> Result<(), ReactiveError> {
        let Some(owner) = ReactiveContext::current_owner() else {
            warn!("on_cleanup called outside of any effect or root");
            return Err(ReactiveError::NoActiveScope {
                operation: "on_cleanup",
            });
        };

        let rejected = with_graph(|graph| match graph.effects.get_mut(owner) {
            Some(node) => {
                node.cleanups.push(cleanup);
                None
            }
            None => Some(cleanup),
        });

        // The owner is already torn down, so the resource is released at once.
        if let Some(cleanup) = rejected {
            let _ctx = ReactiveContext::enter_untracked();
            cleanup();
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Batching
    // ------------------------------------------------------------------------

    pub(crate) fn batch<R>(f: impl FnOnce() -> R) -> R {
        Self::entry(|| {
            with_batch(BatchQueue::enter);
            let _guard = BatchGuard;
            let result = f();
            if with_batch(|queue| queue.is_outermost()) {
                Self::flush();
            }
            result
        })
    }

    /// Drain the batch queue until no effect is dirty.
    ///
    /// Pending memo computations always run before plain effects, so an
    /// effect runs after every memo it reads has settled.
    fn flush() {
        let max_runs = RUNTIME.with(|rt| rt.config.borrow().max_flush_runs);
        let mut runs: HashMap<EffectId, usize> = HashMap::new();

        trace!(count = with_batch(|queue| queue.pending_len()), "flushing batch");
        while let Some(effect) = Self::next_pending() {
            let count = runs.entry(effect).or_default();
            if *count >= max_runs {
                warn!(
                    effect = %effect,
                    runs = *count,
                    "effect keeps being dirtied during the batch flush; dropping it"
                );
                continue;
            }
            *count += 1;
            Self::run_effect(effect);
        }
    }

    fn next_pending() -> Option<EffectId> {
        RUNTIME.with(|rt| {
            let graph = rt.graph.borrow();
            rt.batch.borrow_mut().pop_next(|effect| {
                graph
                    .effects
                    .get(effect)
                    .is_some_and(|node| node.kind == NodeKind::Memo)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_runs_once_on_creation() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);

        let (id, status) = Runtime::create_effect(
            NodeKind::Effect,
            Rc::new(move || counter.set(counter.get() + 1)),
        );

        assert_eq!(runs.get(), 1);
        assert_eq!(status.run_count.get(), 1);
        Runtime::dispose_effect(id);
    }

    #[test]
    fn running_effect_is_not_reentered() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let me: Rc<Cell<Option<EffectId>>> = Rc::default();
        let me_in_body = Rc::clone(&me);

        let (id, _) = Runtime::create_effect(
            NodeKind::Effect,
            Rc::new(move || {
                counter.set(counter.get() + 1);
                if counter.get() == 2 {
                    if let Some(id) = me_in_body.get() {
                        // Re-entry sets the rerun flag instead of recursing.
                        Runtime::run_effect(id);
                    }
                }
            }),
        );
        me.set(Some(id));

        Runtime::run_effect(id);
        assert_eq!(runs.get(), 3);
        Runtime::dispose_effect(id);
    }

    #[test]
    fn dispose_is_idempotent() {
        let cleanups = Rc::new(Cell::new(0));
        let counter = Rc::clone(&cleanups);

        let (id, status) = Runtime::create_effect(
            NodeKind::Effect,
            Rc::new(move || {
                let counter = Rc::clone(&counter);
                Runtime::on_cleanup(Box::new(move || counter.set(counter.get() + 1))).unwrap();
            }),
        );

        Runtime::dispose_effect(id);
        Runtime::dispose_effect(id);

        assert_eq!(cleanups.get(), 1);
        assert!(status.disposed.get());
    }

    #[test]
    fn on_cleanup_without_scope_is_an_error() {
        let result = Runtime::on_cleanup(Box::new(|| {}));
        assert_eq!(
            result,
            Err(ReactiveError::NoActiveScope {
                operation: "on_cleanup"
            })
        );
    }

    #[test]
    fn fault_is_recorded_and_handled() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        Runtime::set_fault_handler(move |fault| sink.borrow_mut().push(fault.message.clone()));

        let (id, status) = Runtime::create_effect(NodeKind::Effect, Rc::new(|| panic!("boom")));

        Runtime::clear_fault_handler();
        assert_eq!(seen.borrow().as_slice(), &["boom".to_string()]);
        assert_eq!(status.fault.borrow().as_ref().map(|f| f.effect), Some(id));
        assert!(!status.disposed.get());
        Runtime::dispose_effect(id);
    }

    #[test]
    fn panic_message_handles_payload_types() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
