//! Path trie of selected signals.
//!
//! Only selected paths have nodes. A write at some path refreshes the
//! signals on the way down to it and everything selected beneath it; sibling
//! branches are never visited.

use indexmap::IndexMap;

use super::path::{Path, PathSegment};
use super::value::StoreValue;
use crate::reactive::Signal;

#[derive(Default)]
pub(crate) struct PathTrie {
    pub value: Option<Signal<StoreValue>>,
    pub len: Option<Signal<usize>>,
    pub children: IndexMap<PathSegment, PathTrie>,
}

/// A pending write to one store signal.
pub(crate) enum Refresh {
    Value(Signal<StoreValue>, StoreValue),
    Len(Signal<usize>, usize),
}

impl Refresh {
    pub fn apply(self) {
        match self {
            Refresh::Value(signal, value) => signal.set(value),
            Refresh::Len(signal, len) => signal.set(len),
        }
    }
}

impl PathTrie {
    /// The node for `path`, created along with any missing parents.
    pub fn entry(&mut self, path: &Path) -> &mut PathTrie {
        path.segments().iter().fold(self, |node, segment| {
            node.children.entry(segment.clone()).or_default()
        })
    }

    /// Collect refreshes for every signal a write at `written` may affect,
    /// reading new values from `root`.
    ///
    /// Missing values refresh to `Null` and missing lengths to 0.
    pub fn collect(&self, root: &StoreValue, written: &Path, out: &mut Vec<Refresh>) {
        let mut node = self;
        let mut value = Some(root);

        for segment in written.segments() {
            node.collect_own(value, out);
            let Some(child) = node.children.get(segment) else {
                return;
            };
            node = child;
            value = value.and_then(|value| value.child(segment));
        }
        node.collect_subtree(value, out);
    }

    fn collect_own(&self, value: Option<&StoreValue>, out: &mut Vec<Refresh>) {
        if let Some(signal) = &self.value {
            out.push(Refresh::Value(
                signal.clone(),
                value.cloned().unwrap_or_default(),
            ));
        }
        if let Some(signal) = &self.len {
            out.push(Refresh::Len(
                signal.clone(),
                value.and_then(StoreValue::len).unwrap_or(0),
            ));
        }
    }

    fn collect_subtree(&self, value: Option<&StoreValue>, out: &mut Vec<Refresh>) {
        self.collect_own(value, out);
        for (segment, child) in &self.children {
            child.collect_subtree(value.and_then(|value| value.child(segment)), out);
        }
    }

    /// Number of selected signals in this subtree.
    pub fn signal_count(&self) -> usize {
        usize::from(self.value.is_some())
            + usize::from(self.len.is_some())
            + self
                .children
                .values()
                .map(PathTrie::signal_count)
                .sum::<usize>()
    }
}
