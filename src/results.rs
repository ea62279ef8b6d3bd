//! The result store: publication order plus the dedup index.
//!
//! One mutex guards both substructures; one condition variable wakes the
//! consumer. A rule appears in `ordered` iff it appears in exactly one
//! bucket of `by_parent_hash`. Buckets hold sets of published rules sharing
//! a content hash, so a later structural duplicate is always caught.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::sync::Arc;

use crate::rule::Rule;

/// Read-only view of the dedup index, handed out under the store lock.
pub struct ParentIndex<'a> {
    by_parent_hash: &'a HashMap<u64, Vec<Arc<Rule>>>,
}

impl ParentIndex<'_> {
    /// All published rules with the given content hash.
    pub fn bucket(&self, hash: u64) -> &[Arc<Rule>] {
        self.by_parent_hash
            .get(&hash)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

struct StoreState {
    ordered: Vec<Arc<Rule>>,
    by_parent_hash: HashMap<u64, Vec<Arc<Rule>>>,
    done: bool,
}

/// Outcome of a consumer wait: the freshly published rules past the
/// consumer's cursor, and whether mining has finished.
pub struct Drained {
    pub rules: Vec<Arc<Rule>>,
    pub done: bool,
}

/// Ordered, append-only store of published rules with a secondary index
/// keyed by `alternative_parent_hash`.
pub struct ResultStore {
    state: Mutex<StoreState>,
    new_rules: Condvar,
}

impl ResultStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                ordered: Vec::new(),
                by_parent_hash: HashMap::new(),
                done: false,
            }),
            new_rules: Condvar::new(),
        }
    }

    /// Run `f` with the dedup index under the store lock.
    ///
    /// Used by workers to attach published ancestors to a candidate before
    /// its exact confidences are computed.
    pub fn with_index<R>(&self, f: impl FnOnce(&ParentIndex<'_>) -> R) -> R {
        let state = self.state.lock().expect("result store lock poisoned");
        f(&ParentIndex {
            by_parent_hash: &state.by_parent_hash,
        })
    }

    /// Publish a rule: append to the ordered list, register it in its
    /// bucket, and signal the consumer.
    ///
    /// A structurally equal rule already present in the bucket means the
    /// search produced the identical rule twice without the queue catching
    /// it, which is a programming error, so this aborts.
    pub fn publish(&self, rule: Arc<Rule>) {
        let mut state = self.state.lock().expect("result store lock poisoned");
        let bucket = state
            .by_parent_hash
            .entry(rule.alternative_parent_hash())
            .or_default();
        assert!(
            !bucket.iter().any(|existing| existing.same_pattern(&rule)),
            "rule published twice: {rule}"
        );
        bucket.push(Arc::clone(&rule));
        state.ordered.push(rule);
        self.new_rules.notify_all();
    }

    /// Block until a rule past `last_consumed` exists or mining is done,
    /// then return everything new.
    ///
    /// `last_consumed` is the count of rules the consumer has already
    /// written (i.e. index of the next expected rule).
    pub fn wait_new(&self, last_consumed: usize) -> Drained {
        let mut state = self.state.lock().expect("result store lock poisoned");
        while state.ordered.len() == last_consumed && !state.done {
            state = self
                .new_rules
                .wait(state)
                .expect("result store lock poisoned");
        }
        Drained {
            rules: state.ordered[last_consumed..].to_vec(),
            done: state.done,
        }
    }

    /// Mark mining finished and wake the consumer for its final drain.
    pub fn terminate(&self) {
        let mut state = self.state.lock().expect("result store lock poisoned");
        state.done = true;
        self.new_rules.notify_all();
    }

    /// Number of published rules.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("result store lock poisoned")
            .ordered
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The published rules in publication order.
    pub fn ordered(&self) -> Vec<Arc<Rule>> {
        self.state
            .lock()
            .expect("result store lock poisoned")
            .ordered
            .clone()
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("published", &self.len())
            .finish()
    }
}
