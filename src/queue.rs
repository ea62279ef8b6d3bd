//! The shared candidate queue.
//!
//! Workers are both producers and consumers, so "join when empty" does not
//! exist: termination is detected with two counters. `active_workers` starts
//! at the pool size; a worker that finds the queue empty parks in
//! `waiting_workers`. When every active worker is waiting and the queue is
//! empty, no further work can ever arrive: the queue broadcasts shutdown
//! and every `dequeue` returns the terminated sentinel from then on.
//!
//! Candidates pattern-equivalent to one already seen are dropped at enqueue
//! time; distinct refinement paths reach the same rule, and evaluating it
//! twice would trip the publication-time duplicate check.

use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};

use crate::rule::{same_pattern_atoms, Atom, Rule};

/// Queue counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub total_enqueued: usize,
    pub total_dequeued: usize,
    pub duplicates_dropped: usize,
    pub peak_len: usize,
}

struct QueueState {
    items: VecDeque<Rule>,
    active_workers: usize,
    waiting_workers: usize,
    terminated: bool,
    /// Atom lists of every rule ever enqueued, bucketed by content hash.
    seen: HashMap<u64, Vec<Vec<Atom>>>,
    stats: QueueStats,
}

/// Multi-producer/multi-consumer rule queue with quiescence detection.
pub struct RuleQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
}

impl RuleQueue {
    /// Create a queue holding the seed frontier, accounting for a pool of
    /// `n_workers` threads.
    pub fn new(seeds: Vec<Rule>, n_workers: usize) -> Self {
        let queue = Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                active_workers: n_workers,
                waiting_workers: 0,
                terminated: false,
                seen: HashMap::new(),
                stats: QueueStats::default(),
            }),
            not_empty: Condvar::new(),
        };
        queue.enqueue_all(seeds);
        queue
    }

    /// Append a batch of candidates and wake waiting workers.
    ///
    /// Candidates equivalent to an already-seen rule are dropped. Enqueueing
    /// after quiescence is a programming error and aborts.
    pub fn enqueue_all(&self, rules: Vec<Rule>) {
        if rules.is_empty() {
            return;
        }
        let mut state = self.state.lock().expect("queue lock poisoned");
        assert!(
            !state.terminated,
            "rule enqueued after quiescence: the refinement search is unsound"
        );
        for rule in rules {
            let hash = rule.alternative_parent_hash();
            let bucket = state.seen.entry(hash).or_default();
            if bucket
                .iter()
                .any(|atoms| same_pattern_atoms(atoms, rule.atoms()))
            {
                state.stats.duplicates_dropped += 1;
                continue;
            }
            bucket.push(rule.atoms().to_vec());
            state.items.push_back(rule);
            state.stats.total_enqueued += 1;
        }
        state.stats.peak_len = state.stats.peak_len.max(state.items.len());
        self.not_empty.notify_all();
    }

    /// Take the next candidate, blocking while the queue is empty but some
    /// worker is still active. Returns `None` once quiescence is proven:
    /// the queue is empty and every worker is waiting on it.
    pub fn dequeue(&self) -> Option<Rule> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        loop {
            if state.terminated {
                return None;
            }
            if let Some(rule) = state.items.pop_front() {
                state.stats.total_dequeued += 1;
                return Some(rule);
            }
            state.waiting_workers += 1;
            if state.waiting_workers == state.active_workers {
                // Quiescence: nobody is working, nobody can produce.
                state.terminated = true;
                state.waiting_workers -= 1;
                self.not_empty.notify_all();
                tracing::debug!("queue reached quiescence");
                return None;
            }
            state = self.not_empty.wait(state).expect("queue lock poisoned");
            state.waiting_workers -= 1;
        }
    }

    /// Called by a worker that observed the terminated sentinel, so the
    /// liveness accounting reflects its exit.
    pub fn decrement_active_workers(&self) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.active_workers -= 1;
    }

    /// Diagnostics snapshot.
    pub fn stats(&self) -> QueueStats {
        self.state.lock().expect("queue lock poisoned").stats
    }
}

impl std::fmt::Debug for RuleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("queue lock poisoned");
        f.debug_struct("RuleQueue")
            .field("len", &state.items.len())
            .field("active_workers", &state.active_workers)
            .field("waiting_workers", &state.waiting_workers)
            .field("terminated", &state.terminated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{ConstId, VarId};
    use std::sync::Arc;
    use std::time::Duration;

    fn seed(relation: u32, size: usize) -> Rule {
        Rule::seed(
            Atom::new(VarId(0), ConstId::new(relation).unwrap(), VarId(1)),
            size,
            VarId(0),
        )
    }

    #[test]
    fn fifo_order() {
        let queue = RuleQueue::new(vec![seed(1, 10), seed(2, 20)], 1);
        assert_eq!(queue.dequeue().unwrap().head_cardinality, 10);
        assert_eq!(queue.dequeue().unwrap().head_cardinality, 20);
    }

    #[test]
    fn empty_queue_single_worker_terminates() {
        let queue = RuleQueue::new(Vec::new(), 1);
        assert!(queue.dequeue().is_none());
        queue.decrement_active_workers();
    }

    #[test]
    fn duplicate_seeds_are_dropped() {
        let queue = RuleQueue::new(vec![seed(1, 10), seed(1, 10)], 1);
        assert!(queue.dequeue().is_some());
        assert!(queue.dequeue().is_none());
        assert_eq!(queue.stats().duplicates_dropped, 1);
    }

    #[test]
    fn stats_track_peak_and_counts() {
        let queue = RuleQueue::new(vec![seed(1, 10), seed(2, 20), seed(3, 30)], 1);
        queue.dequeue().unwrap();
        let stats = queue.stats();
        assert_eq!(stats.total_enqueued, 3);
        assert_eq!(stats.total_dequeued, 1);
        assert_eq!(stats.peak_len, 3);
    }

    #[test]
    #[should_panic(expected = "after quiescence")]
    fn enqueue_after_quiescence_aborts() {
        let queue = RuleQueue::new(Vec::new(), 1);
        assert!(queue.dequeue().is_none());
        queue.enqueue_all(vec![seed(1, 10)]);
    }

    #[test]
    fn two_workers_both_observe_termination() {
        let queue = Arc::new(RuleQueue::new(vec![seed(1, 10)], 2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                let mut dequeued = 0;
                while queue.dequeue().is_some() {
                    dequeued += 1;
                }
                queue.decrement_active_workers();
                dequeued
            }));
        }
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn producer_worker_feeds_waiting_worker() {
        // One worker dequeues the seed, sleeps, then enqueues a child while
        // the other worker is already blocked on the empty queue.
        let queue = Arc::new(RuleQueue::new(vec![seed(1, 10)], 2));

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let first = queue.dequeue().expect("seed present");
                std::thread::sleep(Duration::from_millis(50));
                queue.enqueue_all(vec![seed(2, first.head_cardinality * 2)]);
                while queue.dequeue().is_some() {}
                queue.decrement_active_workers();
            })
        };
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(rule) = queue.dequeue() {
                    got.push(rule.head_cardinality);
                }
                queue.decrement_active_workers();
                got
            })
        };

        producer.join().unwrap();
        let got = consumer.join().unwrap();
        let stats = queue.stats();
        assert_eq!(stats.total_dequeued, 2);
        assert!(got.len() <= 1); // either worker may win the child
    }
}
