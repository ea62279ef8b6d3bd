//! The mining driver: seed, spawn, loop, quiesce.
//!
//! `mine()` seeds the queue, starts the worker pool and (when streaming)
//! the consumer, and joins everything once the queue proves quiescence.
//! Workers never touch the KB; every evaluation goes through the assistant.

use std::sync::Arc;
use std::time::Instant;

use crate::assistant::{MiningAssistant, DANGLING};
use crate::config::{MinerConfig, PruningMetric};
use crate::consumer::{self, RuleSink};
use crate::error::MineResult;
use crate::queue::RuleQueue;
use crate::results::ResultStore;
use crate::rule::Rule;
use crate::term::ConstId;

/// The rule mining engine.
pub struct Miner {
    assistant: Arc<dyn MiningAssistant>,
    config: MinerConfig,
    seeds: Option<Vec<ConstId>>,
    sink: Option<RuleSink>,
}

impl Miner {
    /// Create a miner writing to stdout. Validates the configuration.
    pub fn new(assistant: Arc<dyn MiningAssistant>, config: MinerConfig) -> MineResult<Self> {
        config.validate()?;
        Ok(Self {
            assistant,
            config,
            seeds: None,
            sink: Some(Box::new(std::io::stdout())),
        })
    }

    /// Restrict mining to the given head relations.
    pub fn with_seeds(mut self, seeds: Vec<ConstId>) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Replace the rule sink.
    pub fn with_sink(mut self, sink: RuleSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run the mining loop to quiescence; returns the published rules in
    /// publication order.
    pub fn mine(&mut self) -> MineResult<Vec<Arc<Rule>>> {
        let started = Instant::now();
        let n_threads = self
            .config
            .n_threads
            .min(crate::config::default_threads())
            .max(1);

        let seed_rules = match self.seeds.as_deref() {
            Some(seeds) if !seeds.is_empty() => self
                .assistant
                .initial_atoms_from_seeds(seeds, self.config.min_initial_support),
            _ => self.assistant.initial_atoms(self.config.min_initial_support),
        };
        tracing::info!(
            seeds = seed_rules.len(),
            threads = n_threads,
            metric = ?self.config.pruning_metric,
            threshold = self.config.min_significance,
            "starting mining"
        );

        let queue = Arc::new(RuleQueue::new(seed_rules, n_threads));
        let store = Arc::new(ResultStore::new());

        let consumer = if self.config.real_time {
            let sink = self
                .sink
                .take()
                .expect("rule sink was lost by a failed consumer");
            Some(consumer::spawn(
                Arc::clone(&self.assistant),
                Arc::clone(&store),
                sink,
            ))
        } else {
            None
        };

        let mut workers = Vec::with_capacity(n_threads);
        for i in 0..n_threads {
            let assistant = Arc::clone(&self.assistant);
            let queue = Arc::clone(&queue);
            let store = Arc::clone(&store);
            let config = self.config.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("miner-{i}"))
                    .spawn(move || worker_loop(&assistant, &queue, &store, &config))
                    .expect("failed to spawn worker thread"),
            );
        }
        for worker in workers {
            worker.join().expect("worker thread panicked");
        }

        if let Some(handle) = consumer {
            store.terminate();
            let sink = handle.join().expect("consumer thread panicked")?;
            self.sink = Some(sink);
        }

        if self.assistant.verbose() {
            let stats = queue.stats();
            tracing::info!(
                enqueued = stats.total_enqueued,
                dequeued = stats.total_dequeued,
                duplicates = stats.duplicates_dropped,
                peak = stats.peak_len,
                "queue statistics"
            );
        }

        let rules = store.ordered();
        tracing::info!(
            rules = rules.len(),
            elapsed = ?started.elapsed(),
            "mining finished"
        );
        Ok(rules)
    }

    /// Write the header and every rule to the sink, for runs with
    /// `real_time` disabled.
    pub fn emit(&mut self, rules: &[Arc<Rule>]) -> MineResult<()> {
        use crate::error::SinkError;
        use std::io::Write;

        let assistant = Arc::clone(&self.assistant);
        let sink = self
            .sink
            .as_mut()
            .expect("rule sink was lost by a failed consumer");
        sink.write_all(assistant.header().as_bytes())
            .map_err(SinkError::from)?;
        for rule in rules {
            writeln!(sink, "{}", assistant.format(rule)).map_err(SinkError::from)?;
        }
        sink.flush().map_err(SinkError::from)?;
        Ok(())
    }
}

/// The per-worker loop: dequeue, decide output, refine, publish.
fn worker_loop(
    assistant: &Arc<dyn MiningAssistant>,
    queue: &RuleQueue,
    store: &ResultStore,
    config: &MinerConfig,
) {
    loop {
        let Some(mut rule) = queue.dequeue() else {
            queue.decrement_active_workers();
            return;
        };

        // Output decision: shape first, then bounds, then exact metrics
        // with the published ancestors attached for the skyline test.
        let mut output = false;
        if assistant.should_output(&rule) {
            if assistant.compute_confidence_bounds(&mut rule) {
                store.with_index(|index| assistant.set_additional_parents(&mut rule, index));
                assistant.compute_confidence_metrics(&mut rule);
                output = assistant.test_confidence_thresholds(&rule);
            }
        }

        // Refinement decision.
        let refine = !rule.is_final
            && !(assistant.perfect_rules_enabled() && rule.is_perfect)
            && rule.real_length < assistant.max_depth();

        let rule = Arc::new(rule);

        if refine {
            let threshold = count_threshold(config, assistant.as_ref(), &rule);
            match assistant.apply_operators(&rule, threshold) {
                Ok(children) => {
                    for (operator, batch) in children {
                        if operator == DANGLING {
                            // Reserve the last slot for a closing atom.
                            if rule.real_length < assistant.max_depth() - 1 {
                                queue.enqueue_all(batch);
                            }
                        } else {
                            queue.enqueue_all(batch);
                        }
                    }
                }
                Err(error) => {
                    // A failed operator call yields the empty child set; the
                    // candidate is dropped, never retried.
                    tracing::warn!(%error, rule = %rule, "operator application failed");
                }
            }
        }

        if output {
            store.publish(rule);
        }
    }
}

/// The absolute support threshold the operators prune with.
fn count_threshold(
    config: &MinerConfig,
    assistant: &dyn MiningAssistant,
    rule: &Rule,
) -> usize {
    match config.pruning_metric {
        PruningMetric::Support => config.min_significance.ceil() as usize,
        PruningMetric::HeadCoverage => {
            (config.min_significance * assistant.head_cardinality(rule) as f64).ceil() as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tests::StubAssistant;
    use crate::assistant::default::DefaultAssistant;
    use crate::config::BiasConfig;
    use crate::kb::KnowledgeBase;

    #[test]
    fn empty_frontier_terminates_cleanly() {
        let assistant: Arc<dyn MiningAssistant> = Arc::new(StubAssistant::default());
        let mut miner = Miner::new(
            assistant,
            MinerConfig {
                real_time: false,
                n_threads: 4,
                ..Default::default()
            },
        )
        .unwrap();
        let rules = miner.mine().unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn invalid_config_rejected_before_mining() {
        let assistant: Arc<dyn MiningAssistant> = Arc::new(StubAssistant::default());
        let result = Miner::new(
            assistant,
            MinerConfig {
                n_threads: 0,
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn support_threshold_is_absolute() {
        let assistant: Arc<dyn MiningAssistant> = Arc::new(StubAssistant::default());
        let config = MinerConfig::support(50);
        let rule = Rule::seed(
            crate::rule::Atom::new(
                crate::term::VarId(0),
                crate::term::ConstId::new(1).unwrap(),
                crate::term::VarId(1),
            ),
            100,
            crate::term::VarId(0),
        );
        assert_eq!(count_threshold(&config, assistant.as_ref(), &rule), 50);
    }

    #[test]
    fn head_coverage_threshold_scales_with_head_size() {
        let assistant: Arc<dyn MiningAssistant> = Arc::new(StubAssistant::default());
        let config = MinerConfig::head_coverage(0.25);
        let rule = Rule::seed(
            crate::rule::Atom::new(
                crate::term::VarId(0),
                crate::term::ConstId::new(1).unwrap(),
                crate::term::VarId(1),
            ),
            101,
            crate::term::VarId(0),
        );
        // ceil(0.25 * 101) = 26
        assert_eq!(count_threshold(&config, assistant.as_ref(), &rule), 26);
    }

    #[test]
    fn end_to_end_on_a_two_person_kb() {
        let kb = Arc::new(KnowledgeBase::new());
        kb.add_labeled("adam", "bornIn", "paris");
        kb.add_labeled("adam", "livesIn", "paris");
        let assistant = Arc::new(
            DefaultAssistant::new(
                Arc::clone(&kb),
                BiasConfig {
                    max_depth: 2,
                    ..Default::default()
                },
            )
            .unwrap(),
        );
        let mut miner = Miner::new(
            assistant,
            MinerConfig {
                min_initial_support: 1,
                min_significance: 1.0,
                pruning_metric: PruningMetric::HeadCoverage,
                n_threads: 2,
                real_time: false,
            },
        )
        .unwrap()
        .with_sink(Box::new(std::io::sink()));

        let rules = miner.mine().unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.support_cardinality == 1));
        assert!(rules
            .iter()
            .all(|r| (r.std_confidence - 1.0).abs() < f64::EPSILON));
    }
}
