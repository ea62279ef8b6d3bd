//! The mining assistant: the strategy interface the core mines through.
//!
//! The engine never touches the KB directly. Everything KB-flavored (seed
//! generation, operator application, support and confidence computation,
//! language bias) sits behind this trait, so concrete strategies can be
//! swapped at construction time.

pub mod default;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::AssistantResult;
use crate::results::ParentIndex;
use crate::rule::Rule;
use crate::term::ConstId;

/// Operator key for children that introduce a new free variable. The core
/// special-cases this key: dangling children are only enqueued while a slot
/// remains for a closing atom.
pub const DANGLING: &str = "dangling";

/// Operator key for children that join two existing variables.
pub const CLOSING: &str = "closing";

/// Operator key for children that place a constant in an argument.
pub const INSTANTIATED: &str = "instantiated";

/// Children of one refinement step, keyed by the operator that produced
/// them.
pub type ChildMap = BTreeMap<&'static str, Vec<Rule>>;

/// Capability set the mining core requires; any implementation is
/// interchangeable.
pub trait MiningAssistant: Send + Sync {
    /// Seed rules for every frequent-enough relation in the KB.
    fn initial_atoms(&self, min_initial_support: usize) -> Vec<Rule>;

    /// Seed rules for the given head relations only.
    fn initial_atoms_from_seeds(&self, seeds: &[ConstId], min_initial_support: usize)
        -> Vec<Rule>;

    /// Whether the rule's shape is eligible for output (closed, connected,
    /// language bias).
    fn should_output(&self, rule: &Rule) -> bool;

    /// Fill in confidence upper bounds; returns whether they leave the
    /// thresholds reachable.
    fn compute_confidence_bounds(&self, rule: &mut Rule) -> bool;

    /// Fill in the exact confidences and cardinalities.
    fn compute_confidence_metrics(&self, rule: &mut Rule);

    /// Confidence thresholds plus the skyline test.
    fn test_confidence_thresholds(&self, rule: &Rule) -> bool;

    /// Attach published ancestors found through the dedup index. Called
    /// under the result-store lock.
    fn set_additional_parents(&self, rule: &mut Rule, index: &ParentIndex<'_>);

    /// Apply the operator bundle; children below `count_threshold` are
    /// discarded inside the operators.
    fn apply_operators(&self, rule: &Arc<Rule>, count_threshold: usize)
        -> AssistantResult<ChildMap>;

    /// Size of the rule's head relation.
    fn head_cardinality(&self, rule: &Rule) -> usize;

    fn perfect_rules_enabled(&self) -> bool;

    fn max_depth(&self) -> usize;

    fn verbose(&self) -> bool;

    /// One formatted output line for a rule (no trailing newline).
    fn format(&self, rule: &Rule) -> String;

    /// The formatted header line(s), newline-terminated.
    fn header(&self) -> String;
}
