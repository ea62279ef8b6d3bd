//! Mining configuration: core thresholds and the assistant's language bias.
//!
//! Everything is validated before any thread starts; a bad threshold never
//! reaches the mining loop.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// The metric the refinement search prunes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruningMetric {
    /// Absolute support count.
    Support,
    /// Support relative to the head relation size.
    HeadCoverage,
}

/// Core configuration of the mining driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Minimum relation size for a seed head relation.
    pub min_initial_support: usize,
    /// Pruning threshold: an absolute count under [`PruningMetric::Support`],
    /// a head-coverage ratio under [`PruningMetric::HeadCoverage`].
    pub min_significance: f64,
    pub pruning_metric: PruningMetric,
    /// Worker pool size; capped at the hardware parallelism.
    pub n_threads: usize,
    /// Stream rules to the sink as they are confirmed.
    pub real_time: bool,
}

impl MinerConfig {
    /// Support-based pruning with the given absolute threshold.
    pub fn support(min_support: usize) -> Self {
        Self {
            min_initial_support: min_support,
            min_significance: min_support as f64,
            pruning_metric: PruningMetric::Support,
            ..Self::default()
        }
    }

    /// Head-coverage-based pruning with the given ratio.
    pub fn head_coverage(min_head_coverage: f64) -> Self {
        Self {
            min_significance: min_head_coverage,
            pruning_metric: PruningMetric::HeadCoverage,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.n_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.min_significance < 0.0 {
            return Err(ConfigError::RatioOutOfRange {
                name: "min_significance",
                value: self.min_significance,
            });
        }
        if self.pruning_metric == PruningMetric::HeadCoverage && self.min_significance > 1.0 {
            return Err(ConfigError::RatioOutOfRange {
                name: "min_head_coverage",
                value: self.min_significance,
            });
        }
        Ok(())
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_initial_support: 100,
            min_significance: 0.01,
            pruning_metric: PruningMetric::HeadCoverage,
            n_threads: default_threads(),
            real_time: true,
        }
    }
}

/// Number of worker threads when the caller does not choose: all cores.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Language bias and threshold configuration consumed by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasConfig {
    /// Maximum rule length counted over non-type body atoms, head included.
    pub max_depth: usize,
    pub min_std_confidence: f64,
    pub min_pca_confidence: f64,
    /// Suppress rules that do not strictly improve on a published ancestor.
    pub skyline: bool,
    /// Never refine rules with PCA confidence 1 at maximal support.
    pub perfect_rule_pruning: bool,
    /// Gate exact confidence computation behind cheap upper bounds.
    pub upper_bound_pruning: bool,
    /// Allow the instantiation operator to place constants in arguments.
    pub allow_constants: bool,
    /// Only output rules carrying at least one constant argument.
    pub enforce_constants: bool,
    /// Maximum body atoms sharing the head relation.
    pub recursivity_limit: usize,
    /// Skip dangling atoms of the type relation with an unbound object.
    pub avoid_unbound_type_atoms: bool,
    /// Label of the type relation; type atoms do not consume search depth.
    pub type_relation: Option<String>,
    /// Relations never used as rule heads.
    pub head_excluded_relations: Vec<String>,
    /// Relations never added to rule bodies.
    pub body_excluded_relations: Vec<String>,
    pub verbose: bool,
}

impl BiasConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_depth < 2 {
            return Err(ConfigError::MaxDepthTooSmall {
                max_depth: self.max_depth,
            });
        }
        for (name, value) in [
            ("min_std_confidence", self.min_std_confidence),
            ("min_pca_confidence", self.min_pca_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RatioOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_std_confidence: 0.1,
            min_pca_confidence: 0.1,
            skyline: true,
            perfect_rule_pruning: true,
            upper_bound_pruning: true,
            allow_constants: false,
            enforce_constants: false,
            recursivity_limit: 3,
            avoid_unbound_type_atoms: true,
            type_relation: Some("type".to_string()),
            head_excluded_relations: Vec::new(),
            body_excluded_relations: Vec::new(),
            verbose: false,
        }
    }
}
