//! hornmine CLI: mine Horn rules from TSV triple files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use miette::{bail, IntoDiagnostic, Result};

use hornmine::assistant::default::DefaultAssistant;
use hornmine::config::{BiasConfig, MinerConfig, PruningMetric};
use hornmine::error::ConfigError;
use hornmine::kb::KnowledgeBase;
use hornmine::miner::Miner;
use hornmine::term::ConstId;

#[derive(Parser)]
#[command(name = "hornmine", version, about = "Horn-clause rule mining over knowledge bases")]
struct Cli {
    /// Input TSV files (SUBJECT<TAB>RELATION<TAB>OBJECT per line).
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Absolute support threshold; selects the Support pruning metric.
    #[arg(long)]
    min_support: Option<usize>,

    /// Head coverage threshold; selects the HeadCoverage pruning metric.
    #[arg(long)]
    min_head_coverage: Option<f64>,

    /// Minimum relation size for seed head relations.
    #[arg(long)]
    min_initial_support: Option<usize>,

    /// Pruning metric, overriding the threshold-based choice.
    #[arg(long, value_parser = ["support", "head-coverage"])]
    pruning_metric: Option<String>,

    /// Minimum standard confidence of emitted rules.
    #[arg(long, default_value_t = 0.1)]
    min_std_confidence: f64,

    /// Minimum PCA confidence of emitted rules.
    #[arg(long, default_value_t = 0.1)]
    min_pca_confidence: f64,

    /// Maximum rule length (head included), at least 2.
    #[arg(long, default_value_t = 3)]
    max_depth: usize,

    /// Worker threads (default: all cores).
    #[arg(long)]
    threads: Option<usize>,

    /// Collect all rules first and write them when mining finishes.
    #[arg(long)]
    output_at_end: bool,

    /// Disable skyline suppression of dominated rules.
    #[arg(long)]
    no_skyline: bool,

    /// Disable perfect-rule pruning.
    #[arg(long)]
    no_perfect_rules: bool,

    /// Disable confidence upper-bound pruning.
    #[arg(long)]
    no_upper_bounds: bool,

    /// Allow constants in rule arguments (instantiation operator).
    #[arg(long)]
    allow_constants: bool,

    /// Only output rules carrying at least one constant argument.
    #[arg(long)]
    enforce_constants: bool,

    /// Maximum body atoms sharing the head relation.
    #[arg(long, default_value_t = 3)]
    recursivity_limit: usize,

    /// Mine only these head relations (comma-separated labels).
    #[arg(long, value_delimiter = ',')]
    head_targets: Vec<String>,

    /// Relations never used as rule heads (comma-separated labels).
    #[arg(long, value_delimiter = ',')]
    head_excluded: Vec<String>,

    /// Relations never added to rule bodies (comma-separated labels).
    #[arg(long, value_delimiter = ',')]
    body_excluded: Vec<String>,

    /// Label of the type relation (type atoms do not consume depth).
    #[arg(long, default_value = "type")]
    type_relation: String,

    /// Write rules to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log queue statistics and operator details.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let loading = Instant::now();
    let kb = Arc::new(KnowledgeBase::new());
    for file in &cli.files {
        kb.load_tsv(file)?;
    }
    tracing::info!(
        triples = kb.triple_count(),
        constants = kb.dict().len(),
        elapsed = ?loading.elapsed(),
        "knowledge base loaded"
    );

    // The metric follows the threshold the user actually set, unless an
    // explicit --pruning-metric overrides it.
    let metric = match cli.pruning_metric.as_deref() {
        Some("support") => PruningMetric::Support,
        Some(_) => PruningMetric::HeadCoverage,
        None => {
            if cli.min_support.is_some() && cli.min_head_coverage.is_none() {
                PruningMetric::Support
            } else {
                PruningMetric::HeadCoverage
            }
        }
    };
    let min_support = cli.min_support.unwrap_or(100);
    let min_significance = match metric {
        PruningMetric::Support => min_support as f64,
        PruningMetric::HeadCoverage => cli.min_head_coverage.unwrap_or(0.01),
    };
    let min_initial_support = cli.min_initial_support.unwrap_or(match metric {
        PruningMetric::Support => min_support,
        PruningMetric::HeadCoverage => 100,
    });

    let config = MinerConfig {
        min_initial_support,
        min_significance,
        pruning_metric: metric,
        n_threads: cli.threads.unwrap_or_else(hornmine::config::default_threads),
        real_time: !cli.output_at_end,
    };
    let bias = BiasConfig {
        max_depth: cli.max_depth,
        min_std_confidence: cli.min_std_confidence,
        min_pca_confidence: cli.min_pca_confidence,
        skyline: !cli.no_skyline,
        perfect_rule_pruning: !cli.no_perfect_rules,
        upper_bound_pruning: !cli.no_upper_bounds,
        allow_constants: cli.allow_constants,
        enforce_constants: cli.enforce_constants,
        recursivity_limit: cli.recursivity_limit,
        avoid_unbound_type_atoms: true,
        type_relation: Some(cli.type_relation.clone()),
        head_excluded_relations: cli.head_excluded.clone(),
        body_excluded_relations: cli.body_excluded.clone(),
        verbose: cli.verbose,
    };

    let seeds = resolve_seeds(&kb, &cli.head_targets)?;

    let assistant = Arc::new(DefaultAssistant::new(Arc::clone(&kb), bias)?);
    let mut miner = Miner::new(assistant, config.clone())?;
    if let Some(seeds) = seeds {
        miner = miner.with_seeds(seeds);
    }
    if let Some(path) = &cli.output {
        let file = std::fs::File::create(path).into_diagnostic()?;
        miner = miner.with_sink(Box::new(std::io::BufWriter::new(file)));
        tracing::info!(path = %path.display(), "writing rules to file");
    }

    let rules = miner.mine()?;
    if !config.real_time {
        miner.emit(&rules)?;
    }

    println!("{} rules mined.", rules.len());
    Ok(())
}

/// Resolve head target labels against the KB dictionary.
fn resolve_seeds(kb: &KnowledgeBase, targets: &[String]) -> Result<Option<Vec<ConstId>>> {
    if targets.is_empty() {
        return Ok(None);
    }
    let mut seeds = Vec::with_capacity(targets.len());
    for label in targets {
        match kb.dict().lookup(label) {
            Some(id) => seeds.push(id),
            None => bail!(ConfigError::UnknownRelation {
                label: label.clone(),
            }),
        }
    }
    Ok(Some(seeds))
}
