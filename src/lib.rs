//! # hornmine
//!
//! Horn-clause association rule mining over RDF-style knowledge bases.
//! Given a triple store and thresholds on support, head coverage and
//! confidence, the engine enumerates closed, connected rules of bounded
//! length and streams them to a sink as they are confirmed.
//!
//! ## Architecture
//!
//! - **Knowledge base** (`kb`): interned triple store with concurrent
//!   indexes and conjunctive-pattern counting
//! - **Rules** (`rule`): atoms, statistics, the order-insensitive content
//!   hash and pattern equivalence
//! - **Mining core** (`queue`, `miner`, `results`, `consumer`): worker pool
//!   over a self-feeding queue with two-counter quiescence detection
//! - **Assistant** (`assistant`): the strategy interface for operators,
//!   counts and language bias; `DefaultAssistant` is the stock strategy
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use hornmine::assistant::default::DefaultAssistant;
//! use hornmine::config::{BiasConfig, MinerConfig};
//! use hornmine::kb::KnowledgeBase;
//! use hornmine::miner::Miner;
//!
//! let kb = Arc::new(KnowledgeBase::new());
//! kb.add_labeled("adam", "bornIn", "paris");
//! kb.add_labeled("adam", "livesIn", "paris");
//!
//! let assistant = Arc::new(DefaultAssistant::new(kb, BiasConfig::default()).unwrap());
//! let mut miner = Miner::new(assistant, MinerConfig::default()).unwrap();
//! let rules = miner.mine().unwrap();
//! ```

pub mod assistant;
pub mod config;
pub mod consumer;
pub mod error;
pub mod format;
pub mod kb;
pub mod miner;
pub mod queue;
pub mod results;
pub mod rule;
pub mod term;
