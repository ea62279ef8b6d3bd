//! In-memory knowledge base: a triple store over interned identifiers.
//!
//! Triples (subject, relation, object) are interned through the string
//! [`Dictionary`] and indexed three ways: per-relation pair lists,
//! `(relation, subject) → objects` and `(relation, object) → subjects`.
//! The store is read-only after loading; all indexes are concurrent maps so
//! worker threads can query without further locking.

pub mod query;

use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{KbError, KbResult};
use crate::term::{ConstId, Dictionary};

/// A ground triple in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: ConstId,
    pub relation: ConstId,
    pub object: ConstId,
}

impl Triple {
    pub fn new(subject: ConstId, relation: ConstId, object: ConstId) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }
}

/// Per-relation statistics, computed once after loading.
#[derive(Debug, Clone, Copy)]
pub struct RelationStats {
    /// Number of triples with this relation.
    pub size: usize,
    /// Number of distinct subjects.
    pub distinct_subjects: usize,
    /// Number of distinct objects.
    pub distinct_objects: usize,
    /// distinct_subjects / size.
    pub functionality: f64,
    /// distinct_objects / size.
    pub inverse_functionality: f64,
}

/// The in-memory knowledge base.
pub struct KnowledgeBase {
    dict: Dictionary,
    /// relation → list of (subject, object) pairs.
    relation_pairs: DashMap<ConstId, Vec<(ConstId, ConstId)>>,
    /// (relation, subject) → objects.
    objects_index: DashMap<(ConstId, ConstId), Vec<ConstId>>,
    /// (relation, object) → subjects.
    subjects_index: DashMap<(ConstId, ConstId), Vec<ConstId>>,
    /// relation → statistics; filled by `compute_stats`.
    stats: DashMap<ConstId, RelationStats>,
    triple_count: AtomicUsize,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new() -> Self {
        Self {
            dict: Dictionary::new(),
            relation_pairs: DashMap::new(),
            objects_index: DashMap::new(),
            subjects_index: DashMap::new(),
            stats: DashMap::new(),
            triple_count: AtomicUsize::new(0),
        }
    }

    /// The string dictionary.
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// Insert a triple. Exact duplicates are ignored; returns whether the
    /// triple was new.
    pub fn add(&self, triple: Triple) -> bool {
        if self.contains(triple.subject, triple.relation, triple.object) {
            return false;
        }
        self.relation_pairs
            .entry(triple.relation)
            .or_default()
            .push((triple.subject, triple.object));
        self.objects_index
            .entry((triple.relation, triple.subject))
            .or_default()
            .push(triple.object);
        self.subjects_index
            .entry((triple.relation, triple.object))
            .or_default()
            .push(triple.subject);
        self.triple_count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Intern three labels and insert the resulting triple.
    pub fn add_labeled(&self, subject: &str, relation: &str, object: &str) -> Triple {
        let triple = Triple::new(
            self.dict.intern(subject),
            self.dict.intern(relation),
            self.dict.intern(object),
        );
        self.add(triple);
        triple
    }

    /// Whether the given ground triple exists.
    pub fn contains(&self, subject: ConstId, relation: ConstId, object: ConstId) -> bool {
        self.objects_index
            .get(&(relation, subject))
            .map(|objs| objs.contains(&object))
            .unwrap_or(false)
    }

    /// All objects o with (subject, relation, o) in the KB.
    pub fn objects_of(&self, relation: ConstId, subject: ConstId) -> Vec<ConstId> {
        self.objects_index
            .get(&(relation, subject))
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// All subjects s with (s, relation, object) in the KB.
    pub fn subjects_of(&self, relation: ConstId, object: ConstId) -> Vec<ConstId> {
        self.subjects_index
            .get(&(relation, object))
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// All (subject, object) pairs of a relation.
    pub fn pairs_of(&self, relation: ConstId) -> Vec<(ConstId, ConstId)> {
        self.relation_pairs
            .get(&relation)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// All relations occurring in the KB.
    pub fn relations(&self) -> Vec<ConstId> {
        self.relation_pairs.iter().map(|e| *e.key()).collect()
    }

    /// Number of triples with the given relation.
    pub fn relation_size(&self, relation: ConstId) -> usize {
        self.relation_pairs
            .get(&relation)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Total triple count.
    pub fn triple_count(&self) -> usize {
        self.triple_count.load(Ordering::Relaxed)
    }

    /// Compute per-relation statistics, in parallel across relations.
    ///
    /// Must be called after loading and before functionality queries.
    pub fn compute_stats(&self) {
        let relations = self.relations();
        relations.par_iter().for_each(|&relation| {
            let pairs = self.pairs_of(relation);
            let size = pairs.len();
            let distinct_subjects = {
                let mut subjects: Vec<ConstId> = pairs.iter().map(|(s, _)| *s).collect();
                subjects.sort_unstable();
                subjects.dedup();
                subjects.len()
            };
            let distinct_objects = {
                let mut objects: Vec<ConstId> = pairs.iter().map(|(_, o)| *o).collect();
                objects.sort_unstable();
                objects.dedup();
                objects.len()
            };
            let stats = RelationStats {
                size,
                distinct_subjects,
                distinct_objects,
                functionality: if size == 0 {
                    0.0
                } else {
                    distinct_subjects as f64 / size as f64
                },
                inverse_functionality: if size == 0 {
                    0.0
                } else {
                    distinct_objects as f64 / size as f64
                },
            };
            self.stats.insert(relation, stats);
        });
        tracing::debug!(relations = relations.len(), "relation statistics computed");
    }

    /// Statistics for a relation, if computed.
    pub fn relation_stats(&self, relation: ConstId) -> Option<RelationStats> {
        self.stats.get(&relation).map(|s| *s.value())
    }

    /// Functionality of a relation: distinct subjects / size.
    pub fn functionality(&self, relation: ConstId) -> f64 {
        self.relation_stats(relation)
            .map(|s| s.functionality)
            .unwrap_or(0.0)
    }

    /// Inverse functionality of a relation: distinct objects / size.
    pub fn inverse_functionality(&self, relation: ConstId) -> f64 {
        self.relation_stats(relation)
            .map(|s| s.inverse_functionality)
            .unwrap_or(0.0)
    }

    /// Load tab-separated triples from a file.
    ///
    /// Returns the number of triples inserted (duplicates excluded).
    pub fn load_tsv(&self, path: &Path) -> KbResult<usize> {
        let file = std::fs::File::open(path).map_err(|source| KbError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        self.load_tsv_reader(reader, &path.display().to_string())
    }

    /// Load tab-separated triples from any buffered reader.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn load_tsv_reader<R: BufRead>(&self, reader: R, path: &str) -> KbResult<usize> {
        let mut inserted = 0;
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| KbError::Io {
                path: path.to_string(),
                source,
            })?;
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split('\t');
            let (subject, relation, object) = match (fields.next(), fields.next(), fields.next()) {
                (Some(s), Some(r), Some(o)) if fields.next().is_none() => (s, r, o),
                _ => {
                    return Err(KbError::MalformedLine {
                        path: path.to_string(),
                        line: idx + 1,
                    });
                }
            };
            self.add_labeled(subject.trim(), relation.trim(), object.trim());
            inserted += 1;
        }
        tracing::info!(path, triples = inserted, "loaded knowledge base file");
        Ok(inserted)
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("constants", &self.dict.len())
            .field("relations", &self.relation_pairs.len())
            .field("triples", &self.triple_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query() {
        let kb = KnowledgeBase::new();
        let t = kb.add_labeled("adam", "livesIn", "paris");

        assert!(kb.contains(t.subject, t.relation, t.object));
        assert_eq!(kb.objects_of(t.relation, t.subject), vec![t.object]);
        assert_eq!(kb.subjects_of(t.relation, t.object), vec![t.subject]);
        assert_eq!(kb.triple_count(), 1);
    }

    #[test]
    fn duplicates_are_ignored() {
        let kb = KnowledgeBase::new();
        kb.add_labeled("adam", "livesIn", "paris");
        kb.add_labeled("adam", "livesIn", "paris");
        assert_eq!(kb.triple_count(), 1);
        assert_eq!(kb.relation_size(kb.dict().lookup("livesIn").unwrap()), 1);
    }

    #[test]
    fn relation_statistics() {
        let kb = KnowledgeBase::new();
        // Two subjects map to one shared object: functional but not inverse.
        kb.add_labeled("a", "bornIn", "x");
        kb.add_labeled("b", "bornIn", "x");
        kb.compute_stats();

        let rel = kb.dict().lookup("bornIn").unwrap();
        let stats = kb.relation_stats(rel).unwrap();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.distinct_subjects, 2);
        assert_eq!(stats.distinct_objects, 1);
        assert!((kb.functionality(rel) - 1.0).abs() < f64::EPSILON);
        assert!((kb.inverse_functionality(rel) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn load_tsv_skips_comments_and_blanks() {
        let kb = KnowledgeBase::new();
        let data = "# a comment\n\nadam\tlivesIn\tparis\neve\tlivesIn\trome\n";
        let n = kb
            .load_tsv_reader(std::io::Cursor::new(data), "inline")
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(kb.triple_count(), 2);
    }

    #[test]
    fn load_tsv_rejects_malformed_lines() {
        let kb = KnowledgeBase::new();
        let data = "adam\tlivesIn\n";
        let err = kb
            .load_tsv_reader(std::io::Cursor::new(data), "inline")
            .unwrap_err();
        assert!(matches!(err, KbError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn empty_kb_queries() {
        let kb = KnowledgeBase::new();
        assert!(kb.relations().is_empty());
        assert_eq!(kb.triple_count(), 0);
        let id = ConstId::new(1).unwrap();
        assert!(kb.objects_of(id, id).is_empty());
        assert_eq!(kb.relation_size(id), 0);
    }
}
