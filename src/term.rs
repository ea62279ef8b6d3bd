//! Core term types for the mining engine.
//!
//! Every entity and relation in the knowledge base is interned to a
//! [`ConstId`] through the [`Dictionary`]. Rule patterns additionally use
//! [`VarId`] variables; a [`Term`] is either of the two. The id spaces are
//! disjoint types, so a variable can never be mistaken for a constant.

use std::num::NonZeroU32;
use std::sync::RwLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Unique, niche-optimized identifier for an interned constant.
///
/// Uses `NonZeroU32` so that `Option<ConstId>` is the same size as `ConstId`
/// (the niche optimization lets the compiler use 0 as the `None`
/// discriminant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConstId(NonZeroU32);

impl ConstId {
    /// Create a `ConstId` from a raw `u32`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(ConstId)
    }

    /// Get the underlying `u32` value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for ConstId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "k:{}", self.0)
    }
}

/// Identifier for a rule variable.
///
/// Variables are scoped to a single rule; operators allocate fresh ids by
/// taking the successor of the highest id already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct VarId(pub u32);

impl VarId {
    pub fn get(self) -> u32 {
        self.0
    }

    /// The next fresh variable after this one.
    pub fn successor(self) -> VarId {
        VarId(self.0 + 1)
    }
}

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // ?a through ?z, then ?v26 onwards.
        if self.0 < 26 {
            write!(f, "?{}", (b'a' + self.0 as u8) as char)
        } else {
            write!(f, "?v{}", self.0)
        }
    }
}

/// A position in a triple pattern: an interned constant or a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Const(ConstId),
    Var(VarId),
}

impl Term {
    /// Returns `true` if this term is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// The variable id, if this term is one.
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(*v),
            Term::Const(_) => None,
        }
    }

    /// The constant id, if this term is one.
    pub fn as_const(&self) -> Option<ConstId> {
        match self {
            Term::Const(c) => Some(*c),
            Term::Var(_) => None,
        }
    }
}

impl From<ConstId> for Term {
    fn from(c: ConstId) -> Self {
        Term::Const(c)
    }
}

impl From<VarId> for Term {
    fn from(v: VarId) -> Self {
        Term::Var(v)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Const(c) => write!(f, "{c}"),
            Term::Var(v) => write!(f, "{v}"),
        }
    }
}

/// The KB string dictionary: bidirectional `label ↔ ConstId` interning.
///
/// Interning is concurrent (DashMap for the forward direction); resolution
/// goes through an RwLock'd table indexed by id. The KB is read-only after
/// load, so contention only matters during ingestion.
pub struct Dictionary {
    ids: DashMap<String, ConstId>,
    labels: RwLock<Vec<String>>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self {
            ids: DashMap::new(),
            labels: RwLock::new(Vec::new()),
        }
    }

    /// Intern a label, returning its id. Idempotent.
    pub fn intern(&self, label: &str) -> ConstId {
        if let Some(id) = self.ids.get(label) {
            return *id.value();
        }
        let mut labels = self.labels.write().expect("dictionary lock poisoned");
        // Double-check after acquiring the write lock.
        if let Some(id) = self.ids.get(label) {
            return *id.value();
        }
        labels.push(label.to_string());
        let id = ConstId::new(labels.len() as u32).expect("dictionary id space exhausted");
        self.ids.insert(label.to_string(), id);
        id
    }

    /// Look up a label without interning it.
    pub fn lookup(&self, label: &str) -> Option<ConstId> {
        self.ids.get(label).map(|e| *e.value())
    }

    /// Resolve an id back to its label.
    pub fn resolve(&self, id: ConstId) -> Option<String> {
        let labels = self.labels.read().expect("dictionary lock poisoned");
        labels.get(id.get() as usize - 1).cloned()
    }

    /// Number of interned constants.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("constants", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_id_niche_optimization() {
        // Option<ConstId> should be the same size as ConstId thanks to NonZeroU32.
        assert_eq!(
            std::mem::size_of::<Option<ConstId>>(),
            std::mem::size_of::<ConstId>()
        );
    }

    #[test]
    fn const_id_zero_is_none() {
        assert!(ConstId::new(0).is_none());
        assert!(ConstId::new(1).is_some());
        assert_eq!(ConstId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn intern_is_idempotent() {
        let dict = Dictionary::new();
        let a = dict.intern("livesIn");
        let b = dict.intern("livesIn");
        assert_eq!(a, b);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn intern_and_resolve_round_trip() {
        let dict = Dictionary::new();
        let a = dict.intern("bornIn");
        let b = dict.intern("livesIn");
        assert_ne!(a, b);
        assert_eq!(dict.resolve(a).as_deref(), Some("bornIn"));
        assert_eq!(dict.resolve(b).as_deref(), Some("livesIn"));
    }

    #[test]
    fn lookup_does_not_intern() {
        let dict = Dictionary::new();
        assert!(dict.lookup("missing").is_none());
        assert!(dict.is_empty());
    }

    #[test]
    fn var_display_letters_then_numbered() {
        assert_eq!(VarId(0).to_string(), "?a");
        assert_eq!(VarId(1).to_string(), "?b");
        assert_eq!(VarId(25).to_string(), "?z");
        assert_eq!(VarId(26).to_string(), "?v26");
    }

    #[test]
    fn term_accessors() {
        let c = ConstId::new(7).unwrap();
        let t: Term = c.into();
        assert!(!t.is_variable());
        assert_eq!(t.as_const(), Some(c));
        assert_eq!(t.as_var(), None);

        let v: Term = VarId(3).into();
        assert!(v.is_variable());
        assert_eq!(v.as_var(), Some(VarId(3)));
    }
}
