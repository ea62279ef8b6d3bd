//! Horn-clause rules over triple patterns.
//!
//! A [`Rule`] is a head atom plus a conjunction of body atoms, carrying the
//! statistics the mining loop fills in as the rule is evaluated. Published
//! rules are shared immutably (`Arc<Rule>`); candidates are owned by exactly
//! one worker until they are enqueued or published.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::term::{ConstId, Term, VarId};

/// A triple pattern: each position is a constant or a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub subject: Term,
    pub relation: Term,
    pub object: Term,
}

impl Atom {
    pub fn new(subject: impl Into<Term>, relation: impl Into<Term>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// The three terms in subject, relation, object order.
    pub fn terms(&self) -> [Term; 3] {
        [self.subject, self.relation, self.object]
    }

    /// Variables of this atom, in position order (may repeat).
    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.terms().into_iter().filter_map(|t| t.as_var())
    }

    /// Whether the subject or object argument is a constant.
    pub fn has_constant_argument(&self) -> bool {
        !self.subject.is_variable() || !self.object.is_variable()
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.object)
    }
}

/// A Horn rule: `body ⇒ head`, with mining statistics.
///
/// The statistics default to "not yet computed"; the worker that owns the
/// candidate fills them in through the assistant before publication.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Head first, then the body atoms in refinement order.
    atoms: Vec<Atom>,
    /// Atom count ignoring type body atoms; gates the search depth.
    pub real_length: usize,
    /// Distinct head-variable instantiations witnessed by the body.
    pub support_cardinality: usize,
    /// Size of the head relation.
    pub head_cardinality: usize,
    /// Distinct head-variable instantiations satisfying the body alone.
    pub body_cardinality: usize,
    /// Body instantiations under the partial completeness assumption.
    pub pca_body_cardinality: usize,
    pub std_confidence: f64,
    pub pca_confidence: f64,
    pub std_confidence_upper_bound: f64,
    pub pca_confidence_upper_bound: f64,
    /// The head variable the PCA existential quantifies against.
    pub functional_variable: VarId,
    /// Rules this one derives from in a single operator step.
    pub parent_rules: Vec<Arc<Rule>>,
    /// No refinement can ever improve this rule.
    pub is_final: bool,
    /// Confidence 1 at maximal support; specializations cannot improve it.
    pub is_perfect: bool,
    /// Whether the exact confidences have been computed.
    pub confidence_computed: bool,
}

impl Rule {
    /// A head-only seed rule `r(x, y) ⇐ ∅`.
    pub fn seed(head: Atom, relation_size: usize, functional_variable: VarId) -> Self {
        Self {
            atoms: vec![head],
            real_length: 1,
            support_cardinality: relation_size,
            head_cardinality: relation_size,
            body_cardinality: 0,
            pca_body_cardinality: 0,
            std_confidence: 0.0,
            pca_confidence: 0.0,
            std_confidence_upper_bound: 1.0,
            pca_confidence_upper_bound: 1.0,
            functional_variable,
            parent_rules: Vec::new(),
            is_final: false,
            is_perfect: false,
            confidence_computed: false,
        }
    }

    /// Derive a child by appending one body atom.
    ///
    /// `counts_toward_depth` is false for type atoms, which do not consume
    /// search depth. The parent becomes the child's first parent rule.
    pub fn specialize(
        parent: &Arc<Rule>,
        atom: Atom,
        counts_toward_depth: bool,
        support_cardinality: usize,
    ) -> Self {
        let mut atoms = parent.atoms.clone();
        atoms.push(atom);
        Self {
            atoms,
            real_length: parent.real_length + usize::from(counts_toward_depth),
            support_cardinality,
            head_cardinality: parent.head_cardinality,
            body_cardinality: 0,
            pca_body_cardinality: 0,
            std_confidence: 0.0,
            pca_confidence: 0.0,
            std_confidence_upper_bound: 1.0,
            pca_confidence_upper_bound: 1.0,
            functional_variable: parent.functional_variable,
            parent_rules: vec![Arc::clone(parent)],
            is_final: false,
            is_perfect: false,
            confidence_computed: false,
        }
    }

    pub fn head(&self) -> &Atom {
        &self.atoms[0]
    }

    pub fn body(&self) -> &[Atom] {
        &self.atoms[1..]
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Number of atoms (body atoms + 1).
    pub fn length(&self) -> usize {
        self.atoms.len()
    }

    /// The head relation, when it is a constant (always, for mined rules).
    pub fn head_relation(&self) -> Option<ConstId> {
        self.atoms[0].relation.as_const()
    }

    /// The head's subject and object variables.
    pub fn head_variables(&self) -> (Option<VarId>, Option<VarId>) {
        (self.atoms[0].subject.as_var(), self.atoms[0].object.as_var())
    }

    /// support / head_cardinality.
    pub fn head_coverage(&self) -> f64 {
        if self.head_cardinality == 0 {
            0.0
        } else {
            self.support_cardinality as f64 / self.head_cardinality as f64
        }
    }

    /// All distinct variables in first-appearance order.
    pub fn variables(&self) -> Vec<VarId> {
        let mut seen = Vec::new();
        for atom in &self.atoms {
            for v in atom.variables() {
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
        }
        seen
    }

    /// Variables that occur exactly once across all atoms.
    pub fn open_variables(&self) -> Vec<VarId> {
        let mut counts: HashMap<VarId, usize> = HashMap::new();
        for atom in &self.atoms {
            for v in atom.variables() {
                *counts.entry(v).or_insert(0) += 1;
            }
        }
        let mut open: Vec<VarId> = counts
            .into_iter()
            .filter(|&(_, n)| n == 1)
            .map(|(v, _)| v)
            .collect();
        open.sort_unstable();
        open
    }

    /// A rule is closed when every variable occurs at least twice.
    pub fn is_closed(&self) -> bool {
        self.open_variables().is_empty()
    }

    /// A rule is connected when its variable graph is a single component:
    /// every atom can be reached from the head by shared variables.
    pub fn is_connected(&self) -> bool {
        if self.atoms.len() <= 1 {
            return true;
        }
        let mut reached = vec![false; self.atoms.len()];
        reached[0] = true;
        let mut frontier_vars: Vec<VarId> = self.atoms[0].variables().collect();
        loop {
            let mut grew = false;
            for (i, atom) in self.atoms.iter().enumerate() {
                if reached[i] {
                    continue;
                }
                if atom.variables().any(|v| frontier_vars.contains(&v)) {
                    reached[i] = true;
                    grew = true;
                    for v in atom.variables() {
                        if !frontier_vars.contains(&v) {
                            frontier_vars.push(v);
                        }
                    }
                }
            }
            if !grew {
                break;
            }
        }
        reached.into_iter().all(|r| r)
    }

    /// Whether the rule already contains this exact atom.
    pub fn contains_atom(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }

    /// How many body atoms use the given relation.
    pub fn body_relation_count(&self, relation: ConstId) -> usize {
        self.body()
            .iter()
            .filter(|a| a.relation.as_const() == Some(relation))
            .count()
    }

    /// Whether any atom carries a constant argument.
    pub fn has_constant_argument(&self) -> bool {
        self.atoms.iter().any(Atom::has_constant_argument)
    }

    /// The next unused variable id.
    pub fn fresh_variable(&self) -> VarId {
        self.atoms
            .iter()
            .flat_map(|a| a.variables())
            .max()
            .map(VarId::successor)
            .unwrap_or(VarId(0))
    }

    /// Content hash over the head and the unordered multiset of body atoms.
    ///
    /// Two rules producible by different operator orderings but denoting the
    /// same pattern collide; variable identities deliberately do not enter
    /// the hash, so bucket membership is decided by [`Rule::same_pattern`].
    pub fn alternative_parent_hash(&self) -> u64 {
        combined_hash(&self.atoms[0], self.body().iter())
    }

    /// Hash of this rule with one body atom removed; used to look up
    /// published parents in the dedup index.
    pub fn parent_hash_without(&self, body_index: usize) -> u64 {
        combined_hash(
            &self.atoms[0],
            self.body()
                .iter()
                .enumerate()
                .filter(move |&(i, _)| i != body_index)
                .map(|(_, a)| a),
        )
    }

    /// Pattern equivalence: the heads unify and the body multisets match
    /// under a single variable bijection.
    pub fn same_pattern(&self, other: &Rule) -> bool {
        same_pattern_atoms(&self.atoms, &other.atoms)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.atoms == other.atoms
    }
}

impl Eq for Rule {}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, atom) in self.body().iter().enumerate() {
            if i > 0 {
                write!(f, "  ")?;
            }
            write!(f, "{atom}")?;
        }
        write!(f, " => {}", self.head())
    }
}

fn atom_content_hash(atom: &Atom, salt: u64) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    salt.hash(&mut hasher);
    // Variables hash by kind only: ids are assigned in operator order and
    // must not distinguish equal patterns reached along different paths.
    for term in atom.terms() {
        match term {
            Term::Const(c) => {
                1u8.hash(&mut hasher);
                c.get().hash(&mut hasher);
            }
            Term::Var(_) => 0u8.hash(&mut hasher),
        }
    }
    hasher.finish()
}

fn combined_hash<'a>(head: &Atom, body: impl Iterator<Item = &'a Atom>) -> u64 {
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for atom in body {
        sum = sum.wrapping_add(atom_content_hash(atom, 0x0b0d));
        count += 1;
    }
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    atom_content_hash(head, 0xcafe).hash(&mut hasher);
    count.hash(&mut hasher);
    sum.hash(&mut hasher);
    hasher.finish()
}

/// Pattern equivalence over full atom lists (index 0 is the head).
pub fn same_pattern_atoms(a: &[Atom], b: &[Atom]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut forward = HashMap::new();
    let mut backward = HashMap::new();
    if !atoms_unify(&a[0], &b[0], &mut forward, &mut backward) {
        return false;
    }
    let mut used = vec![false; b.len()];
    used[0] = true;
    match_bodies(&a[1..], b, &mut used, &forward, &backward)
}

fn match_bodies(
    remaining: &[Atom],
    b: &[Atom],
    used: &mut [bool],
    forward: &HashMap<VarId, VarId>,
    backward: &HashMap<VarId, VarId>,
) -> bool {
    let Some((first, rest)) = remaining.split_first() else {
        return true;
    };
    for j in 1..b.len() {
        if used[j] {
            continue;
        }
        let mut fwd = forward.clone();
        let mut bwd = backward.clone();
        if atoms_unify(first, &b[j], &mut fwd, &mut bwd) {
            used[j] = true;
            if match_bodies(rest, b, used, &fwd, &bwd) {
                used[j] = false;
                return true;
            }
            used[j] = false;
        }
    }
    false
}

fn atoms_unify(
    a: &Atom,
    b: &Atom,
    forward: &mut HashMap<VarId, VarId>,
    backward: &mut HashMap<VarId, VarId>,
) -> bool {
    a.terms()
        .into_iter()
        .zip(b.terms())
        .all(|(ta, tb)| terms_unify(ta, tb, forward, backward))
}

fn terms_unify(
    a: Term,
    b: Term,
    forward: &mut HashMap<VarId, VarId>,
    backward: &mut HashMap<VarId, VarId>,
) -> bool {
    match (a, b) {
        (Term::Const(x), Term::Const(y)) => x == y,
        (Term::Var(x), Term::Var(y)) => {
            match (forward.get(&x), backward.get(&y)) {
                (Some(&mapped), _) => mapped == y,
                (None, Some(_)) => false,
                (None, None) => {
                    forward.insert(x, y);
                    backward.insert(y, x);
                    true
                }
            }
        }
        _ => false,
    }
}
