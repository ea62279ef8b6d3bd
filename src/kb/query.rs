//! Conjunctive pattern evaluation over the KB indexes.
//!
//! The mining assistant needs three counting primitives over a conjunction
//! of atoms: existence, distinct bindings of a single variable, and distinct
//! bindings of a variable pair. All of them run the same backtracking join,
//! always expanding the most-bound unresolved atom next so index lookups
//! stay narrow.

use std::collections::{HashMap, HashSet};

use crate::rule::Atom;
use crate::term::{ConstId, Term, VarId};

use super::KnowledgeBase;

/// A partial assignment of variables to constants.
pub type Binding = HashMap<VarId, ConstId>;

fn resolve(term: Term, binding: &Binding) -> Option<ConstId> {
    match term {
        Term::Const(c) => Some(c),
        Term::Var(v) => binding.get(&v).copied(),
    }
}

/// Score an atom by how many of its positions are already concrete.
fn boundness(atom: &Atom, binding: &Binding) -> usize {
    atom.terms()
        .into_iter()
        .filter(|t| resolve(*t, binding).is_some())
        .count()
}

/// Bind a term to a value, failing on conflicts. Returns the variable that
/// was newly bound, if any, so the caller can undo it.
fn bind(term: Term, value: ConstId, binding: &mut Binding) -> Result<Option<VarId>, ()> {
    match term {
        Term::Const(c) => {
            if c == value {
                Ok(None)
            } else {
                Err(())
            }
        }
        Term::Var(v) => match binding.get(&v) {
            Some(&bound) => {
                if bound == value {
                    Ok(None)
                } else {
                    Err(())
                }
            }
            None => {
                binding.insert(v, value);
                Ok(Some(v))
            }
        },
    }
}

/// Enumerate all solutions of the conjunction, calling `on_solution` for
/// each complete binding. The callback returns `true` to stop early.
fn solve(
    kb: &KnowledgeBase,
    atoms: &[Atom],
    pending: &mut Vec<usize>,
    binding: &mut Binding,
    on_solution: &mut dyn FnMut(&Binding) -> bool,
) -> bool {
    let Some(pos) = pending
        .iter()
        .enumerate()
        .max_by_key(|(_, &i)| boundness(&atoms[i], binding))
        .map(|(pos, _)| pos)
    else {
        return on_solution(binding);
    };
    let atom_index = pending.swap_remove(pos);
    let atom = &atoms[atom_index];

    let stopped = match resolve(atom.relation, binding) {
        Some(relation) => expand_atom(kb, atoms, atom, relation, pending, binding, on_solution),
        None => {
            // Unbound relation variable: try every relation in the KB.
            let mut stopped = false;
            for relation in kb.relations() {
                let undo = match bind(atom.relation, relation, binding) {
                    Ok(u) => u,
                    Err(()) => continue,
                };
                if expand_atom(kb, atoms, atom, relation, pending, binding, on_solution) {
                    stopped = true;
                }
                if let Some(v) = undo {
                    binding.remove(&v);
                }
                if stopped {
                    break;
                }
            }
            stopped
        }
    };

    pending.push(atom_index);
    let last = pending.len() - 1;
    pending.swap(pos, last);
    stopped
}

/// Expand one atom with a concrete relation against the KB indexes.
fn expand_atom(
    kb: &KnowledgeBase,
    atoms: &[Atom],
    atom: &Atom,
    relation: ConstId,
    pending: &mut Vec<usize>,
    binding: &mut Binding,
    on_solution: &mut dyn FnMut(&Binding) -> bool,
) -> bool {
    let subject = resolve(atom.subject, binding);
    let object = resolve(atom.object, binding);

    let candidates: Vec<(ConstId, ConstId)> = match (subject, object) {
        (Some(s), Some(o)) => {
            if kb.contains(s, relation, o) {
                vec![(s, o)]
            } else {
                Vec::new()
            }
        }
        (Some(s), None) => kb.objects_of(relation, s).into_iter().map(|o| (s, o)).collect(),
        (None, Some(o)) => kb.subjects_of(relation, o).into_iter().map(|s| (s, o)).collect(),
        (None, None) => kb.pairs_of(relation),
    };

    for (s, o) in candidates {
        let undo_s = match bind(atom.subject, s, binding) {
            Ok(u) => u,
            Err(()) => continue,
        };
        let undo_o = match bind(atom.object, o, binding) {
            Ok(u) => u,
            Err(()) => {
                if let Some(v) = undo_s {
                    binding.remove(&v);
                }
                continue;
            }
        };
        let stopped = solve(kb, atoms, pending, binding, on_solution);
        if let Some(v) = undo_o {
            binding.remove(&v);
        }
        if let Some(v) = undo_s {
            binding.remove(&v);
        }
        if stopped {
            return true;
        }
    }
    false
}

fn run(
    kb: &KnowledgeBase,
    atoms: &[Atom],
    on_solution: &mut dyn FnMut(&Binding) -> bool,
) -> bool {
    let mut pending: Vec<usize> = (0..atoms.len()).collect();
    let mut binding = Binding::new();
    solve(kb, atoms, &mut pending, &mut binding, on_solution)
}

/// Whether the conjunction has at least one solution.
pub fn exists(kb: &KnowledgeBase, atoms: &[Atom]) -> bool {
    run(kb, atoms, &mut |_| true)
}

/// Number of distinct values of `v` across all solutions.
pub fn count_distinct(kb: &KnowledgeBase, atoms: &[Atom], v: VarId) -> usize {
    let mut values: HashSet<ConstId> = HashSet::new();
    run(kb, atoms, &mut |binding| {
        if let Some(&value) = binding.get(&v) {
            values.insert(value);
        }
        false
    });
    values.len()
}

/// Number of distinct `(x, y)` value pairs across all solutions.
pub fn count_distinct_pairs(kb: &KnowledgeBase, atoms: &[Atom], x: VarId, y: VarId) -> usize {
    let mut pairs: HashSet<(ConstId, ConstId)> = HashSet::new();
    run(kb, atoms, &mut |binding| {
        if let (Some(&vx), Some(&vy)) = (binding.get(&x), binding.get(&y)) {
            pairs.insert((vx, vy));
        }
        false
    });
    pairs.len()
}

/// Distinct `(x, y)` pair counts grouped by the value of `group`.
///
/// Drives the instantiation operator: for each constant the group variable
/// takes, how much support would the instantiated rule keep.
pub fn pair_counts_by_value(
    kb: &KnowledgeBase,
    atoms: &[Atom],
    x: VarId,
    y: VarId,
    group: VarId,
) -> HashMap<ConstId, usize> {
    let mut grouped: HashMap<ConstId, HashSet<(ConstId, ConstId)>> = HashMap::new();
    run(kb, atoms, &mut |binding| {
        if let (Some(&vx), Some(&vy), Some(&vg)) =
            (binding.get(&x), binding.get(&y), binding.get(&group))
        {
            grouped.entry(vg).or_default().insert((vx, vy));
        }
        false
    });
    grouped.into_iter().map(|(k, v)| (k, v.len())).collect()
}
