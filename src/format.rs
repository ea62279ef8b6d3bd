//! Rule output formatting.
//!
//! The sink is line-oriented: one header, then one tab-separated line per
//! rule. Labels are resolved through the KB dictionary; unresolvable ids
//! (which would indicate a foreign dictionary) fall back to their raw form.

use std::sync::Arc;

use crate::kb::KnowledgeBase;
use crate::rule::{Atom, Rule};
use crate::term::Term;

/// Formats rules against a KB dictionary.
pub struct RuleFormatter {
    kb: Arc<KnowledgeBase>,
}

impl RuleFormatter {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    /// The column header line, newline-terminated.
    pub fn header(&self) -> String {
        "Rule\tHead Coverage\tStd Confidence\tPCA Confidence\t\
         Positive Examples\tBody size\tPCA Body size\tFunctional variable\n"
            .to_string()
    }

    /// One tab-separated line for a rule (no trailing newline).
    pub fn format(&self, rule: &Rule) -> String {
        let mut text = String::new();
        for (i, atom) in rule.body().iter().enumerate() {
            if i > 0 {
                text.push_str("  ");
            }
            text.push_str(&self.atom_text(atom));
        }
        text.push_str(" => ");
        text.push_str(&self.atom_text(rule.head()));

        format!(
            "{}\t{:.6}\t{:.6}\t{:.6}\t{}\t{}\t{}\t{}",
            text,
            rule.head_coverage(),
            rule.std_confidence,
            rule.pca_confidence,
            rule.support_cardinality,
            rule.body_cardinality,
            rule.pca_body_cardinality,
            rule.functional_variable,
        )
    }

    /// Machine-readable form of a rule.
    pub fn json(&self, rule: &Rule) -> serde_json::Value {
        serde_json::json!({
            "rule": self.rule_text(rule),
            "head_coverage": rule.head_coverage(),
            "std_confidence": rule.std_confidence,
            "pca_confidence": rule.pca_confidence,
            "support": rule.support_cardinality,
            "body_size": rule.body_cardinality,
            "pca_body_size": rule.pca_body_cardinality,
            "functional_variable": rule.functional_variable.to_string(),
        })
    }

    fn rule_text(&self, rule: &Rule) -> String {
        let body: Vec<String> = rule.body().iter().map(|a| self.atom_text(a)).collect();
        format!("{} => {}", body.join("  "), self.atom_text(rule.head()))
    }

    fn atom_text(&self, atom: &Atom) -> String {
        format!(
            "{} {} {}",
            self.term_text(atom.subject),
            self.term_text(atom.relation),
            self.term_text(atom.object)
        )
    }

    fn term_text(&self, term: Term) -> String {
        match term {
            Term::Var(v) => v.to_string(),
            Term::Const(c) => self.kb.dict().resolve(c).unwrap_or_else(|| c.to_string()),
        }
    }
}
